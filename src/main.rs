use ipam_engine::config::EngineConfig;
use ipam_engine::output::print_prefix_tree;
use ipam_engine::Ipam;
use log::LevelFilter;
use log4rs::append::console::{ConsoleAppender, Target};
use log4rs::config::{Appender, Config, Root};
use log4rs::encode::pattern::PatternEncoder;
use std::error::Error;
use std::path::Path;

/// Use the log4rs config file when present, warnings to stderr otherwise.
fn init_logging(config_file: &str) -> Result<(), Box<dyn Error>> {
    if Path::new(config_file).exists() {
        log4rs::init_file(config_file, Default::default())?;
        return Ok(());
    }
    let stderr = ConsoleAppender::builder()
        .target(Target::Stderr)
        .encoder(Box::new(PatternEncoder::new("{d} {l} {t} - {m}{n}")))
        .build();
    let config = Config::builder()
        .appender(Appender::builder().build("stderr", Box::new(stderr)))
        .build(Root::builder().appender("stderr").build(LevelFilter::Warn))?;
    log4rs::init_config(config)?;
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    // Do as little as possible in main.rs as it can't contain any tests
    dotenv::dotenv().ok();
    let config = EngineConfig::from_env();
    init_logging(&config.log_config)?;
    log::info!("#Start main()");

    // ipam-report [SNAPSHOT] [--free]
    let args: Vec<String> = std::env::args().skip(1).collect();
    let show_free = args.iter().any(|a| a == "--free");
    let snapshot = args
        .iter()
        .find(|a| !a.starts_with("--"))
        .cloned()
        .unwrap_or_else(|| config.snapshot_file.clone());

    let ipam = Ipam::load_snapshot(Path::new(&snapshot), config)?;
    print_prefix_tree(&ipam, show_free)?;

    log::info!("#End main()");
    Ok(())
}
