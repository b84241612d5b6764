//! Prefix tree report.
//!
//! One CSV-style row per prefix in tree pre-order, indented by depth, with
//! utilization and the first free block or address. Free blocks of containers can be
//! listed as `gap` rows under their parent.

use crate::error::{IpamError, Result};
use crate::ipam::Ipam;
use crate::models::{NamespaceId, Prefix, PrefixType};
use colored::Colorize;

use super::terminal::{format_field, format_prefix_type, format_utilization};

const INDENT: &str = "  ";

/// First free block for containers, first free address otherwise; `-` when full.
fn first_free(ipam: &Ipam, prefix: &Prefix) -> Result<String> {
    let found = match prefix.prefix_type {
        PrefixType::Container => ipam.get_first_available_prefix(prefix.id, None),
        PrefixType::Network | PrefixType::Pool => ipam.get_first_available_ip(prefix.id),
    };
    match found {
        Ok(network) => Ok(network.to_string()),
        Err(IpamError::Exhaustion(_)) => Ok("-".to_string()),
        Err(e) => Err(e),
    }
}

fn render_prefix(
    ipam: &Ipam,
    prefix: &Prefix,
    depth: usize,
    show_free: bool,
    rows: &mut Vec<String>,
) -> Result<()> {
    let utilization = ipam.get_utilization(prefix.id)?;
    rows.push(format!(
        "{indent}{cidr},{prefix_type},{utilization},{first_free}",
        indent = INDENT.repeat(depth),
        cidr = format_field(prefix.prefix, 20),
        prefix_type = format_prefix_type(prefix.prefix_type, 12),
        utilization = format_utilization(&utilization, 24),
        first_free = format_field(first_free(ipam, prefix)?, 20),
    ));

    if show_free && prefix.prefix_type == PrefixType::Container {
        for gap in ipam.get_available_prefixes(prefix.id)?.iter_cidrs() {
            rows.push(format!(
                "{indent}{cidr},{label}",
                indent = INDENT.repeat(depth + 1),
                cidr = format_field(gap, 20),
                label = format_field("gap", 12).yellow(),
            ));
        }
    }

    for child in ipam.children(prefix.id)? {
        render_prefix(ipam, &child, depth + 1, show_free, rows)?;
    }
    Ok(())
}

/// Render every prefix of `namespace` as report rows.
pub fn render_prefix_tree(ipam: &Ipam, namespace: NamespaceId, show_free: bool) -> Result<Vec<String>> {
    let mut rows = Vec::new();
    for root in ipam.roots(namespace) {
        render_prefix(ipam, &root, 0, show_free, &mut rows)?;
    }
    Ok(rows)
}

/// Print the prefix tree of every namespace to stdout.
pub fn print_prefix_tree(ipam: &Ipam, show_free: bool) -> Result<()> {
    for namespace in ipam.namespaces() {
        let rows = render_prefix_tree(ipam, namespace.id, show_free)?;
        log::info!("Namespace {} has {} report rows", namespace.name, rows.len());
        println!("#{}# namespace {}", "NS".on_blue(), namespace.name);
        println!(
            r#"{:>20},{:>12},{:>24},{:>20}"#,
            "\"prefix\"", "\"type\"", "\"utilization\"", "\"first_free\""
        );
        for row in rows {
            println!("{row}");
        }
    }
    Ok(())
}
