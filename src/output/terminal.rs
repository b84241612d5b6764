//! Terminal output utilities.
//!
//! Provides formatting helpers for terminal output.

use crate::models::PrefixType;
use crate::processing::Utilization;
use colored::{ColoredString, Colorize};

/// Format a value as a quoted, right-aligned field.
///
/// # Arguments
/// * `value` - The value to format
/// * `width` - The minimum width of the field
///
/// # Returns
/// A quoted, right-aligned string
pub fn format_field<T: ToString>(value: T, width: usize) -> String {
    let quoted = format!("\"{}\"", value.to_string());
    format!("{quoted:>width$}")
}

/// Utilization as `used/total (pct%)`, red from 90%, yellow from 50%.
pub fn format_utilization(utilization: &Utilization, width: usize) -> ColoredString {
    let field = format_field(utilization, width);
    match utilization.percent() {
        p if p >= 90.0 => field.red(),
        p if p >= 50.0 => field.yellow(),
        _ => field.green(),
    }
}

pub fn format_prefix_type(prefix_type: PrefixType, width: usize) -> ColoredString {
    let field = format_field(prefix_type, width);
    match prefix_type {
        PrefixType::Container => field.bold(),
        PrefixType::Network => field.normal(),
        PrefixType::Pool => field.cyan(),
    }
}
