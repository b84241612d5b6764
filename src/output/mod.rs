//! Output formatting for the prefix tree report.
//!
//! This module handles formatting and printing engine data:
//! - [`tree`] - Prefix tree rows with utilization and free space
//! - [`terminal`] - Quoted field formatting with colors

mod terminal;
mod tree;

pub use terminal::{format_field, format_prefix_type, format_utilization};
pub use tree::{print_prefix_tree, render_prefix_tree};
