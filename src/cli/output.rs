//! Standard output utilities for the run summary

use crate::core::collapser::CollapseReport;
use colored::*;
use std::path::Path;

/// Display a success message
pub fn success(message: &str) {
    println!("{} {}", "✓".green(), message);
}

/// Display an info message
pub fn info(message: &str) {
    println!("{} {}", "●".blue(), message);
}

/// Tree structure item
pub fn tree_item(is_last: bool, label: &str, value: Option<&str>) {
    let prefix = if is_last { "└─" } else { "├─" };
    if let Some(val) = value {
        println!("{} {}: {}", prefix.dimmed(), label, val);
    } else {
        println!("{} {}", prefix.dimmed(), label);
    }
}

/// Format a number with thousand separators
pub fn format_number<T: ToString>(n: T) -> String {
    let s = n.to_string();
    let mut result = String::new();
    for (count, ch) in s.chars().rev().enumerate() {
        if count > 0 && count % 3 == 0 {
            result.push(',');
        }
        result.push(ch);
    }
    result.chars().rev().collect()
}

/// Summary printed after a successful collapse
pub fn collapse_summary(report: &CollapseReport, output: &Path) {
    success(&format!("Collapsed sequence table written to {}", output.display()));
    tree_item(false, "Samples", Some(&format_number(report.samples)));
    tree_item(false, "Input ASVs", Some(&format_number(report.input_variants)));
    tree_item(false, "Output ASVs", Some(&format_number(report.output_variants)));
    tree_item(
        false,
        "Clusters merged",
        Some(&format_number(report.merged_clusters)),
    );
    tree_item(true, "Tie-break", Some(&report.tie_break.to_string()));
    if report.merges.is_empty() {
        info("No identical ASVs found, table unchanged");
    }
}
