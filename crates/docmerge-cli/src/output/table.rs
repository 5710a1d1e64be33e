use std::collections::BTreeSet;

use docmerge_core::inspect::TemplateComparison;
use docmerge_core::model::{BatchResult, DataTable};

pub fn print_batch(result: &BatchResult, show_locations: bool) {
    println!("{}\n", result.summary());

    if !result.successes.is_empty() {
        println!("  Generated:");
        for record in &result.successes {
            if show_locations {
                println!("    row {:<4} {}", record.row + 1, record.location.display());
            } else {
                println!("    row {:<4} {}", record.row + 1, record.filename);
            }
        }
        println!();
    }

    if !result.failures.is_empty() {
        println!("  Failed:");
        for failure in &result.failures {
            println!("    row {:<4} {}", failure.row + 1, failure.message);
        }
        println!();
    }

    if !result.warnings.is_empty() {
        println!("  Unresolved placeholders:");
        for warning in &result.warnings {
            println!("    row {:<4} {}", warning.row + 1, warning.name);
        }
        println!();
    }
}

pub fn print_placeholders(names: &BTreeSet<String>) {
    if names.is_empty() {
        println!("No placeholders found.");
        return;
    }
    println!("Placeholders ({}):", names.len());
    for name in names {
        println!("  {name}");
    }
}

pub fn print_comparison(comparison: &TemplateComparison) {
    println!();
    if comparison.is_exact() {
        println!("Every placeholder has a column and every column is used.");
        return;
    }
    if !comparison.unresolved.is_empty() {
        println!(
            "Placeholders without a column (left as-is): {}",
            comparison.unresolved.join(", ")
        );
    }
    if !comparison.unused_columns.is_empty() {
        println!(
            "Columns not used by the template: {}",
            comparison.unused_columns.join(", ")
        );
    }
}

pub fn print_columns(table: &DataTable) {
    let width = table.columns.iter().map(|c| c.chars().count()).max().unwrap_or(0);
    println!("{} column(s), {} row(s)\n", table.columns.len(), table.rows.len());
    for (i, column) in table.columns.iter().enumerate() {
        let sample = table
            .rows
            .first()
            .and_then(|row| row.get(column))
            .unwrap_or("");
        println!("  {:>3}  {:<width$}  {}", i + 1, column, sample, width = width);
    }
}
