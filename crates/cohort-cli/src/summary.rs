//! Human-facing summary rendering.
//!
//! The engine emits stable status codes; mapping them to readable text and
//! color is this sink's job.

use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use cohort_model::{Counters, RowResult, RowStatus};

use crate::types::RunReport;

pub fn print_summary(report: &RunReport) {
    if report.dry_run {
        println!("Dry run: no changes were made.");
    }
    println!("{}", format_counters(&report.outcome.counters));
    if !report.outcome.results.is_empty() {
        println!("{}", results_table(&report.outcome.results));
    }
    if let Some(path) = &report.report_path {
        println!("Report written to: {}", path.display());
    }
    if let Some(run_id) = &report.saved_run {
        println!("Run saved as: {run_id}");
    }
}

/// The counter block, one line per counter.
pub fn format_counters(counters: &Counters) -> String {
    format!(
        "Total rows : {}\n\
         Valid rows : {}\n\
         Processed  : {}\n\
         Skipped    : {}\n\
         Error rows : {}",
        counters.total, counters.valid, counters.processed, counters.skipped, counters.errors
    )
}

/// Human-readable label for a status code.
pub fn status_label(status: RowStatus) -> &'static str {
    match status {
        RowStatus::Invalid => "Invalid data",
        RowStatus::DuplicateInFile => "Duplicate in file",
        RowStatus::UserNotFound => "User not found",
        RowStatus::CohortNotFound => "Cohort not found",
        RowStatus::NotMember => "User not a member",
        RowStatus::Removed => "Removed",
    }
}

/// Per-row results table.
pub fn results_table(results: &[RowResult]) -> Table {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Username"),
        header_cell("Cohort id"),
        header_cell("Id number"),
        header_cell("Status"),
    ]);
    apply_table_style(&mut table);
    align_column(&mut table, 1, CellAlignment::Right);
    for result in results {
        table.add_row(vec![
            Cell::new(&result.username),
            match result.cohort_id {
                Some(id) => Cell::new(id),
                None => dim_cell("-"),
            },
            match &result.cohort_idnumber {
                Some(idnumber) => Cell::new(idnumber),
                None => dim_cell("-"),
            },
            status_cell(result.status),
        ]);
    }
    table
}

pub fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120);
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}

fn status_cell(status: RowStatus) -> Cell {
    let label = status_label(status);
    match status {
        RowStatus::Removed => Cell::new(label)
            .fg(Color::Green)
            .add_attribute(Attribute::Bold),
        RowStatus::NotMember => Cell::new(label).fg(Color::Yellow),
        _ => Cell::new(label).fg(Color::Red),
    }
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

fn dim_cell<T: ToString>(value: T) -> Cell {
    Cell::new(value).fg(Color::DarkGrey)
}
