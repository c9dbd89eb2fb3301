//! Per-subcommand entry points.

use std::path::PathBuf;

use anyhow::{Context, Result};
use comfy_table::{Cell, CellAlignment, Table};
use tracing::info_span;

use cohort_core::process;
use cohort_ingest::read_rows_from_path;
use cohort_model::ProcessOptions;
use cohort_report::{RunId, RunStore, write_report_csv_to_path};
use cohort_store::CsvDirectory;

use crate::cli::{CohortsArgs, ExportArgs, RunArgs};
use crate::summary::apply_table_style;
use crate::types::RunReport;

/// Read the mapping CSV, reconcile it against the snapshot, and write the
/// requested sinks.
pub fn run_reconcile(args: &RunArgs) -> Result<RunReport> {
    let rows = read_rows_from_path(&args.csv, args.delimiter.into())
        .with_context(|| format!("read csv {}", args.csv.display()))?;
    let mut directory = CsvDirectory::open(&args.directory)
        .with_context(|| format!("open directory snapshot {}", args.directory.display()))?;

    let options = ProcessOptions {
        standardise: args.standardise,
        dry_run: args.dry_run,
    };
    let span = info_span!("reconcile", csv = %args.csv.display(), dry_run = args.dry_run);
    let outcome = span
        .in_scope(|| process(&rows, &options, &mut directory))
        .context("reconciliation run")?;

    if let Some(path) = &args.report {
        write_report_csv_to_path(path, &outcome.results)
            .with_context(|| format!("write report {}", path.display()))?;
    }

    let saved_run = match &args.save_run {
        Some(dir) => {
            let store = RunStore::open(dir)
                .with_context(|| format!("open run store {}", dir.display()))?;
            Some(store.save(&outcome).context("save run")?)
        }
        None => None,
    };

    Ok(RunReport {
        outcome,
        dry_run: args.dry_run,
        report_path: args.report.clone(),
        saved_run,
    })
}

/// Write the result CSV of a previously saved run.
pub fn run_export(args: &ExportArgs) -> Result<PathBuf> {
    let store = RunStore::open(&args.runs)
        .with_context(|| format!("open run store {}", args.runs.display()))?;
    let outcome = store
        .load(&RunId::from(args.run_id.as_str()))
        .with_context(|| format!("load run {}", args.run_id))?;
    write_report_csv_to_path(&args.report, &outcome.results)
        .with_context(|| format!("write report {}", args.report.display()))?;
    Ok(args.report.clone())
}

/// Print the cohorts of a snapshot with their member counts.
pub fn run_cohorts(args: &CohortsArgs) -> Result<()> {
    let directory = CsvDirectory::open(&args.directory)
        .with_context(|| format!("open directory snapshot {}", args.directory.display()))?;
    let mut table = Table::new();
    table.set_header(vec!["Id", "Name", "Id number", "Members"]);
    apply_table_style(&mut table);
    if let Some(column) = table.column_mut(3) {
        column.set_cell_alignment(CellAlignment::Right);
    }
    for cohort in directory.cohorts() {
        table.add_row(vec![
            Cell::new(cohort.id),
            Cell::new(&cohort.name),
            Cell::new(&cohort.idnumber),
            Cell::new(directory.member_count(cohort.id)),
        ]);
    }
    println!("{table}");
    Ok(())
}
