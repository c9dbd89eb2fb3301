//! Result CSV writer.

use std::io::Write;
use std::path::Path;

use cohort_model::RowResult;

use crate::run_store::ReportError;

/// Write the per-row results as CSV with columns
/// `username,cohortid,cohortidnumber,status`.
///
/// The status column carries the stable machine code; absent id/idnumber
/// fields are written as empty cells.
pub fn write_report_csv<W: Write>(writer: W, results: &[RowResult]) -> Result<(), ReportError> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(["username", "cohortid", "cohortidnumber", "status"])?;
    for result in results {
        let cohort_id = result.cohort_id.map(|id| id.to_string()).unwrap_or_default();
        csv_writer.write_record([
            result.username.as_str(),
            cohort_id.as_str(),
            result.cohort_idnumber.as_deref().unwrap_or(""),
            result.status.as_code(),
        ])?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// Write the result CSV to a file path.
pub fn write_report_csv_to_path(path: &Path, results: &[RowResult]) -> Result<(), ReportError> {
    let file = std::fs::File::create(path)?;
    write_report_csv(file, results)
}
