//! CSV reading and row mapping.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::ReaderBuilder;
use thiserror::Error;
use tracing::debug;

use cohort_model::{CohortRef, Row};

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("missing headers: expected 'username' plus 'cohortid' or 'cohortidnumber'")]
    MissingHeaders,
}

/// Input CSV delimiter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Delimiter {
    #[default]
    Comma,
    Semicolon,
    Tab,
}

impl Delimiter {
    pub fn as_byte(self) -> u8 {
        match self {
            Delimiter::Comma => b',',
            Delimiter::Semicolon => b';',
            Delimiter::Tab => b'\t',
        }
    }
}

/// Positions of the recognised columns within the header row.
#[derive(Debug, Clone, Copy)]
struct ColumnMap {
    username: usize,
    cohortid: Option<usize>,
    cohortidnumber: Option<usize>,
}

fn normalize_header(raw: &str) -> String {
    raw.trim().trim_matches('\u{feff}').to_lowercase()
}

fn resolve_columns(headers: &csv::StringRecord) -> Result<ColumnMap, IngestError> {
    let mut username = None;
    let mut cohortid = None;
    let mut cohortidnumber = None;
    for (index, raw) in headers.iter().enumerate() {
        match normalize_header(raw).as_str() {
            "username" => username = username.or(Some(index)),
            "cohortid" => cohortid = cohortid.or(Some(index)),
            "cohortidnumber" => cohortidnumber = cohortidnumber.or(Some(index)),
            _ => {}
        }
    }
    let Some(username) = username else {
        return Err(IngestError::MissingHeaders);
    };
    if cohortid.is_none() && cohortidnumber.is_none() {
        return Err(IngestError::MissingHeaders);
    }
    Ok(ColumnMap {
        username,
        cohortid,
        cohortidnumber,
    })
}

fn cell<'a>(record: &'a csv::StringRecord, index: usize) -> &'a str {
    record.get(index).unwrap_or("").trim()
}

/// Map one record to a `Row`.
///
/// An all-digits cohortid wins; otherwise the id-number column is used; a row
/// offering neither carries `CohortRef::Unresolved` and will be classified
/// `Invalid` by the processor.
fn map_record(record: &csv::StringRecord, columns: ColumnMap) -> Row {
    let username = cell(record, columns.username).to_string();

    let cohort_id = columns
        .cohortid
        .map(|index| cell(record, index))
        .filter(|raw| !raw.is_empty() && raw.bytes().all(|b| b.is_ascii_digit()))
        .and_then(|raw| raw.parse::<i64>().ok());
    if let Some(id) = cohort_id {
        return Row::new(username, CohortRef::ById(id));
    }

    let idnumber = columns
        .cohortidnumber
        .map(|index| cell(record, index))
        .filter(|raw| !raw.is_empty());
    match idnumber {
        Some(idnumber) => Row::new(username, CohortRef::ByIdNumber(idnumber.to_string())),
        None => Row::new(username, CohortRef::Unresolved),
    }
}

/// Read rows from any reader.
///
/// Header matching is case-insensitive and tolerates a UTF-8 BOM. A source
/// lacking `username` or both cohort columns is rejected before the processor
/// is ever invoked.
pub fn read_rows<R: Read>(input: R, delimiter: Delimiter) -> Result<Vec<Row>, IngestError> {
    let mut reader = ReaderBuilder::new()
        .delimiter(delimiter.as_byte())
        .flexible(true)
        .from_reader(input);

    let headers = reader.headers()?.clone();
    if headers.is_empty() {
        return Err(IngestError::MissingHeaders);
    }
    let columns = resolve_columns(&headers)?;

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(map_record(&record, columns));
    }
    debug!(rows = rows.len(), "csv rows read");
    Ok(rows)
}

/// Read rows from a file on disk.
pub fn read_rows_from_path(path: &Path, delimiter: Delimiter) -> Result<Vec<Row>, IngestError> {
    let file = File::open(path)?;
    read_rows(file, delimiter)
}
