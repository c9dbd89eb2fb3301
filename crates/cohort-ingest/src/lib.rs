//! CSV row source for reconciliation runs.
//!
//! Turns an external tabular file into the processor's `Row` sequence.
//! Header problems are infrastructure faults raised before any processing;
//! malformed cell data is left for the processor to classify per row.

pub mod reader;

pub use reader::{Delimiter, IngestError, read_rows, read_rows_from_path};
