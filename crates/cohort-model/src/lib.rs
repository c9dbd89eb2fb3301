pub mod error;
pub mod options;
pub mod outcome;
pub mod row;

pub use error::{DirectoryError, Result};
pub use options::ProcessOptions;
pub use outcome::{Counters, RowResult, RowStatus, RunOutcome};
pub use row::{CohortRef, Row};
