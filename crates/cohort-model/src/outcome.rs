//! Per-row outcomes and aggregate counters for a reconciliation run.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Terminal status of one processed row. Exactly one per row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowStatus {
    /// Empty username or no usable cohort reference.
    Invalid,
    /// The (username, cohort reference) pair was already seen in this run.
    DuplicateInFile,
    /// No active user with that username.
    UserNotFound,
    /// The cohort reference did not resolve.
    CohortNotFound,
    /// The pair resolved but the user is not a member of the cohort.
    NotMember,
    /// Membership removed (or would be, on a dry run).
    Removed,
}

impl RowStatus {
    /// Stable machine-readable code. Human text is the reporting sink's job.
    pub fn as_code(self) -> &'static str {
        match self {
            RowStatus::Invalid => "invalid",
            RowStatus::DuplicateInFile => "duplicate_in_file",
            RowStatus::UserNotFound => "user_not_found",
            RowStatus::CohortNotFound => "cohort_not_found",
            RowStatus::NotMember => "not_member",
            RowStatus::Removed => "removed",
        }
    }

    /// Row failed validation or resolution.
    pub fn is_error(self) -> bool {
        matches!(
            self,
            RowStatus::Invalid
                | RowStatus::DuplicateInFile
                | RowStatus::UserNotFound
                | RowStatus::CohortNotFound
        )
    }

    /// Row was well-formed and fully resolvable.
    pub fn is_valid(self) -> bool {
        matches!(self, RowStatus::NotMember | RowStatus::Removed)
    }

    /// Row produced no membership change.
    ///
    /// `NotMember` rows count as both valid and skipped.
    pub fn is_skipped(self) -> bool {
        self != RowStatus::Removed
    }

    /// Row resulted in a membership removal.
    pub fn is_processed(self) -> bool {
        self == RowStatus::Removed
    }
}

impl fmt::Display for RowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_code())
    }
}

/// Outcome record for one input row, in input order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowResult {
    /// Username after normalisation.
    pub username: String,
    /// Cohort id: the row's own id until resolution, the resolved cohort's
    /// id for `NotMember`/`Removed`.
    pub cohort_id: Option<i64>,
    /// Cohort id-number as given by the row, when it referenced by id-number.
    pub cohort_idnumber: Option<String>,
    pub status: RowStatus,
}

/// Aggregate counters for a run, derived deterministically from the per-row
/// statuses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counters {
    pub total: u64,
    pub valid: u64,
    pub processed: u64,
    pub skipped: u64,
    pub errors: u64,
}

impl Counters {
    /// Record one row's terminal status. Called exactly once per row.
    pub fn record(&mut self, status: RowStatus) {
        self.total += 1;
        if status.is_error() {
            self.errors += 1;
        }
        if status.is_valid() {
            self.valid += 1;
        }
        if status.is_skipped() {
            self.skipped += 1;
        }
        if status.is_processed() {
            self.processed += 1;
        }
    }

    pub fn has_errors(&self) -> bool {
        self.errors > 0
    }
}

/// Result of a completed reconciliation run: one `RowResult` per input row,
/// same order, plus the derived counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunOutcome {
    pub results: Vec<RowResult>,
    pub counters: Counters,
}
