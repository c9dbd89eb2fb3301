//! Input row types for a reconciliation run.

use serde::{Deserialize, Serialize};

/// Reference to a cohort as given by an input row.
///
/// A row selects exactly one reference kind; `Unresolved` marks a row that
/// carried neither a usable id nor an id-number and is invalid by
/// construction.
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum CohortRef {
    /// Numeric cohort id.
    ById(i64),
    /// Cohort id-number (external identifier string).
    ByIdNumber(String),
    /// Neither reference was supplied or parseable.
    Unresolved,
}

impl CohortRef {
    /// The numeric id, when this reference is by id.
    pub fn id(&self) -> Option<i64> {
        match self {
            CohortRef::ById(id) => Some(*id),
            _ => None,
        }
    }

    /// The id-number, when this reference is by id-number.
    pub fn idnumber(&self) -> Option<&str> {
        match self {
            CohortRef::ByIdNumber(idnumber) => Some(idnumber),
            _ => None,
        }
    }

    pub fn is_unresolved(&self) -> bool {
        matches!(self, CohortRef::Unresolved)
    }
}

/// One parsed input row: a username and the cohort it should be removed from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Row {
    pub username: String,
    pub cohort_ref: CohortRef,
}

impl Row {
    pub fn new(username: impl Into<String>, cohort_ref: CohortRef) -> Self {
        Self {
            username: username.into(),
            cohort_ref,
        }
    }
}
