//! Options controlling a reconciliation run.

use serde::{Deserialize, Serialize};

/// Options for the reconciliation processor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessOptions {
    /// Trim and lower-case usernames before lookup.
    ///
    /// Only the lookup key is normalised; stored data is never altered.
    pub standardise: bool,

    /// Validate and resolve only; never remove a membership and never open
    /// a transaction.
    pub dry_run: bool,
}

impl ProcessOptions {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_standardise(mut self, enable: bool) -> Self {
        self.standardise = enable;
        self
    }

    #[must_use]
    pub fn with_dry_run(mut self, enable: bool) -> Self {
        self.dry_run = enable;
        self
    }
}
