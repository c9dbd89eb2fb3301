use std::path::PathBuf;

use cohort_model::RunOutcome;
use cohort_report::RunId;

/// Everything the `run` subcommand produced, for the summary printer and the
/// exit-code decision.
#[derive(Debug)]
pub struct RunReport {
    pub outcome: RunOutcome,
    pub dry_run: bool,
    pub report_path: Option<PathBuf>,
    pub saved_run: Option<RunId>,
}

impl RunReport {
    pub fn has_errors(&self) -> bool {
        self.outcome.counters.has_errors()
    }
}
