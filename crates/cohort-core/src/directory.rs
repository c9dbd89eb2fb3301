//! The directory capability consumed by the processor.

use std::collections::{BTreeMap, BTreeSet};

use cohort_model::{DirectoryError, Result};

/// A resolved user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub id: i64,
    pub username: String,
}

/// A resolved cohort.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CohortRecord {
    pub id: i64,
    pub name: String,
    pub idnumber: String,
}

/// Lookup and mutation capabilities over a user/cohort store.
///
/// The processor assumes exclusive, serialized access for the duration of one
/// run. Every method returns promptly or fails with a [`DirectoryError`];
/// faults abort the whole run.
pub trait Directory {
    /// Look up a user by username, excluding soft-deleted users.
    fn find_active_user(&self, username: &str) -> Result<Option<UserRecord>>;

    fn find_cohort_by_id(&self, id: i64) -> Result<Option<CohortRecord>>;

    fn find_cohort_by_idnumber(&self, idnumber: &str) -> Result<Option<CohortRecord>>;

    fn is_member(&self, cohort_id: i64, user_id: i64) -> Result<bool>;

    /// Remove one membership. Invoked only when membership is confirmed and
    /// the run is not a dry run.
    fn remove_membership(&mut self, cohort_id: i64, user_id: i64) -> Result<()>;

    /// Open the all-or-nothing boundary for this run's removals.
    fn begin(&mut self) -> Result<()>;

    /// Commit every removal performed since [`Directory::begin`].
    fn commit(&mut self) -> Result<()>;
}

/// In-memory directory: the reference implementation of the capability
/// contract, used by the engine tests.
///
/// Tracks every `remove_membership` call so tests can assert the dry-run
/// property ("zero calls") directly.
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    users: BTreeMap<String, (i64, bool)>,
    cohorts: Vec<CohortRecord>,
    members: BTreeSet<(i64, i64)>,
    removal_calls: usize,
    in_transaction: bool,
    commits: usize,
    fail_next_remove: bool,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_user(mut self, id: i64, username: &str) -> Self {
        self.users.insert(username.to_string(), (id, false));
        self
    }

    #[must_use]
    pub fn with_deleted_user(mut self, id: i64, username: &str) -> Self {
        self.users.insert(username.to_string(), (id, true));
        self
    }

    #[must_use]
    pub fn with_cohort(mut self, id: i64, name: &str, idnumber: &str) -> Self {
        self.cohorts.push(CohortRecord {
            id,
            name: name.to_string(),
            idnumber: idnumber.to_string(),
        });
        self
    }

    #[must_use]
    pub fn with_member(mut self, cohort_id: i64, user_id: i64) -> Self {
        self.members.insert((cohort_id, user_id));
        self
    }

    /// Make the next `remove_membership` call fail with an infrastructure
    /// fault.
    pub fn fail_next_remove(&mut self) {
        self.fail_next_remove = true;
    }

    /// Number of `remove_membership` invocations so far.
    pub fn removal_calls(&self) -> usize {
        self.removal_calls
    }

    /// Number of committed transactions.
    pub fn commits(&self) -> usize {
        self.commits
    }
}

impl Directory for InMemoryDirectory {
    fn find_active_user(&self, username: &str) -> Result<Option<UserRecord>> {
        Ok(self.users.get(username).and_then(|(id, deleted)| {
            if *deleted {
                None
            } else {
                Some(UserRecord {
                    id: *id,
                    username: username.to_string(),
                })
            }
        }))
    }

    fn find_cohort_by_id(&self, id: i64) -> Result<Option<CohortRecord>> {
        Ok(self.cohorts.iter().find(|c| c.id == id).cloned())
    }

    fn find_cohort_by_idnumber(&self, idnumber: &str) -> Result<Option<CohortRecord>> {
        Ok(self.cohorts.iter().find(|c| c.idnumber == idnumber).cloned())
    }

    fn is_member(&self, cohort_id: i64, user_id: i64) -> Result<bool> {
        Ok(self.members.contains(&(cohort_id, user_id)))
    }

    fn remove_membership(&mut self, cohort_id: i64, user_id: i64) -> Result<()> {
        self.removal_calls += 1;
        if self.fail_next_remove {
            self.fail_next_remove = false;
            return Err(DirectoryError::Unavailable(
                "injected removal failure".to_string(),
            ));
        }
        self.members.remove(&(cohort_id, user_id));
        Ok(())
    }

    fn begin(&mut self) -> Result<()> {
        if self.in_transaction {
            return Err(DirectoryError::Transaction(
                "transaction already open".to_string(),
            ));
        }
        self.in_transaction = true;
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        if !self.in_transaction {
            return Err(DirectoryError::Transaction(
                "commit without open transaction".to_string(),
            ));
        }
        self.in_transaction = false;
        self.commits += 1;
        Ok(())
    }
}
