//! CSV snapshot loading and the `Directory` implementation over it.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, WriterBuilder};
use tracing::{debug, info};

use cohort_core::{CohortRecord, Directory, UserRecord};
use cohort_model::{DirectoryError, Result};

const USERS_FILE: &str = "users.csv";
const COHORTS_FILE: &str = "cohorts.csv";
const MEMBERS_FILE: &str = "members.csv";

#[derive(Debug, Clone)]
struct UserRow {
    id: i64,
    username: String,
    deleted: bool,
}

/// A directory backed by a CSV snapshot folder.
///
/// Removals mutate the in-memory member set only; `commit` persists them by
/// rewriting `members.csv` through a temp file + rename. Concurrent runs
/// against the same snapshot are not guarded here.
#[derive(Debug)]
pub struct CsvDirectory {
    root: PathBuf,
    users: Vec<UserRow>,
    cohorts: Vec<CohortRecord>,
    members: BTreeSet<(i64, i64)>,
    in_transaction: bool,
    staged_removals: usize,
}

impl CsvDirectory {
    /// Load a snapshot folder. Malformed rows are load-time faults.
    pub fn open(root: &Path) -> Result<Self> {
        let users = load_users(&root.join(USERS_FILE))?;
        let cohorts = load_cohorts(&root.join(COHORTS_FILE))?;
        let members = load_members(&root.join(MEMBERS_FILE))?;
        debug!(
            users = users.len(),
            cohorts = cohorts.len(),
            members = members.len(),
            root = %root.display(),
            "directory snapshot loaded"
        );
        Ok(Self {
            root: root.to_path_buf(),
            users,
            cohorts,
            members,
            in_transaction: false,
            staged_removals: 0,
        })
    }

    /// All cohorts in the snapshot, in file order.
    pub fn cohorts(&self) -> &[CohortRecord] {
        &self.cohorts
    }

    /// Current member count of a cohort (staged removals included).
    pub fn member_count(&self, cohort_id: i64) -> usize {
        self.members
            .iter()
            .filter(|(cohort, _)| *cohort == cohort_id)
            .count()
    }

    fn write_members(&self) -> Result<()> {
        let target = self.root.join(MEMBERS_FILE);
        let temp = self.root.join(format!("{MEMBERS_FILE}.tmp"));
        {
            let mut writer = WriterBuilder::new()
                .from_path(&temp)
                .map_err(csv_fault)?;
            write_member_rows(&mut writer, &self.members)?;
        }
        fs::rename(&temp, &target)?;
        Ok(())
    }
}

fn write_member_rows<W: std::io::Write>(
    writer: &mut csv::Writer<W>,
    members: &BTreeSet<(i64, i64)>,
) -> Result<()> {
    writer
        .write_record(["cohortid", "userid"])
        .map_err(csv_fault)?;
    for (cohort_id, user_id) in members {
        writer
            .write_record([cohort_id.to_string(), user_id.to_string()])
            .map_err(csv_fault)?;
    }
    writer.flush()?;
    Ok(())
}

/// Map a csv-layer error onto the directory fault taxonomy.
fn csv_fault(error: csv::Error) -> DirectoryError {
    match error.into_kind() {
        csv::ErrorKind::Io(io) => DirectoryError::Io(io),
        other => DirectoryError::Malformed(format!("{other:?}")),
    }
}

impl Directory for CsvDirectory {
    fn find_active_user(&self, username: &str) -> Result<Option<UserRecord>> {
        Ok(self
            .users
            .iter()
            .find(|user| !user.deleted && user.username == username)
            .map(|user| UserRecord {
                id: user.id,
                username: user.username.clone(),
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
        self.members.remove(&(cohort_id, user_id));
        self.staged_removals += 1;
        Ok(())
    }

    fn begin(&mut self) -> Result<()> {
        if self.in_transaction {
            return Err(DirectoryError::Transaction(
                "transaction already open".to_string(),
            ));
        }
        self.in_transaction = true;
        self.staged_removals = 0;
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        if !self.in_transaction {
            return Err(DirectoryError::Transaction(
                "commit without open transaction".to_string(),
            ));
        }
        self.write_members()?;
        self.in_transaction = false;
        info!(removals = self.staged_removals, "membership snapshot committed");
        Ok(())
    }
}

fn open_reader(path: &Path) -> Result<csv::Reader<fs::File>> {
    ReaderBuilder::new()
        .flexible(false)
        .from_path(path)
        .map_err(csv_fault)
}

fn parse_id(raw: &str, path: &Path, field: &str) -> Result<i64> {
    raw.trim().parse::<i64>().map_err(|_| {
        DirectoryError::Malformed(format!(
            "{}: non-numeric {field} value {raw:?}",
            path.display()
        ))
    })
}

fn load_users(path: &Path) -> Result<Vec<UserRow>> {
    let mut reader = open_reader(path)?;
    let mut users = Vec::new();
    for record in reader.records() {
        let record = record.map_err(csv_fault)?;
        if record.len() < 3 {
            return Err(DirectoryError::Malformed(format!(
                "{}: expected id,username,deleted",
                path.display()
            )));
        }
        let deleted = match record[2].trim() {
            "0" => false,
            "1" => true,
            other => {
                return Err(DirectoryError::Malformed(format!(
                    "{}: deleted flag must be 0 or 1, got {other:?}",
                    path.display()
                )));
            }
        };
        users.push(UserRow {
            id: parse_id(&record[0], path, "id")?,
            username: record[1].trim().to_string(),
            deleted,
        });
    }
    Ok(users)
}

fn load_cohorts(path: &Path) -> Result<Vec<CohortRecord>> {
    let mut reader = open_reader(path)?;
    let mut cohorts = Vec::new();
    for record in reader.records() {
        let record = record.map_err(csv_fault)?;
        if record.len() < 3 {
            return Err(DirectoryError::Malformed(format!(
                "{}: expected id,name,idnumber",
                path.display()
            )));
        }
        cohorts.push(CohortRecord {
            id: parse_id(&record[0], path, "id")?,
            name: record[1].trim().to_string(),
            idnumber: record[2].trim().to_string(),
        });
    }
    Ok(cohorts)
}

fn load_members(path: &Path) -> Result<BTreeSet<(i64, i64)>> {
    let mut reader = open_reader(path)?;
    let mut members = BTreeSet::new();
    for record in reader.records() {
        let record = record.map_err(csv_fault)?;
        if record.len() < 2 {
            return Err(DirectoryError::Malformed(format!(
                "{}: expected cohortid,userid",
                path.display()
            )));
        }
        members.insert((
            parse_id(&record[0], path, "cohortid")?,
            parse_id(&record[1], path, "userid")?,
        ));
    }
    Ok(members)
}
