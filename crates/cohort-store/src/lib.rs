//! Directory snapshot store.
//!
//! A directory snapshot is a folder of three CSV files mirroring the
//! user/cohort/membership tables the reconciliation engine resolves against:
//!
//! - `users.csv`: `id,username,deleted`
//! - `cohorts.csv`: `id,name,idnumber`
//! - `members.csv`: `cohortid,userid`
//!
//! [`CsvDirectory`] loads a snapshot eagerly and applies removals in memory;
//! `commit` rewrites `members.csv` atomically, so an aborted run leaves the
//! snapshot untouched.

pub mod snapshot;

pub use snapshot::CsvDirectory;
