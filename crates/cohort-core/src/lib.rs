//! Cohort membership reconciliation engine.
//!
//! The processor consumes parsed rows plus options and resolves each row
//! against a [`Directory`]: user lookup, cohort lookup, membership query and
//! membership removal. It produces one result per row (input order) and
//! aggregate counters. Persistence, CSV handling and presentation live in
//! sibling crates.

pub mod directory;
pub mod processor;

pub use directory::{CohortRecord, Directory, InMemoryDirectory, UserRecord};
pub use processor::process;
