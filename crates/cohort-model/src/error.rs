//! Infrastructure fault types.
//!
//! Directory faults are disjoint from per-row statuses: a fault aborts the
//! whole run and no partial outcome is returned.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("directory io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed directory snapshot: {0}")]
    Malformed(String),
    #[error("transaction error: {0}")]
    Transaction(String),
    #[error("directory unavailable: {0}")]
    Unavailable(String),
}

pub type Result<T> = std::result::Result<T, DirectoryError>;
