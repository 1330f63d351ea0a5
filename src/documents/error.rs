use std::fmt;

use crate::firestore::FirestoreError;

pub type DocumentResult<T> = Result<T, DocumentError>;

/// A store failure, tagged with the side of the store it came from.
///
/// The wrapped [`FirestoreError`] is passed through unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentError {
    /// create, update, upsert, delete and batch failures.
    Write(FirestoreError),
    /// get, list, query, paginate, exists and watch failures.
    Read(FirestoreError),
}

impl DocumentError {
    pub fn code_str(&self) -> &'static str {
        self.store_error().code_str()
    }

    pub fn store_error(&self) -> &FirestoreError {
        match self {
            DocumentError::Write(err) | DocumentError::Read(err) => err,
        }
    }

    pub fn is_write(&self) -> bool {
        matches!(self, DocumentError::Write(_))
    }

    pub fn into_store_error(self) -> FirestoreError {
        match self {
            DocumentError::Write(err) | DocumentError::Read(err) => err,
        }
    }
}

impl fmt::Display for DocumentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentError::Write(err) => write!(f, "Store write failed: {err}"),
            DocumentError::Read(err) => write!(f, "Store read failed: {err}"),
        }
    }
}

impl std::error::Error for DocumentError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.store_error())
    }
}
