use std::error::Error;
use std::fmt::{Display, Formatter};

/// Canonical Firestore status codes surfaced by the datastores.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FirestoreErrorCode {
    InvalidArgument,
    MissingProjectId,
    Internal,
    NotFound,
    AlreadyExists,
    FailedPrecondition,
    PermissionDenied,
    Unauthenticated,
    Unavailable,
    DeadlineExceeded,
    ResourceExhausted,
}

impl FirestoreErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            FirestoreErrorCode::InvalidArgument => "firestore/invalid-argument",
            FirestoreErrorCode::MissingProjectId => "firestore/missing-project-id",
            FirestoreErrorCode::Internal => "firestore/internal",
            FirestoreErrorCode::NotFound => "firestore/not-found",
            FirestoreErrorCode::AlreadyExists => "firestore/already-exists",
            FirestoreErrorCode::FailedPrecondition => "firestore/failed-precondition",
            FirestoreErrorCode::PermissionDenied => "firestore/permission-denied",
            FirestoreErrorCode::Unauthenticated => "firestore/unauthenticated",
            FirestoreErrorCode::Unavailable => "firestore/unavailable",
            FirestoreErrorCode::DeadlineExceeded => "firestore/deadline-exceeded",
            FirestoreErrorCode::ResourceExhausted => "firestore/resource-exhausted",
        }
    }

    /// Parses the canonical status name carried in a REST error body
    /// (`"NOT_FOUND"`, `"PERMISSION_DENIED"`, ...).
    pub fn from_canonical_status(status: &str) -> Option<Self> {
        let code = match status {
            "INVALID_ARGUMENT" | "OUT_OF_RANGE" => FirestoreErrorCode::InvalidArgument,
            "FAILED_PRECONDITION" => FirestoreErrorCode::FailedPrecondition,
            "UNAUTHENTICATED" => FirestoreErrorCode::Unauthenticated,
            "PERMISSION_DENIED" => FirestoreErrorCode::PermissionDenied,
            "NOT_FOUND" => FirestoreErrorCode::NotFound,
            "ALREADY_EXISTS" | "ABORTED" => FirestoreErrorCode::AlreadyExists,
            "RESOURCE_EXHAUSTED" => FirestoreErrorCode::ResourceExhausted,
            "UNAVAILABLE" => FirestoreErrorCode::Unavailable,
            "DEADLINE_EXCEEDED" => FirestoreErrorCode::DeadlineExceeded,
            "CANCELLED" | "DATA_LOSS" | "UNKNOWN" | "INTERNAL" => FirestoreErrorCode::Internal,
            _ => return None,
        };
        Some(code)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FirestoreError {
    pub code: FirestoreErrorCode,
    message: String,
}

impl FirestoreError {
    pub fn new(code: FirestoreErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn code_str(&self) -> &'static str {
        self.code.as_str()
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Display for FirestoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code_str())
    }
}

impl Error for FirestoreError {}

pub type FirestoreResult<T> = Result<T, FirestoreError>;

pub fn invalid_argument(message: impl Into<String>) -> FirestoreError {
    FirestoreError::new(FirestoreErrorCode::InvalidArgument, message)
}

pub fn missing_project_id() -> FirestoreError {
    FirestoreError::new(
        FirestoreErrorCode::MissingProjectId,
        "Firebase options must include a project_id to use Firestore",
    )
}

pub fn internal_error(message: impl Into<String>) -> FirestoreError {
    FirestoreError::new(FirestoreErrorCode::Internal, message)
}

pub fn not_found(message: impl Into<String>) -> FirestoreError {
    FirestoreError::new(FirestoreErrorCode::NotFound, message)
}

pub fn already_exists(message: impl Into<String>) -> FirestoreError {
    FirestoreError::new(FirestoreErrorCode::AlreadyExists, message)
}

pub fn failed_precondition(message: impl Into<String>) -> FirestoreError {
    FirestoreError::new(FirestoreErrorCode::FailedPrecondition, message)
}

pub fn permission_denied(message: impl Into<String>) -> FirestoreError {
    FirestoreError::new(FirestoreErrorCode::PermissionDenied, message)
}

pub fn unauthenticated(message: impl Into<String>) -> FirestoreError {
    FirestoreError::new(FirestoreErrorCode::Unauthenticated, message)
}

pub fn unavailable(message: impl Into<String>) -> FirestoreError {
    FirestoreError::new(FirestoreErrorCode::Unavailable, message)
}

pub fn deadline_exceeded(message: impl Into<String>) -> FirestoreError {
    FirestoreError::new(FirestoreErrorCode::DeadlineExceeded, message)
}

pub fn resource_exhausted(message: impl Into<String>) -> FirestoreError {
    FirestoreError::new(FirestoreErrorCode::ResourceExhausted, message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_carries_message_and_code() {
        let err = not_found("No document to update: cities/lis");
        assert_eq!(err.code, FirestoreErrorCode::NotFound);
        assert_eq!(err.message(), "No document to update: cities/lis");
        assert_eq!(
            err.to_string(),
            "No document to update: cities/lis (firestore/not-found)"
        );
    }

    #[test]
    fn canonical_status_names() {
        assert_eq!(
            FirestoreErrorCode::from_canonical_status("ABORTED"),
            Some(FirestoreErrorCode::AlreadyExists)
        );
        assert_eq!(
            FirestoreErrorCode::from_canonical_status("DATA_LOSS"),
            Some(FirestoreErrorCode::Internal)
        );
        assert_eq!(FirestoreErrorCode::from_canonical_status("OK"), None);
    }
}
