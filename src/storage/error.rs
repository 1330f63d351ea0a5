use std::fmt;

pub type StorageResult<T> = Result<T, StorageError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// The backing file could not be read or written.
    Io(String),
    /// The stored payload is not a JSON object of strings.
    Corrupt(String),
}

impl StorageError {
    pub fn code_str(&self) -> &'static str {
        match self {
            StorageError::Io(_) => "storage/io",
            StorageError::Corrupt(_) => "storage/corrupt",
        }
    }
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::Io(message) => write!(f, "Local storage I/O failed: {message}"),
            StorageError::Corrupt(message) => write!(f, "Local storage is corrupt: {message}"),
        }
    }
}

impl std::error::Error for StorageError {}
