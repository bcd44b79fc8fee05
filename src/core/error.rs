use std::error::Error;
use std::fmt::Display;

/// Error type for library operations
#[derive(Debug)]
pub enum LibraryError {
    /// The requested record does not exist
    NotFound(String),
    /// Input failed validation
    ValidationError(String),
    /// A uniqueness or reference constraint was violated
    Conflict(String),
    /// The caller is not signed in
    Unauthorized(String),
    /// The blob store rejected a read or write
    StorageError(String),
    /// The database rejected a query
    DatabaseError(String),
    /// A chapter body could not be compressed or decompressed
    CodecError(String),
}

impl LibraryError {
    /// Stable machine-readable code sent to API clients
    pub fn error_code(&self) -> &'static str {
        match self {
            LibraryError::NotFound(_) => "NOT_FOUND",
            LibraryError::ValidationError(_) => "VALIDATION",
            LibraryError::Conflict(_) => "CONFLICT",
            LibraryError::Unauthorized(_) => "UNAUTHORIZED",
            LibraryError::StorageError(_) => "STORAGE_FAILURE",
            LibraryError::DatabaseError(_) => "DATABASE_FAILURE",
            LibraryError::CodecError(_) => "CODEC_FAILURE",
        }
    }
}

impl Display for LibraryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LibraryError::NotFound(msg) => write!(f, "Not found: {}", msg),
            LibraryError::ValidationError(msg) => write!(f, "Validation error: {}", msg),
            LibraryError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            LibraryError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            LibraryError::StorageError(msg) => write!(f, "Storage error: {}", msg),
            LibraryError::DatabaseError(msg) => write!(f, "Database error: {}", msg),
            LibraryError::CodecError(msg) => write!(f, "Codec error: {}", msg),
        }
    }
}

impl Error for LibraryError {}

impl From<rusqlite::Error> for LibraryError {
    fn from(value: rusqlite::Error) -> Self {
        match &value {
            rusqlite::Error::SqliteFailure(err, msg)
                if err.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                LibraryError::Conflict(msg.clone().unwrap_or_else(|| value.to_string()))
            }
            _ => LibraryError::DatabaseError(value.to_string()),
        }
    }
}

impl From<std::io::Error> for LibraryError {
    fn from(value: std::io::Error) -> Self {
        LibraryError::StorageError(value.to_string())
    }
}

impl From<serde_json::Error> for LibraryError {
    fn from(value: serde_json::Error) -> Self {
        LibraryError::DatabaseError(value.to_string())
    }
}

pub type LibraryResult<T> = Result<T, LibraryError>;
