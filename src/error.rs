use thiserror::Error;
use tonic::Status;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Backend unavailable: {0}")]
    Unavailable(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// True for failures of the storage backend itself (as opposed to
    /// rejected input or missing rights).
    pub fn is_backend_failure(&self) -> bool {
        matches!(
            self,
            AppError::Database(_)
                | AppError::Storage(_)
                | AppError::Serialization(_)
                | AppError::Io(_)
                | AppError::Unavailable(_)
        )
    }

    /// Read paths report backend failures as `Unavailable` so callers can tell
    /// an empty result apart from an outage.
    pub fn into_unavailable(self) -> Self {
        match self {
            AppError::Unavailable(_) => self,
            e if e.is_backend_failure() => AppError::Unavailable(e.to_string()),
            e => e,
        }
    }
}

impl From<AppError> for Status {
    fn from(err: AppError) -> Self {
        match err {
            AppError::Database(e) => Status::internal(format!("Database error: {}", e)),
            AppError::NotFound(msg) => Status::not_found(msg),
            AppError::InvalidInput(msg) => Status::invalid_argument(msg),
            AppError::Conflict(msg) => Status::already_exists(msg),
            AppError::Unauthenticated(msg) => Status::unauthenticated(msg),
            AppError::PermissionDenied(msg) => Status::permission_denied(msg),
            AppError::Unavailable(msg) => Status::unavailable(msg),
            AppError::Storage(msg) => Status::internal(format!("Storage error: {}", msg)),
            AppError::Serialization(e) => {
                Status::internal(format!("Serialization error: {}", e))
            }
            AppError::Io(e) => Status::internal(format!("I/O error: {}", e)),
            AppError::Config(msg) => Status::internal(format!("Configuration error: {}", msg)),
            AppError::Internal(msg) => Status::internal(msg),
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;
