use bvault_common::error::UserErrorKind;
use bvault_common::Error as CommonError;
use bvault_db::DbError;

#[derive(thiserror::Error, Debug)]
pub enum RecreateError {
    #[error(transparent)]
    Db(#[from] DbError),

    #[error("{kind}: {message}")]
    User {
        kind: UserErrorKind,
        message: String,
    },

    #[error("database inconsistency: {0}")]
    Inconsistent(String),

    #[error("corrupted volume {volume}: {reason}")]
    Corrupted { volume: String, reason: String },
}

pub type Result<T> = std::result::Result<T, RecreateError>;

impl RecreateError {
    pub fn user(kind: UserErrorKind, message: impl Into<String>) -> Self {
        RecreateError::User {
            kind,
            message: message.into(),
        }
    }

    pub fn inconsistent(message: impl Into<String>) -> Self {
        RecreateError::Inconsistent(message.into())
    }

    pub fn corrupted(volume: impl Into<String>, reason: impl Into<String>) -> Self {
        RecreateError::Corrupted {
            volume: volume.into(),
            reason: reason.into(),
        }
    }
}

impl From<RecreateError> for CommonError {
    fn from(e: RecreateError) -> Self {
        match e {
            RecreateError::Db(e) => e.into(),
            RecreateError::User { kind, message } => CommonError::User { kind, message },
            RecreateError::Inconsistent(msg) => CommonError::InconsistentDatabase(msg),
            RecreateError::Corrupted { volume, reason } => CommonError::CorruptedVolume { volume, reason },
        }
    }
}
