use bvault_common::Error as CommonError;

/// Errors raised by a [`crate::remote::RemoteBackend`] implementation
/// (spec §7 `RemoteTransient`) or while parsing a volume's contents
/// (spec §7 `CorruptedVolume`).
#[derive(thiserror::Error, Debug)]
pub enum BackendError {
    #[error("remote file not found: {0}")]
    NotFound(String),

    #[error("remote operation failed for {filename}: {source}")]
    Transient {
        filename: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("corrupted volume {volume}: {reason}")]
    Corrupted { volume: String, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, BackendError>;

impl From<BackendError> for CommonError {
    fn from(e: BackendError) -> Self {
        match e {
            BackendError::NotFound(name) => CommonError::User {
                kind: bvault_common::UserErrorKind::EmptyRemoteLocation,
                message: format!("remote file not found: {name}"),
            },
            BackendError::Transient { filename, source } => CommonError::RemoteTransient {
                filename,
                source,
            },
            BackendError::Corrupted { volume, reason } => CommonError::corrupted(volume, reason),
            BackendError::Io(e) => CommonError::Io(e),
        }
    }
}

impl BackendError {
    pub fn transient(filename: impl Into<String>, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        BackendError::Transient {
            filename: filename.into(),
            source: Box::new(source),
        }
    }
}
