use std::fmt;

/// Stable identifier strings surfaced to the operator for [`Error::User`].
///
/// These mirror the handful of well-known error codes a caller may want to
/// match on programmatically (e.g. to prompt for a passphrase), rather than
/// parsing the human-readable message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserErrorKind {
    EmptyRemoteLocation,
    MissingPassphrase,
    RecreateTargetDatabaseExists,
    WrongRemotePrefix,
    DowngradeRefused,
}

impl UserErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EmptyRemoteLocation => "EmptyRemoteLocation",
            Self::MissingPassphrase => "MissingPassphrase",
            Self::RecreateTargetDatabaseExists => "RecreateTargetDatabaseExists",
            Self::WrongRemotePrefix => "WrongRemotePrefix",
            Self::DowngradeRefused => "DowngradeRefused",
        }
    }
}

impl fmt::Display for UserErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The top-level error taxonomy described in spec §7.
///
/// Propagation policy: `InconsistentDatabase` and `Cancelled` bubble
/// unmodified; `RemoteTransient` is wrapped with the offending filename by
/// callers before being returned; `CorruptedVolume` is usually logged as a
/// warning and swallowed by the ingest loop that produced it rather than
/// returned, except in unit tests where the caller is expected to surface it.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Recoverable by reconfiguration: missing passphrase, wrong prefix,
    /// empty remote, file missing on open, etc.
    #[error("{kind}: {message}")]
    User {
        kind: UserErrorKind,
        message: String,
    },

    /// Network or authentication failure at the backend layer, already
    /// retried with backoff and surfaced only after exhaustion.
    #[error("remote operation failed for {filename}: {source}")]
    RemoteTransient {
        filename: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Mismatched row counts during cascade deletes, block reassignment, or
    /// fileset drop. Always fatal; the caller must run repair/recreate.
    #[error("database inconsistency: {0}")]
    InconsistentDatabase(String),

    /// Hash mismatch, malformed blocklist, bad compression header. The
    /// offending volume is normally skipped by the caller; this variant
    /// exists so unit tests (which treat corruption as fatal per spec §7)
    /// have something concrete to assert on.
    #[error("corrupted volume {volume}: {reason}")]
    CorruptedVolume { volume: String, reason: String },

    /// The operation was cancelled cooperatively via the progress token.
    /// Never silently swallowed.
    #[error("operation cancelled")]
    Cancelled,

    /// A database-layer error, already rendered to a message by the `db`
    /// crate (kept string-typed here so `bvault-common` need not depend on
    /// Diesel).
    #[error("database error: {0}")]
    Database(String),

    #[error("migration error: {0}")]
    Migration(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn user(kind: UserErrorKind, message: impl Into<String>) -> Self {
        Error::User {
            kind,
            message: message.into(),
        }
    }

    pub fn inconsistent(message: impl Into<String>) -> Self {
        Error::InconsistentDatabase(message.into())
    }

    pub fn corrupted(volume: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::CorruptedVolume {
            volume: volume.into(),
            reason: reason.into(),
        }
    }

    /// True for the kinds of error that a caller may retry after backing off
    /// (remote transient errors), as opposed to ones that indicate the
    /// operation must not be retried as-is (inconsistent database, user
    /// error, cancellation).
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::RemoteTransient { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;
