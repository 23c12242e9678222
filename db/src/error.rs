use bvault_common::Error as CommonError;

#[derive(thiserror::Error, Debug)]
pub enum DbError {
    #[error("sqlite error: {0}")]
    Query(#[from] diesel::result::Error),

    #[error("connection error: {0}")]
    Connection(#[from] diesel::ConnectionError),

    #[error("migration error: {0}")]
    Migration(String),

    #[error("database inconsistency: {0}")]
    Inconsistent(String),
}

pub type Result<T> = std::result::Result<T, DbError>;

impl From<DbError> for CommonError {
    fn from(e: DbError) -> Self {
        match e {
            DbError::Query(err) => CommonError::Database(err.to_string()),
            DbError::Connection(err) => CommonError::Database(err.to_string()),
            DbError::Migration(msg) => CommonError::Migration(msg),
            DbError::Inconsistent(msg) => CommonError::InconsistentDatabase(msg),
        }
    }
}

impl DbError {
    pub fn inconsistent(message: impl Into<String>) -> Self {
        DbError::Inconsistent(message.into())
    }
}
