use bvault_common::Error as CommonError;
use bvault_db::DbError;

#[derive(thiserror::Error, Debug)]
pub enum CompactError {
    #[error(transparent)]
    Db(#[from] DbError),

    #[error("database inconsistency: {0}")]
    Inconsistent(String),
}

pub type Result<T> = std::result::Result<T, CompactError>;

impl From<CompactError> for CommonError {
    fn from(e: CompactError) -> Self {
        match e {
            CompactError::Db(e) => e.into(),
            CompactError::Inconsistent(msg) => CommonError::InconsistentDatabase(msg),
        }
    }
}

impl CompactError {
    pub fn inconsistent(message: impl Into<String>) -> Self {
        CompactError::Inconsistent(message.into())
    }
}
