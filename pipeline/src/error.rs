use bvault_common::Error as CommonError;
use bvault_db::DbError;

#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Db(#[from] DbError),

    #[error("operation cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, PipelineError>;

impl From<PipelineError> for CommonError {
    fn from(e: PipelineError) -> Self {
        match e {
            PipelineError::Db(e) => e.into(),
            PipelineError::Cancelled => CommonError::Cancelled,
        }
    }
}
