//! Engine-level error taxonomy: each subsystem's error converts in via
//! `#[from]`, mirroring `client/file-manager/src/error.rs`'s wrapper shape.

#[derive(thiserror::Error, Debug)]
pub enum EngineError {
    #[error(transparent)]
    Common(#[from] bvault_common::Error),

    #[error(transparent)]
    Db(#[from] bvault_db::DbError),

    #[error(transparent)]
    Backend(#[from] bvault_backend::BackendError),

    #[error(transparent)]
    Compact(#[from] bvault_compact::CompactError),

    #[error(transparent)]
    Recreate(#[from] bvault_recreate::RecreateError),

    #[error(transparent)]
    Pipeline(#[from] bvault_pipeline::PipelineError),
}

pub type Result<T> = std::result::Result<T, EngineError>;
