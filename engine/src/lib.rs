//! Top-level orchestration (spec §2) wiring the index database, compact
//! engine, retention policies, recreate engine and backup pipeline into
//! one set of entry points: [`backup::BackupPipeline`], [`run_compact`],
//! [`retention::run_retention`], [`delete::drop_filesets_and_remove`], and
//! [`recreate::run_recreate`].

pub mod backup;
pub mod broken;
pub mod compact;
pub mod delete;
pub mod error;
pub mod recreate;
pub mod retention;

pub use backup::BackupPipeline;
pub use broken::list_and_clean_broken_files;
pub use compact::{run_compact, CompactOutcome};
pub use delete::drop_filesets_and_remove;
pub use error::{EngineError, Result};
pub use recreate::{run_recreate, RecreateDecoders, RecreateSummary};
pub use retention::{run_retention, RetentionRequest};
