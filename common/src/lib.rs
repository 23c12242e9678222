//! Shared types, options, error taxonomy and the remote filename codec used
//! across the backup engine's crates.

pub mod chunking;
pub mod error;
pub mod filename;
pub mod options;
pub mod types;

pub use error::{Error, Result, UserErrorKind};
pub use options::{FiletimeCheckMode, Options, SymlinkPolicy};
pub use types::{EntryType, Hash, VolumeState};
