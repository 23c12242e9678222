//! Recreate engine (spec §4.9, §4.10): rebuilds the local index database
//! from remote volumes alone. Exposes one function per phase; the engine
//! crate drives them in order against a live `RemoteBackend`.

pub mod broken;
pub mod cleanup;
pub mod error;
pub mod file_lists;
pub mod index_volumes;
pub mod listing;
pub mod reconcile;
pub mod recovery;
pub mod temp_blocklist;

pub use broken::{list_broken_files, mark_missing_volumes_for_deletion, BrokenFile};
pub use cleanup::{cleanup_deleted_blocks, cleanup_missing_volumes, verify_consistency, verify_consistency_or_fail, ConsistencyViolation};
pub use error::{RecreateError, Result};
pub use file_lists::ingest_file_list;
pub use index_volumes::{ingest_index_volume, resolve_block_volume, IndexIngestReport};
pub use listing::{list_remote, require_passphrase_if_encrypted, RemoteEntry};
pub use reconcile::{add_block_and_blockset_entry_from_temp, blockset_is_complete, find_missing_blocklist_hashes, ReconcileReport};
pub use recovery::{ingest_block_volume, missing_blockset_ids, missing_blocklist_volumes, outstanding_blocklist_hashes};
pub use temp_blocklist::TempBlockListHash;
