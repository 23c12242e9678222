//! Metadata pre-processor (spec §4.11): the pipeline stage that maps
//! source-tree entries to per-file metadata blocks, dispatching folders and
//! symlinks directly and forwarding regular files for change detection.
//! Implemented as an [`Actor`] consuming [`SourceEntry`] messages and
//! producing [`ProcessedEntry`] messages on an output channel, directly
//! modeled on `client/actors-framework`'s `Actor`/`ActorEventLoop` pair.

use std::cell::RefCell;
use std::sync::Arc;

use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;

use bvault_common::options::{FiletimeCheckMode, SymlinkPolicy};
use bvault_common::types::EntryType;
use bvault_common::Options;
use bvault_db::models::{FileLookup, Metadataset, PathPrefix};
use bvault_db::schema::{blockset, file_lookup, fileset_entry};
use bvault_db::Database;

use crate::actor::{Actor, ActorHandle};
use crate::error::Result;

/// A single entry discovered by the (external) filesystem scanner.
#[derive(Debug, Clone)]
pub struct SourceEntry {
    pub path_prefix: String,
    pub name: String,
    pub entry_type: EntryType,
    pub last_modified: i64,
    pub size: u64,
    /// Present only for symlinks (`CoreSymlinkTarget`).
    pub symlink_target: Option<String>,
}

/// Enrichment fetched from the database for a regular file forwarded
/// downstream for change detection (spec §4.11: "forward downstream
/// enriched with `(old_id, old_modified, last_file_size, old_meta_hash,
/// old_meta_size, path_prefix_id)`").
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PriorFileState {
    pub old_id: Option<i64>,
    pub old_modified: Option<i64>,
    pub last_file_size: Option<i64>,
    pub old_meta_hash: Option<String>,
    pub old_meta_size: Option<i64>,
}

/// What the pre-processor emits for one source entry.
#[derive(Debug, Clone)]
pub enum ProcessedEntry {
    /// A symlink entry that was dropped per `SymlinkPolicy::Ignore`.
    SymlinkIgnored { path_prefix: String, name: String },
    /// A symlink stored with its target per `SymlinkPolicy::Store`.
    Symlink {
        path_prefix_id: i64,
        name: String,
        metadata_id: i64,
    },
    /// A directory, with metadata stored (or intentionally empty).
    Folder {
        path_prefix_id: i64,
        name: String,
        metadata_id: i64,
    },
    /// A regular file forwarded downstream with its prior-state lookup
    /// already resolved, ready for change detection / the block splitter.
    FileCandidate {
        path_prefix_id: i64,
        name: String,
        prior: PriorFileState,
    },
}

/// Callback the caller supplies to turn a [`SourceEntry`] into a stored
/// metadata blockset (hash, length). The chunker and hasher that actually
/// serialise and store POSIX/Windows metadata are external collaborators
/// (spec §1); this trait is the seam the pre-processor calls through.
pub trait MetadataEncoder: Send + Sync {
    fn encode(&self, entry: &SourceEntry) -> (String, i64);
}

/// The metadata pre-processor actor (spec §4.11).
pub struct MetadataPreProcessor {
    db: Arc<Database>,
    encoder: Arc<dyn MetadataEncoder>,
    options: Options,
    out: ActorHandle<crate::block_splitter::BlockSplitter>,
    /// Per-thread cache of the most recently resolved `(prefix, prefix_id)`
    /// pair, avoiding a redundant `GetOrCreatePathPrefix` call when
    /// consecutive entries share a directory.
    prefix_cache: RefCell<Option<(String, i64)>>,
}

impl MetadataPreProcessor {
    pub fn new(
        db: Arc<Database>,
        encoder: Arc<dyn MetadataEncoder>,
        options: Options,
        out: ActorHandle<crate::block_splitter::BlockSplitter>,
    ) -> Self {
        Self {
            db,
            encoder,
            options,
            out,
            prefix_cache: RefCell::new(None),
        }
    }

    fn resolve_prefix_id(&self, conn: &mut SqliteConnection, prefix: &str) -> Result<i64> {
        if let Some((cached_prefix, id)) = self.prefix_cache.borrow().as_ref() {
            if cached_prefix == prefix {
                return Ok(*id);
            }
        }
        let id = PathPrefix::find_or_create(conn, prefix)?;
        *self.prefix_cache.borrow_mut() = Some((prefix.to_string(), id));
        Ok(id)
    }

    fn process(&self, entry: SourceEntry) -> Result<ProcessedEntry> {
        self.db.with_connection(|conn| {
            if entry.entry_type == EntryType::Symlink {
                return self.process_symlink(conn, entry);
            }
            if entry.entry_type == EntryType::Folder {
                return self.process_folder(conn, entry);
            }
            self.process_file(conn, entry)
        })
    }

    fn process_symlink(
        &self,
        conn: &mut SqliteConnection,
        entry: SourceEntry,
    ) -> Result<ProcessedEntry> {
        match self.options.symlink_policy {
            SymlinkPolicy::Ignore => Ok(ProcessedEntry::SymlinkIgnored {
                path_prefix: entry.path_prefix,
                name: entry.name,
            }),
            SymlinkPolicy::Store => {
                let (hash, length) = self.encoder.encode(&entry);
                let blockset_id = bvault_db::models::Blockset::find_or_create(conn, &hash, length)?;
                let metadata_id = Metadataset::find_or_create(conn, blockset_id)?;
                let path_prefix_id = self.resolve_prefix_id(conn, &entry.path_prefix)?;
                Ok(ProcessedEntry::Symlink {
                    path_prefix_id,
                    name: entry.name,
                    metadata_id,
                })
            }
            // `Follow` is handled upstream by the scanner (it re-presents
            // the symlink's target as a regular `File` entry); by the time
            // an entry reaches here tagged `Symlink` the policy cannot be
            // `Follow`.
            SymlinkPolicy::Follow => Ok(ProcessedEntry::SymlinkIgnored {
                path_prefix: entry.path_prefix,
                name: entry.name,
            }),
        }
    }

    fn process_folder(
        &self,
        conn: &mut SqliteConnection,
        entry: SourceEntry,
    ) -> Result<ProcessedEntry> {
        let (hash, length) = self.encoder.encode(&entry);
        let blockset_id = bvault_db::models::Blockset::find_or_create(conn, &hash, length)?;
        let metadata_id = Metadataset::find_or_create(conn, blockset_id)?;
        let path_prefix_id = self.resolve_prefix_id(conn, &entry.path_prefix)?;
        Ok(ProcessedEntry::Folder {
            path_prefix_id,
            name: entry.name,
            metadata_id,
        })
    }

    fn process_file(
        &self,
        conn: &mut SqliteConnection,
        entry: SourceEntry,
    ) -> Result<ProcessedEntry> {
        let path_prefix_id = self.resolve_prefix_id(conn, &entry.path_prefix)?;
        let prior = match self.options.filetime_check {
            FiletimeCheckMode::DisableFiletimeCheck | FiletimeCheckMode::CheckFiletimeOnly => {
                self.get_file_last_modified(conn, path_prefix_id, &entry.name)?
            }
            FiletimeCheckMode::Full => self.get_full_prior_state(conn, path_prefix_id, &entry.name)?,
        };
        Ok(ProcessedEntry::FileCandidate {
            path_prefix_id,
            name: entry.name,
            prior,
        })
    }

    /// The lighter `GetFileLastModified` query used in `CheckFiletimeOnly`
    /// / `DisableFiletimeCheck` mode (spec §4.11): only `old_id` and
    /// `old_modified` are fetched, skipping the metadata-hash join.
    fn get_file_last_modified(
        &self,
        conn: &mut SqliteConnection,
        path_prefix_id: i64,
        name: &str,
    ) -> Result<PriorFileState> {
        let existing = FileLookup::find(conn, path_prefix_id, name)?;
        let Some(row) = existing else {
            return Ok(PriorFileState::default());
        };
        let last_modified: Option<i64> = fileset_entry::table
            .filter(fileset_entry::file_id.eq(row.id))
            .order(fileset_entry::last_modified.desc())
            .select(fileset_entry::last_modified)
            .first(conn)
            .optional()?;
        Ok(PriorFileState {
            old_id: Some(row.id),
            old_modified: last_modified,
            last_file_size: None,
            old_meta_hash: None,
            old_meta_size: None,
        })
    }

    /// The full lookup used in `Full` filetime-check mode: resolves the
    /// file's prior content size alongside its metadata hash/size.
    fn get_full_prior_state(
        &self,
        conn: &mut SqliteConnection,
        path_prefix_id: i64,
        name: &str,
    ) -> Result<PriorFileState> {
        let existing = FileLookup::find(conn, path_prefix_id, name)?;
        let Some(row) = existing else {
            return Ok(PriorFileState::default());
        };

        let last_modified: Option<i64> = fileset_entry::table
            .filter(fileset_entry::file_id.eq(row.id))
            .order(fileset_entry::last_modified.desc())
            .select(fileset_entry::last_modified)
            .first(conn)
            .optional()?;

        let last_file_size: Option<i64> = blockset::table
            .filter(blockset::id.eq(row.blockset_id))
            .select(blockset::length)
            .first(conn)
            .optional()?;

        let (old_meta_hash, old_meta_size) = match row.metadata_id {
            None => (None, None),
            Some(metadata_id) => {
                let meta = bvault_db::schema::metadataset::table
                    .filter(bvault_db::schema::metadataset::id.eq(metadata_id))
                    .inner_join(
                        blockset::table.on(blockset::id.eq(bvault_db::schema::metadataset::blockset_id)),
                    )
                    .select((blockset::full_hash, blockset::length))
                    .first::<(String, i64)>(conn)
                    .optional()?;
                match meta {
                    Some((hash, size)) => (Some(hash), Some(size)),
                    None => (None, None),
                }
            }
        };

        Ok(PriorFileState {
            old_id: Some(row.id),
            old_modified: last_modified,
            last_file_size,
            old_meta_hash,
            old_meta_size,
        })
    }
}

impl Actor for MetadataPreProcessor {
    type Message = SourceEntry;

    async fn handle_message(&mut self, message: Self::Message) {
        match self.process(message) {
            // Only regular files carry content blocks to split; folders
            // and symlinks are terminal for this stage.
            Ok(candidate @ ProcessedEntry::FileCandidate { .. }) => {
                self.out.send(candidate).await;
            }
            Ok(_) => {}
            Err(e) => {
                log::warn!("metadata pre-processor failed to process entry: {e}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bvault_common::options::{FiletimeCheckMode, SymlinkPolicy};

    struct FixedEncoder;
    impl MetadataEncoder for FixedEncoder {
        fn encode(&self, _entry: &SourceEntry) -> (String, i64) {
            ("fixed-meta-hash".to_string(), 64)
        }
    }

    fn processor_without_output(db: Arc<Database>, options: Options) -> MetadataPreProcessor {
        // Tests below only exercise `process`, which does not touch
        // `self.out`; build a throwaway channel target for the handle.
        let splitter = crate::block_splitter::BlockSplitter::new_noop();
        let out = crate::actor::spawn_actor(splitter, 1);
        MetadataPreProcessor::new(db, Arc::new(FixedEncoder), options, out)
    }

    fn folder_entry() -> SourceEntry {
        SourceEntry {
            path_prefix: "/home/".to_string(),
            name: "docs".to_string(),
            entry_type: EntryType::Folder,
            last_modified: 0,
            size: 0,
            symlink_target: None,
        }
    }

    #[tokio::test]
    async fn folders_get_a_metadataset_and_emit_a_folder_entry() {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let proc = processor_without_output(db, Options::default());
        let result = proc.process(folder_entry()).unwrap();
        assert!(matches!(result, ProcessedEntry::Folder { .. }));
    }

    #[tokio::test]
    async fn ignored_symlinks_are_dropped() {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let options = Options {
            symlink_policy: SymlinkPolicy::Ignore,
            ..Options::default()
        };
        let proc = processor_without_output(db, options);
        let entry = SourceEntry {
            entry_type: EntryType::Symlink,
            symlink_target: Some("/target".to_string()),
            ..folder_entry()
        };
        let result = proc.process(entry).unwrap();
        assert!(matches!(result, ProcessedEntry::SymlinkIgnored { .. }));
    }

    #[tokio::test]
    async fn stored_symlinks_get_a_metadataset() {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let options = Options {
            symlink_policy: SymlinkPolicy::Store,
            ..Options::default()
        };
        let proc = processor_without_output(db, options);
        let entry = SourceEntry {
            entry_type: EntryType::Symlink,
            symlink_target: Some("/target".to_string()),
            ..folder_entry()
        };
        let result = proc.process(entry).unwrap();
        assert!(matches!(result, ProcessedEntry::Symlink { .. }));
    }

    #[tokio::test]
    async fn unknown_file_has_no_prior_state() {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let proc = processor_without_output(db, Options::default());
        let entry = SourceEntry {
            entry_type: EntryType::File,
            name: "new.txt".to_string(),
            ..folder_entry()
        };
        let result = proc.process(entry).unwrap();
        match result {
            ProcessedEntry::FileCandidate { prior, .. } => assert_eq!(prior, PriorFileState::default()),
            other => panic!("expected FileCandidate, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn prefix_cache_avoids_recreating_known_prefixes() {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let proc = processor_without_output(db.clone(), Options::default());
        let id1 = proc.process(folder_entry()).unwrap();
        let id2 = proc.process(SourceEntry { name: "other".to_string(), ..folder_entry() }).unwrap();
        let prefix_id = |p: ProcessedEntry| match p {
            ProcessedEntry::Folder { path_prefix_id, .. } => path_prefix_id,
            _ => panic!("expected folder"),
        };
        assert_eq!(prefix_id(id1), prefix_id(id2));
    }

    #[tokio::test]
    async fn full_filetime_mode_resolves_prior_size_and_meta_hash() {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let options = Options {
            filetime_check: FiletimeCheckMode::Full,
            ..Options::default()
        };

        // Seed an existing file with known content size and metadata hash.
        let (prefix_id, file_id) = db
            .with_connection(|conn| {
                let prefix_id = PathPrefix::find_or_create(conn, "/home/")?;
                let content_bs = bvault_db::models::Blockset::find_or_create(conn, "content-hash", 500)?;
                let meta_bs = bvault_db::models::Blockset::find_or_create(conn, "fixed-meta-hash", 64)?;
                let metadata_id = Metadataset::find_or_create(conn, meta_bs)?;
                let file_id =
                    FileLookup::insert(conn, prefix_id, "report.pdf", content_bs, Some(metadata_id))?;
                Ok((prefix_id, file_id))
            })
            .unwrap();
        let _ = (prefix_id, file_id);

        let proc = processor_without_output(db, options);
        let entry = SourceEntry {
            path_prefix: "/home/".to_string(),
            name: "report.pdf".to_string(),
            entry_type: EntryType::File,
            last_modified: 100,
            size: 500,
            symlink_target: None,
        };
        let result = proc.process(entry).unwrap();
        match result {
            ProcessedEntry::FileCandidate { prior, .. } => {
                assert_eq!(prior.last_file_size, Some(500));
                assert_eq!(prior.old_meta_hash, Some("fixed-meta-hash".to_string()));
                assert_eq!(prior.old_meta_size, Some(64));
            }
            other => panic!("expected FileCandidate, got {other:?}"),
        }
    }
}
