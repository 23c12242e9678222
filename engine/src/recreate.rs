//! Drives the recreate engine (spec §4.9) end to end against a live
//! `RemoteBackend`: remote listing, file-list ingest, index ingest, the
//! three-pass block-volume recovery loop, and final cleanup/verification.
//!
//! Decoding a downloaded volume's bytes into the typed reader traits is a
//! codec concern external to this core (spec §1), so callers supply three
//! decoder closures; the in-memory test backend's readers are constructed
//! directly without going through bytes at all.

use std::collections::HashSet;

use bvault_backend::{BlockVolumeReader, FileListVolumeReader, IndexVolumeReader, RemoteBackend};
use bvault_common::filename::VolumeKind;
use bvault_common::types::VolumeState;
use bvault_common::Options;
use bvault_db::models::RemoteVolume;
use bvault_db::Database;
use bvault_recreate::{
    add_block_and_blockset_entry_from_temp, cleanup_deleted_blocks, cleanup_missing_volumes,
    find_missing_blocklist_hashes, ingest_block_volume, ingest_file_list, ingest_index_volume,
    list_remote, missing_blockset_ids, missing_blocklist_volumes, outstanding_blocklist_hashes,
    require_passphrase_if_encrypted, verify_consistency_or_fail, TempBlockListHash,
};

use crate::error::Result;

/// Decoders a caller must supply to turn downloaded bytes into the typed
/// volume reader traits (spec §6); the wire format itself is out of scope.
pub struct RecreateDecoders<'a> {
    pub file_list: &'a dyn Fn(bytes::Bytes) -> Box<dyn FileListVolumeReader>,
    pub index: &'a dyn Fn(bytes::Bytes) -> Box<dyn IndexVolumeReader>,
    pub block: &'a dyn Fn(bytes::Bytes) -> Box<dyn BlockVolumeReader>,
}

#[derive(Debug, Default)]
pub struct RecreateSummary {
    pub filesets_ingested: usize,
    pub index_volumes_ingested: usize,
    pub block_volumes_ingested: usize,
    pub blocks_new: usize,
    pub malformed_blocklists: usize,
}

fn reconcile(
    conn: &mut diesel::sqlite::SqliteConnection,
    options: &Options,
    temp: &TempBlockListHash,
) -> bvault_recreate::Result<()> {
    if options.experimental_recreate_path {
        add_block_and_blockset_entry_from_temp(conn, temp, options.hashes_per_block as i64)?;
    } else {
        find_missing_blocklist_hashes(conn, temp, options.hashes_per_block as i64)?;
    }
    Ok(())
}

/// Runs the full recreate pipeline against `backend` into a freshly opened
/// (empty) `db`, using `prefix` to select this installation's volumes among
/// whatever else shares the remote location.
pub async fn run_recreate(
    db: &Database,
    backend: &dyn RemoteBackend,
    options: &Options,
    prefix: &str,
    decoders: &RecreateDecoders<'_>,
) -> Result<RecreateSummary> {
    let mut summary = RecreateSummary::default();

    // P1: remote listing.
    let names = backend.list().await?;
    let entries = list_remote(&names, prefix)?;
    require_passphrase_if_encrypted(&entries, options)?;

    // P2: file-list ingest, newest first.
    let mut file_entries: Vec<_> = entries
        .iter()
        .filter(|e| e.parsed.kind == VolumeKind::Files)
        .collect();
    file_entries.sort_by(|a, b| b.parsed.time.cmp(&a.parsed.time));

    for entry in file_entries {
        let timestamp = entry.parsed.time.timestamp();
        let bytes = backend.get(&entry.name, "", 0).await?;
        let reader = (decoders.file_list)(bytes);

        db.transaction("recreate-file-list", |conn| {
            let volume_id = RemoteVolume::create(
                conn,
                &entry.name,
                VolumeKind::Files,
                VolumeState::Uploaded,
                0,
                timestamp,
            )
            .map_err(|e| bvault_db::DbError::Inconsistent(e.to_string()))?;
            ingest_file_list(conn, volume_id, timestamp, reader.as_ref())
                .map_err(|e| bvault_db::DbError::Inconsistent(e.to_string()))?;
            Ok(())
        })?;
        summary.filesets_ingested += 1;
    }

    // P3: index volume ingest.
    let compressors = bvault_backend::default_compressors();
    let encryptors = bvault_backend::default_encryptors();
    let mut temp = TempBlockListHash::new();

    let index_entries: Vec<_> = entries
        .iter()
        .filter(|e| e.parsed.kind == VolumeKind::Index)
        .collect();
    for entry in index_entries {
        let bytes = backend.get(&entry.name, "", 0).await?;
        let reader = (decoders.index)(bytes);

        let report = db.transaction("recreate-index-volume", |conn| {
            let index_volume_id = RemoteVolume::create(
                conn,
                &entry.name,
                VolumeKind::Index,
                VolumeState::Uploaded,
                0,
                entry.parsed.time.timestamp(),
            )
            .map_err(|e| bvault_db::DbError::Inconsistent(e.to_string()))?;
            let report = ingest_index_volume(
                conn,
                index_volume_id,
                reader.as_ref(),
                &compressors,
                &encryptors,
                &mut temp,
                |_hash, _blocklist| true,
            )
            .map_err(|e| bvault_db::DbError::Inconsistent(e.to_string()))?;
            reconcile(conn, options, &temp).map_err(|e| bvault_db::DbError::Inconsistent(e.to_string()))?;
            Ok(report)
        })?;
        summary.index_volumes_ingested += 1;
        summary.blocks_new += report.blocks_new;
        summary.malformed_blocklists += report.malformed_blocklists;
    }

    // P4: three-pass block-volume recovery.
    let mut visited: HashSet<i64> = HashSet::new();
    for pass in 0u8..=2 {
        let ingested_before_pass = summary.block_volumes_ingested;
        loop {
            let candidates = db.with_connection(|conn| {
                missing_blocklist_volumes(conn, pass, &visited, options.blocksize)
                    .map_err(|e| bvault_db::DbError::Inconsistent(e.to_string()))
            })?;
            let Some(&volume_id) = candidates.first() else { break };
            visited.insert(volume_id);

            let name = db.with_connection(|conn| RemoteVolume::get(conn, volume_id).map(|r| r.name))?;
            let bytes = backend.get(&name, "", 0).await?;
            let reader = (decoders.block)(bytes);

            db.transaction("recreate-block-volume", |conn| {
                let missing_hashes = outstanding_blocklist_hashes(conn, &temp, options.blocksize)
                    .map_err(|e| bvault_db::DbError::Inconsistent(e.to_string()))?;
                ingest_block_volume(
                    conn,
                    volume_id,
                    reader.as_ref(),
                    &missing_hashes,
                    options.blockhash_size as usize,
                    &mut temp,
                )
                .map_err(|e| bvault_db::DbError::Inconsistent(e.to_string()))?;
                reconcile(conn, options, &temp).map_err(|e| bvault_db::DbError::Inconsistent(e.to_string()))?;
                Ok(())
            })?;
            summary.block_volumes_ingested += 1;

            if db.with_connection(|conn| {
                Ok::<_, bvault_db::DbError>(
                    missing_blockset_ids(conn, options.blocksize)
                        .map_err(|e| bvault_db::DbError::Inconsistent(e.to_string()))?
                        .is_empty(),
                )
            })? {
                break;
            }
        }
        if pass == 2 && summary.block_volumes_ingested > ingested_before_pass {
            log::warn!(
                "recreate: pass 2 ingested {} more block volume(s); indexes may be corrupted or inconsistent",
                summary.block_volumes_ingested - ingested_before_pass
            );
        }
    }

    // P5: cleanup and final consistency check.
    db.transaction("recreate-cleanup", |conn| {
        cleanup_deleted_blocks(conn).map_err(|e| bvault_db::DbError::Inconsistent(e.to_string()))?;
        cleanup_missing_volumes(conn).map_err(|e| bvault_db::DbError::Inconsistent(e.to_string()))?;
        verify_consistency_or_fail(conn, options.blocksize)
            .map_err(|e| bvault_db::DbError::Inconsistent(e.to_string()))?;
        Ok(())
    })?;

    Ok(summary)
}
