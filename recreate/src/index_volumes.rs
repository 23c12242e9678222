//! (P3) Index volume ingest (spec §4.9): resolve each declared block
//! volume (probing for renames when the name has drifted), upsert `Block`
//! rows, record `IndexBlockLink`, and buffer redundant blocklists for
//! reconciliation.

use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;

use bvault_backend::{Compressor, Encryptor, IndexBlockListEntry, IndexVolumeReader, Registry};
use bvault_common::filename::{parse_filename, probe, VolumeKind};
use bvault_common::types::VolumeState;
use bvault_db::models::{Block, RemoteVolume};
use bvault_db::schema::index_block_link;

use crate::error::Result;
use crate::temp_blocklist::TempBlockListHash;

/// Tallies produced by ingesting one `Index` volume's declared contents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndexIngestReport {
    pub blocks_new: usize,
    pub blocks_existing: usize,
    pub malformed_blocklists: usize,
}

/// Resolves `filename` to a `RemoteVolume` id: exact match first, then a
/// probe across every `(compression, encryption)` combination (spec §4.10),
/// and failing that registers a `Temporary` placeholder row so the block
/// table still has somewhere to point (spec §4.9 P3: "Still unresolved ->
/// register a Temporary placeholder").
pub fn resolve_block_volume(
    conn: &mut SqliteConnection,
    filename: &str,
    compressors: &Registry<Box<dyn Compressor>>,
    encryptors: &Registry<Box<dyn Encryptor>>,
) -> Result<i64> {
    if let Some(row) = RemoteVolume::get_by_name(conn, filename)? {
        return Ok(row.id);
    }

    if let Some(parsed) = parse_filename(filename) {
        let candidates = bvault_backend::probe_candidates(compressors, encryptors);
        let probed = probe(&parsed, candidates, |candidate| {
            matches!(RemoteVolume::get_by_name(conn, candidate), Ok(Some(_)))
        });
        if let Some(name) = probed {
            if let Some(row) = RemoteVolume::get_by_name(conn, &name)? {
                return Ok(row.id);
            }
        }
    }

    Ok(RemoteVolume::create(
        conn,
        filename,
        VolumeKind::Blocks,
        VolumeState::Temporary,
        0,
        0,
    )?)
}

fn link_index_to_block(conn: &mut SqliteConnection, index_volume_id: i64, block_volume_id: i64) -> Result<()> {
    diesel::insert_into(index_block_link::table)
        .values((
            index_block_link::index_volume_id.eq(index_volume_id),
            index_block_link::block_volume_id.eq(block_volume_id),
        ))
        .on_conflict_do_nothing()
        .execute(conn)?;
    Ok(())
}

/// Ingests one `Index` volume: resolves and links every declared block
/// volume, upserts its blocks, and buffers its redundant blocklists.
/// `verify_hash` stands in for the external hasher (spec §1): it should
/// return whether `blocklist` actually hashes to `hash`; malformed entries
/// are counted and skipped rather than aborting the phase (spec §7
/// Corrupted volume).
pub fn ingest_index_volume(
    conn: &mut SqliteConnection,
    index_volume_id: i64,
    reader: &dyn IndexVolumeReader,
    compressors: &Registry<Box<dyn Compressor>>,
    encryptors: &Registry<Box<dyn Encryptor>>,
    temp: &mut TempBlockListHash,
    verify_hash: impl Fn(&str, &[String]) -> bool,
) -> Result<IndexIngestReport> {
    let mut report = IndexIngestReport::default();

    for entry in reader.volumes() {
        let block_volume_id = resolve_block_volume(conn, &entry.filename, compressors, encryptors)?;
        link_index_to_block(conn, index_volume_id, block_volume_id)?;

        for (hash, size) in entry.blocks {
            let (_, is_new) = Block::upsert(conn, &hash, size as i64, block_volume_id)?;
            if is_new {
                report.blocks_new += 1;
            } else {
                report.blocks_existing += 1;
            }
        }
    }

    for IndexBlockListEntry { hash, blocklist } in reader.block_lists() {
        if verify_hash(&hash, &blocklist) {
            temp.insert(hash, blocklist);
        } else {
            report.malformed_blocklists += 1;
            log::warn!("malformed blocklist {hash} skipped during index ingest");
        }
    }

    Ok(report)
}
