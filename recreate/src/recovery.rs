//! (P4) Three-pass block-volume recovery (spec §4.9). `missing_blocklist_volumes`
//! is `GetMissingBlockListVolumes(pass, …)`: pass 0 returns volumes already
//! known (via `IndexBlockLink`) to carry required, still-missing blocklists;
//! pass 1 returns every other `Blocks` volume as a candidate; pass 2 is
//! identical to pass 1 but run only once pass 0/1 have been exhausted, so
//! any volume still un-downloaded gets one last try. All three short-circuit
//! to empty once no blockset is actually incomplete.

use std::collections::HashSet;

use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;

use bvault_backend::BlockVolumeReader;
use bvault_common::filename::VolumeKind;
use bvault_db::models::{Block, BlocklistHash, RemoteVolume};
use bvault_db::schema::{blockset, index_block_link};

use crate::error::Result;
use crate::reconcile::blockset_is_complete;
use crate::temp_blocklist::TempBlockListHash;

pub fn missing_blockset_ids(conn: &mut SqliteConnection, blocksize: u64) -> Result<Vec<i64>> {
    let ids: Vec<i64> = blockset::table.select(blockset::id).load(conn)?;
    let mut missing = Vec::new();
    for id in ids {
        if !blockset_is_complete(conn, id, blocksize)? {
            missing.push(id);
        }
    }
    Ok(missing)
}

/// `GetMissingBlockListVolumes(pass, …)` (spec §4.9 P4).
pub fn missing_blocklist_volumes(
    conn: &mut SqliteConnection,
    pass: u8,
    visited: &HashSet<i64>,
    blocksize: u64,
) -> Result<Vec<i64>> {
    if missing_blockset_ids(conn, blocksize)?.is_empty() {
        return Ok(Vec::new());
    }

    match pass {
        0 => {
            let linked: Vec<i64> = index_block_link::table
                .select(index_block_link::block_volume_id)
                .distinct()
                .load(conn)?;
            Ok(linked.into_iter().filter(|id| !visited.contains(id)).collect())
        }
        1 | 2 => {
            let all = RemoteVolume::list_all_of_kind(conn, VolumeKind::Blocks)?;
            Ok(all
                .into_iter()
                .map(|row| row.id)
                .filter(|id| !visited.contains(id))
                .collect())
        }
        _ => Ok(Vec::new()),
    }
}

/// Every blocklist hash still needed by an incomplete blockset and not
/// already buffered, in no particular order. Feeds `ReadBlocklist` calls
/// against a just-downloaded block volume.
pub fn outstanding_blocklist_hashes(
    conn: &mut SqliteConnection,
    temp: &TempBlockListHash,
    blocksize: u64,
) -> Result<Vec<String>> {
    let mut hashes: Vec<String> = Vec::new();
    for blockset_id in missing_blockset_ids(conn, blocksize)? {
        for row in BlocklistHash::ordered_for_blockset(conn, blockset_id)? {
            if !temp.contains(&row.hash) {
                hashes.push(row.hash);
            }
        }
    }
    hashes.sort();
    hashes.dedup();
    Ok(hashes)
}

/// Ingests one downloaded `Blocks` volume during P4: upserts every block it
/// declares, and reads+buffers the blocklist for each hash in
/// `missing_blocklist_hashes` that this volume happens to carry.
pub fn ingest_block_volume(
    conn: &mut SqliteConnection,
    volume_id: i64,
    reader: &dyn BlockVolumeReader,
    missing_blocklist_hashes: &[String],
    hashsize: usize,
    temp: &mut TempBlockListHash,
) -> Result<usize> {
    for (hash, size) in reader.blocks() {
        Block::upsert(conn, &hash, size as i64, volume_id)?;
    }

    let mut recovered = 0;
    for hash in missing_blocklist_hashes {
        if temp.contains(hash) {
            continue;
        }
        if let Ok(list) = reader.read_blocklist(hash, hashsize) {
            temp.insert(hash.clone(), list);
            recovered += 1;
        }
    }
    Ok(recovered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bvault_common::types::VolumeState;
    use bvault_db::models::Blockset;
    use bvault_db::Database;

    #[test]
    fn passes_are_empty_once_every_blockset_is_complete() {
        let db = Database::open_in_memory().unwrap();
        db.transaction("t", |conn| {
            let vol = RemoteVolume::create(
                conn,
                "p-b0123456789abcdef0123456789abcde1-20260101T000000Z.zip",
                VolumeKind::Blocks,
                VolumeState::Uploaded,
                0,
                0,
            )?;
            let bs = Blockset::find_or_create(conn, "h", 100)?;
            let block_id = Block::insert(conn, "b0", 100, vol)?;
            bvault_db::models::BlocksetEntry::insert(conn, bs, 0, block_id)?;

            let visited = HashSet::new();
            assert!(missing_blocklist_volumes(conn, 0, &visited, 100)?.is_empty());
            assert!(missing_blocklist_volumes(conn, 1, &visited, 100)?.is_empty());
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn pass_zero_prefers_volumes_linked_through_the_index() {
        let db = Database::open_in_memory().unwrap();
        db.transaction("t", |conn| {
            Blockset::find_or_create(conn, "incomplete", 500)?;

            let linked_vol = RemoteVolume::create(
                conn,
                "p-b0123456789abcdef0123456789abcde2-20260101T000000Z.zip",
                VolumeKind::Blocks,
                VolumeState::Uploaded,
                0,
                0,
            )?;
            let index_vol = RemoteVolume::create(
                conn,
                "p-i0123456789abcdef0123456789abcde3-20260101T000000Z.zip",
                VolumeKind::Index,
                VolumeState::Uploaded,
                0,
                0,
            )?;
            diesel::insert_into(index_block_link::table)
                .values((
                    index_block_link::index_volume_id.eq(index_vol),
                    index_block_link::block_volume_id.eq(linked_vol),
                ))
                .execute(conn)?;

            let unlinked_vol = RemoteVolume::create(
                conn,
                "p-b0123456789abcdef0123456789abcde4-20260101T000000Z.zip",
                VolumeKind::Blocks,
                VolumeState::Uploaded,
                0,
                0,
            )?;

            let visited = HashSet::new();
            let pass0 = missing_blocklist_volumes(conn, 0, &visited, 100)?;
            assert_eq!(pass0, vec![linked_vol]);

            let pass1 = missing_blocklist_volumes(conn, 1, &visited, 100)?;
            assert!(pass1.contains(&linked_vol));
            assert!(pass1.contains(&unlinked_vol));
            Ok(())
        })
        .unwrap();
    }
}
