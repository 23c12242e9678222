//! (P5) Cleanup and final consistency check (spec §4.9).

use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;

use bvault_common::filename::VolumeKind;
use bvault_common::types::VolumeState;
use bvault_db::models::{Blockset, DeletedBlock, RemoteVolume};
use bvault_db::schema::{block, blockset, blockset_entry};

use crate::error::{RecreateError, Result};

/// `CleanupDeletedBlocks`: moves blocks no longer referenced by any
/// `BlocksetEntry` into `DeletedBlock`, then removes them from `Block`.
/// Returns how many were moved.
pub fn cleanup_deleted_blocks(conn: &mut SqliteConnection) -> Result<usize> {
    let orphans: Vec<(i64, String, i64, i64)> = block::table
        .filter(block::id.ne_all(blockset_entry::table.select(blockset_entry::block_id)))
        .select((block::id, block::hash, block::size, block::volume_id))
        .load(conn)?;

    for (id, hash, size, volume_id) in &orphans {
        DeletedBlock::insert(conn, hash, *size, *volume_id)?;
        diesel::delete(block::table.filter(block::id.eq(id))).execute(conn)?;
    }
    Ok(orphans.len())
}

/// `CleanupMissingVolumes`: transitions every `Blocks` volume with no
/// remaining `Block` rows pointing at it to `Deleting`. Returns how many
/// were transitioned.
pub fn cleanup_missing_volumes(conn: &mut SqliteConnection) -> Result<usize> {
    let candidates: Vec<i64> = bvault_db::schema::remote_volume::table
        .filter(bvault_db::schema::remote_volume::kind.eq("Blocks"))
        .filter(
            bvault_db::schema::remote_volume::id
                .ne_all(block::table.select(block::volume_id)),
        )
        .select(bvault_db::schema::remote_volume::id)
        .load(conn)?;
    RemoteVolume::transition_to_deleting(conn, &candidates)
}

/// One `VerifyConsistency` violation (spec §4.9 P5): a blockset whose
/// declared `length` disagrees with its recovered block content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsistencyViolation {
    pub blockset_id: i64,
    pub reason: String,
}

/// `VerifyConsistency(blocksize, blockhash_size, verify_filelists=true)`:
/// every blockset's `length` must equal the sum of its block sizes, and its
/// block count must match `ceil(length / blocksize)`. Returns every
/// violation found rather than stopping at the first one, so a caller can
/// report them all before deciding whether to treat the database as
/// usable.
pub fn verify_consistency(conn: &mut SqliteConnection, blocksize: u64) -> Result<Vec<ConsistencyViolation>> {
    let ids: Vec<i64> = blockset::table.select(blockset::id).load(conn)?;
    let mut violations = Vec::new();

    for id in ids {
        let bs = Blockset::get(conn, id)?;
        let entries = bvault_db::models::BlocksetEntry::ordered_for_blockset(conn, id)?;

        let expected_count = bvault_common::chunking::block_count_for_length(bs.length as u64, blocksize);
        if entries.len() as u64 != expected_count {
            violations.push(ConsistencyViolation {
                blockset_id: id,
                reason: format!(
                    "expected {expected_count} blocks for length {}, found {}",
                    bs.length,
                    entries.len()
                ),
            });
            continue;
        }

        let mut total_size: i64 = 0;
        for entry in &entries {
            let row = bvault_db::models::Block::by_id(conn, entry.block_id)?;
            total_size += row.size;
        }
        if total_size != bs.length {
            violations.push(ConsistencyViolation {
                blockset_id: id,
                reason: format!("block sizes sum to {total_size}, expected length {}", bs.length),
            });
        }
    }

    Ok(violations)
}

/// Fails `InconsistentDatabase` if [`verify_consistency`] found anything.
/// Most callers (the recreate driver) want this fatal form; tests that
/// assert on individual violations use [`verify_consistency`] directly.
pub fn verify_consistency_or_fail(conn: &mut SqliteConnection, blocksize: u64) -> Result<()> {
    let violations = verify_consistency(conn, blocksize)?;
    if violations.is_empty() {
        Ok(())
    } else {
        Err(RecreateError::inconsistent(format!(
            "{} blockset(s) failed VerifyConsistency: {:?}",
            violations.len(),
            violations
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bvault_db::models::{Block, BlocksetEntry};
    use bvault_db::Database;

    fn volume(conn: &mut SqliteConnection, suffix: &str) -> i64 {
        RemoteVolume::create(
            conn,
            &format!("p-b0123456789abcdef0123456789abcd{suffix}-20260101T000000Z.zip"),
            VolumeKind::Blocks,
            VolumeState::Uploaded,
            0,
            0,
        )
        .unwrap()
    }

    #[test]
    fn s5_consistent_database_has_no_violations() {
        let db = Database::open_in_memory().unwrap();
        db.transaction("t", |conn| {
            let vol = volume(conn, "1");
            let bs = Blockset::find_or_create(conn, "h", 150)?;
            let b0 = Block::insert(conn, "b0", 100, vol)?;
            let b1 = Block::insert(conn, "b1", 50, vol)?;
            BlocksetEntry::insert(conn, bs, 0, b0)?;
            BlocksetEntry::insert(conn, bs, 1, b1)?;

            let violations = verify_consistency(conn, 100)?;
            assert!(violations.is_empty());
            verify_consistency_or_fail(conn, 100)?;
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn detects_a_short_blockset() {
        let db = Database::open_in_memory().unwrap();
        db.transaction("t", |conn| {
            let vol = volume(conn, "2");
            let bs = Blockset::find_or_create(conn, "h", 150)?;
            let b0 = Block::insert(conn, "b0", 100, vol)?;
            BlocksetEntry::insert(conn, bs, 0, b0)?;

            let violations = verify_consistency(conn, 100)?;
            assert_eq!(violations.len(), 1);
            assert_eq!(violations[0].blockset_id, bs);
            assert!(verify_consistency_or_fail(conn, 100).is_err());
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn cleanup_deleted_blocks_moves_orphans() {
        let db = Database::open_in_memory().unwrap();
        db.transaction("t", |conn| {
            let vol = volume(conn, "3");
            Block::insert(conn, "orphan", 10, vol)?;
            let bs = Blockset::find_or_create(conn, "h", 10)?;
            let kept = Block::insert(conn, "kept", 10, vol)?;
            BlocksetEntry::insert(conn, bs, 0, kept)?;

            let moved = cleanup_deleted_blocks(conn)?;
            assert_eq!(moved, 1);
            assert!(Block::by_hash_size(conn, "orphan", 10)?.is_none());
            assert!(Block::by_hash_size(conn, "kept", 10)?.is_some());
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn cleanup_missing_volumes_transitions_blockless_volumes() {
        let db = Database::open_in_memory().unwrap();
        db.transaction("t", |conn| {
            let empty_vol = volume(conn, "4");
            let used_vol = volume(conn, "5");
            Block::insert(conn, "b", 10, used_vol)?;

            let transitioned = cleanup_missing_volumes(conn)?;
            assert_eq!(transitioned, 1);
            assert_eq!(RemoteVolume::get(conn, empty_vol)?.state(), VolumeState::Deleting);
            assert_eq!(RemoteVolume::get(conn, used_vol)?.state(), VolumeState::Uploaded);
            Ok(())
        })
        .unwrap();
    }
}
