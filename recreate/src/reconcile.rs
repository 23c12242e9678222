//! Reconciliation of buffered blocklists against known blocksets (spec
//! §4.9, after P3): either `find_missing_blocklist_hashes` (default) or
//! `add_block_and_blockset_entry_from_temp` (experimental, behind
//! `Options.experimental_recreate_path` -- spec §9 Open Question).
//!
//! Both walk every `BlocklistHash` row whose hash is present in the
//! buffer and try to materialise the `BlocksetEntry` rows it describes.
//! They differ in commit granularity: the default path only writes entries
//! for a blocklist chunk once every block hash in it resolves, so a
//! blockset is never left half-populated; the experimental path writes
//! whatever resolves immediately and leaves the rest for a later pass,
//! trading that guarantee for earlier partial progress.

use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;

use bvault_db::models::{Blockset, BlocksetEntry};
use bvault_db::schema::block;

use crate::error::Result;
use crate::temp_blocklist::TempBlockListHash;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub entries_created: usize,
    pub blocklists_resolved: usize,
}

fn block_id_by_hash(conn: &mut SqliteConnection, hash: &str) -> Result<Option<i64>> {
    Ok(block::table
        .filter(block::hash.eq(hash))
        .select(block::id)
        .first(conn)
        .optional()?)
}

/// Existing `BlocksetEntry` indexes for `blockset_id`, to avoid re-inserting
/// (and violating the primary key) on a repeat pass.
fn existing_indexes(conn: &mut SqliteConnection, blockset_id: i64) -> Result<std::collections::HashSet<i64>> {
    Ok(BlocksetEntry::ordered_for_blockset(conn, blockset_id)?
        .into_iter()
        .map(|e| e.index)
        .collect())
}

/// Default reconciliation path. Requires every block hash in a buffered
/// blocklist to already have a resolved `Block` row before writing any
/// `BlocksetEntry` for that chunk.
pub fn find_missing_blocklist_hashes(
    conn: &mut SqliteConnection,
    temp: &TempBlockListHash,
    hashes_per_block: i64,
) -> Result<ReconcileReport> {
    let mut report = ReconcileReport::default();

    for hash in temp.hashes().map(str::to_string).collect::<Vec<_>>() {
        let Some(block_hashes) = temp.get(&hash) else { continue };
        let owners = blocklist_hash_owners(conn, &hash)?;
        for (blockset_id, bl_index) in owners {
            let already = existing_indexes(conn, blockset_id)?;
            let base = bl_index * hashes_per_block;
            let mut resolved: Vec<(i64, i64)> = Vec::with_capacity(block_hashes.len());
            let mut all_resolved = true;
            for (j, bh) in block_hashes.iter().enumerate() {
                let idx = base + j as i64;
                if already.contains(&idx) {
                    continue;
                }
                match block_id_by_hash(conn, bh)? {
                    Some(id) => resolved.push((idx, id)),
                    None => {
                        all_resolved = false;
                        break;
                    }
                }
            }
            if all_resolved && !resolved.is_empty() {
                for (idx, block_id) in &resolved {
                    BlocksetEntry::insert(conn, blockset_id, *idx, *block_id)?;
                }
                report.entries_created += resolved.len();
                report.blocklists_resolved += 1;
            }
        }
    }

    Ok(report)
}

/// Experimental reconciliation path (`EXPERIMENTAL_RECREATEDB_DUPLICATI`).
/// Writes whichever block hashes in a buffered blocklist already resolve,
/// leaving the rest for a subsequent pass instead of requiring the whole
/// chunk to resolve at once.
pub fn add_block_and_blockset_entry_from_temp(
    conn: &mut SqliteConnection,
    temp: &TempBlockListHash,
    hashes_per_block: i64,
) -> Result<ReconcileReport> {
    let mut report = ReconcileReport::default();

    for hash in temp.hashes().map(str::to_string).collect::<Vec<_>>() {
        let Some(block_hashes) = temp.get(&hash) else { continue };
        let owners = blocklist_hash_owners(conn, &hash)?;
        for (blockset_id, bl_index) in owners {
            let already = existing_indexes(conn, blockset_id)?;
            let base = bl_index * hashes_per_block;
            let mut any_written = false;
            for (j, bh) in block_hashes.iter().enumerate() {
                let idx = base + j as i64;
                if already.contains(&idx) {
                    continue;
                }
                if let Some(block_id) = block_id_by_hash(conn, bh)? {
                    BlocksetEntry::insert(conn, blockset_id, idx, block_id)?;
                    report.entries_created += 1;
                    any_written = true;
                }
            }
            if any_written {
                report.blocklists_resolved += 1;
            }
        }
    }

    Ok(report)
}

fn blocklist_hash_owners(conn: &mut SqliteConnection, hash: &str) -> Result<Vec<(i64, i64)>> {
    use bvault_db::schema::blocklist_hash;
    Ok(blocklist_hash::table
        .filter(blocklist_hash::hash.eq(hash))
        .select((blocklist_hash::blockset_id, blocklist_hash::index))
        .load(conn)?)
}

/// Whether every `BlocksetEntry` position `0..block_count` is populated,
/// i.e. the blockset is fully recovered (spec §4.9 P5 `VerifyConsistency`
/// precursor).
pub fn blockset_is_complete(conn: &mut SqliteConnection, blockset_id: i64, blocksize: u64) -> Result<bool> {
    let bs = Blockset::get(conn, blockset_id)?;
    let expected = bvault_common::chunking::block_count_for_length(bs.length as u64, blocksize);
    let have = BlocksetEntry::ordered_for_blockset(conn, blockset_id)?.len() as u64;
    Ok(have == expected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bvault_common::filename::VolumeKind;
    use bvault_common::types::VolumeState;
    use bvault_db::models::{Block, BlocklistHash, RemoteVolume};
    use bvault_db::Database;

    fn setup_blockset_with_one_blocklist(conn: &mut SqliteConnection) -> (i64, i64) {
        let vol = RemoteVolume::create(
            conn,
            "p-b0123456789abcdef0123456789abcde1-20260101T000000Z.zip",
            VolumeKind::Blocks,
            VolumeState::Uploaded,
            0,
            0,
        )
        .unwrap();
        let bs = Blockset::find_or_create(conn, "fullhash", 2000).unwrap();
        BlocklistHash::insert(conn, bs, 0, "bl0").unwrap();
        (bs, vol)
    }

    #[test]
    fn default_path_requires_whole_chunk_to_resolve() {
        let db = Database::open_in_memory().unwrap();
        db.transaction("t", |conn| {
            let (bs, vol) = setup_blockset_with_one_blocklist(conn);
            Block::insert(conn, "b0", 100, vol)?;
            // "b1" intentionally missing.

            let mut temp = TempBlockListHash::new();
            temp.insert("bl0", vec!["b0".to_string(), "b1".to_string()]);

            let report = find_missing_blocklist_hashes(conn, &temp, 1024)?;
            assert_eq!(report.entries_created, 0);
            assert!(BlocksetEntry::ordered_for_blockset(conn, bs)?.is_empty());
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn default_path_commits_once_every_hash_resolves() {
        let db = Database::open_in_memory().unwrap();
        db.transaction("t", |conn| {
            let (bs, vol) = setup_blockset_with_one_blocklist(conn);
            Block::insert(conn, "b0", 100, vol)?;
            Block::insert(conn, "b1", 100, vol)?;

            let mut temp = TempBlockListHash::new();
            temp.insert("bl0", vec!["b0".to_string(), "b1".to_string()]);

            let report = find_missing_blocklist_hashes(conn, &temp, 1024)?;
            assert_eq!(report.entries_created, 2);
            assert_eq!(BlocksetEntry::ordered_for_blockset(conn, bs)?.len(), 2);
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn experimental_path_writes_partial_progress() {
        let db = Database::open_in_memory().unwrap();
        db.transaction("t", |conn| {
            let (bs, vol) = setup_blockset_with_one_blocklist(conn);
            Block::insert(conn, "b0", 100, vol)?;

            let mut temp = TempBlockListHash::new();
            temp.insert("bl0", vec!["b0".to_string(), "b1".to_string()]);

            let report = add_block_and_blockset_entry_from_temp(conn, &temp, 1024)?;
            assert_eq!(report.entries_created, 1);
            assert_eq!(BlocksetEntry::ordered_for_blockset(conn, bs)?.len(), 1);
            Ok(())
        })
        .unwrap();
    }
}
