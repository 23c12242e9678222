//! Block reassignment (spec §4.6): `prepare_for_delete(victim, other_victims)`.

use std::collections::HashMap;

use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;

use bvault_db::schema::{block, duplicate_block, remote_volume};

use crate::error::{CompactError, Result};

/// Reassigns every block currently primary-homed in `victim` to a
/// surviving `DuplicateBlock` copy, then drops the bookkeeping rows for
/// `victim`. Must run inside one transaction; only meaningful for `Blocks`
/// volumes.
pub fn prepare_for_delete(
    conn: &mut SqliteConnection,
    victim: i64,
    other_victims: &[i64],
) -> Result<()> {
    let kind: String = remote_volume::table
        .filter(remote_volume::id.eq(victim))
        .select(remote_volume::kind)
        .first(conn)?;
    if kind != "Blocks" {
        return Ok(());
    }

    // U: blocks currently homed in the victim volume.
    let u: Vec<i64> = block::table
        .filter(block::volume_id.eq(victim))
        .select(block::id)
        .load(conn)?;
    if u.is_empty() {
        return Ok(());
    }

    // R: for each block in U, the highest-numbered surviving duplicate
    // volume not itself slated for deletion.
    let candidates: Vec<(i64, i64)> = duplicate_block::table
        .filter(duplicate_block::block_id.eq_any(&u))
        .filter(duplicate_block::volume_id.ne_all(other_victims.to_vec()))
        .select((duplicate_block::block_id, duplicate_block::volume_id))
        .load(conn)?;

    let mut replacement: HashMap<i64, i64> = HashMap::new();
    for (block_id, volume_id) in candidates {
        replacement
            .entry(block_id)
            .and_modify(|v| *v = (*v).max(volume_id))
            .or_insert(volume_id);
    }

    let mut update_count = 0usize;
    let mut delete_count = 0usize;
    for (&block_id, &replacement_volume) in &replacement {
        let updated = diesel::update(
            block::table
                .filter(block::id.eq(block_id))
                .filter(block::volume_id.eq(victim)),
        )
        .set(block::volume_id.eq(replacement_volume))
        .execute(conn)?;
        update_count += updated;

        let deleted = diesel::delete(
            duplicate_block::table
                .filter(duplicate_block::block_id.eq(block_id))
                .filter(duplicate_block::volume_id.eq(replacement_volume)),
        )
        .execute(conn)?;
        delete_count += deleted;
    }

    if u.len() != update_count || replacement.len() != delete_count || update_count != delete_count {
        return Err(CompactError::inconsistent(format!(
            "block reassignment mismatch: |U|={}, updates={update_count}, deletes={delete_count}",
            u.len()
        )));
    }

    // Step 7: any remaining duplicates recorded against the victim itself
    // (e.g. excluded from serving as a replacement by `other_victims`) are
    // dropped without a transfer -- see the open question in the design
    // notes about this behaviour.
    diesel::delete(duplicate_block::table.filter(duplicate_block::volume_id.eq(victim)))
        .execute(conn)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bvault_common::filename::VolumeKind;
    use bvault_common::types::VolumeState;
    use bvault_db::models::{Block, DuplicateBlock, RemoteVolume};
    use bvault_db::Database;

    fn make_blocks_volume(conn: &mut SqliteConnection, suffix: &str) -> i64 {
        RemoteVolume::create(
            conn,
            &format!("p-b0123456789abcdef0123456789{suffix}-20260101T000000Z.zip"),
            VolumeKind::Blocks,
            VolumeState::Uploaded,
            0,
            0,
        )
        .unwrap()
    }

    #[test]
    fn s4_reassignment_picks_highest_surviving_duplicate() {
        let db = Database::open_in_memory().unwrap();
        let (v, v2, v3, b1, b2) = db
            .transaction("setup", |conn| {
                let v = make_blocks_volume(conn, "victim1");
                let v2 = make_blocks_volume(conn, "victim2");
                let v3 = make_blocks_volume(conn, "victim3");
                let b1 = Block::insert(conn, "b1", 10, v)?;
                let b2 = Block::insert(conn, "b2", 10, v)?;
                DuplicateBlock::insert(conn, b1, v2)?;
                DuplicateBlock::insert(conn, b1, v3)?;
                DuplicateBlock::insert(conn, b2, v2)?;
                Ok((v, v2, v3, b1, b2))
            })
            .unwrap();

        db.transaction("reassign", |conn| prepare_for_delete(conn, v, &[]))
            .unwrap();

        db.with_connection(|conn| {
            assert_eq!(Block::by_id(conn, b1)?.volume_id, v3);
            assert_eq!(Block::by_id(conn, b2)?.volume_id, v2);
            let remaining = DuplicateBlock::for_block(conn, b1)?;
            assert!(remaining.iter().all(|d| d.volume_id != v));
            Ok(())
        })
        .unwrap();
    }
}
