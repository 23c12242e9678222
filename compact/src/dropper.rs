//! Fileset dropper (spec §4.3): `drop_filesets(timestamps) -> iter<(volume_name, size)>`.

use bvault_common::types::VolumeState;
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;

use bvault_db::schema::{
    block, blocklist_hash, blockset, blockset_entry, change_journal_data, deleted_block,
    file_lookup, fileset, fileset_entry, metadataset, remote_volume,
};
use bvault_db::{in_subquery, with_temp_value_table};

use crate::error::{CompactError, Result};

/// A deletable `Files` volume yielded once its fileset is fully cascaded away.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DroppedVolume {
    pub name: String,
    pub size: i64,
}

/// Deletes every `Fileset` whose `timestamp` is in `timestamps`, cascades
/// orphan removal across the six dependent tables in the mandated order, and
/// returns the now-`Deleting` `Files` volumes. Must run inside one
/// transaction (spec §5 Ordering guarantees).
pub fn drop_filesets(conn: &mut SqliteConnection, timestamps: &[i64]) -> Result<Vec<DroppedVolume>> {
    if timestamps.is_empty() {
        return Ok(Vec::new());
    }

    // The caller-supplied timestamp list expands an `IN (@list)` filter
    // (spec §4.1), so it goes through the scratch temp-table helper rather
    // than a bound `eq_any` list, matching large-list queries elsewhere.
    let deleted = with_temp_value_table(conn, "drop-filesets-timestamps", timestamps.iter().copied(), |conn, name| {
        diesel::sql_query(format!(
            r#"DELETE FROM "fileset" WHERE "timestamp" IN {}"#,
            in_subquery(name)
        ))
        .execute(conn)
        .map_err(bvault_db::DbError::from)
    })?;
    if deleted != timestamps.len() {
        return Err(CompactError::inconsistent(format!(
            "expected to delete {} filesets, deleted {deleted}",
            timestamps.len()
        )));
    }

    // Step 2: cascade orphan removal, in the mandated order. Each statement
    // only removes rows unreferenced by what the previous step left behind.
    diesel::delete(
        fileset_entry::table.filter(
            fileset_entry::fileset_id
                .ne_all(fileset::table.select(fileset::id)),
        ),
    )
    .execute(conn)?;

    // `ChangeJournalData.fileset_entry_id` tracks a `FileLookup` id (spec
    // §4.11's per-file change-journal hint), so it is orphaned once no
    // surviving `FilesetEntry` references that file.
    diesel::delete(change_journal_data::table.filter(
        change_journal_data::fileset_entry_id.ne_all(fileset_entry::table.select(fileset_entry::file_id)),
    ))
    .execute(conn)?;

    diesel::delete(
        file_lookup::table.filter(
            file_lookup::id.ne_all(fileset_entry::table.select(fileset_entry::file_id)),
        ),
    )
    .execute(conn)?;

    diesel::delete(metadataset::table.filter(metadataset::id.ne_all(
        file_lookup::table
            .filter(file_lookup::metadata_id.is_not_null())
            .select(file_lookup::metadata_id.assume_not_null()),
    )))
    .execute(conn)?;

    diesel::delete(
        blockset::table.filter(
            blockset::id
                .ne_all(metadataset::table.select(metadataset::blockset_id))
                .and(blockset::id.ne_all(file_lookup::table.select(file_lookup::blockset_id))),
        ),
    )
    .execute(conn)?;

    diesel::delete(
        blockset_entry::table
            .filter(blockset_entry::blockset_id.ne_all(blockset::table.select(blockset::id))),
    )
    .execute(conn)?;

    diesel::delete(
        blocklist_hash::table
            .filter(blocklist_hash::blockset_id.ne_all(blockset::table.select(blockset::id))),
    )
    .execute(conn)?;

    // Step 3: move now-unreferenced blocks into DeletedBlock, then drop them.
    let orphan_blocks: Vec<(i64, String, i64, i64)> = block::table
        .filter(block::id.ne_all(blockset_entry::table.select(blockset_entry::block_id)))
        .filter(block::hash.ne_all(blocklist_hash::table.select(blocklist_hash::hash)))
        .select((block::id, block::hash, block::size, block::volume_id))
        .load(conn)?;

    for (id, hash, size, volume_id) in orphan_blocks.into_iter() {
        diesel::insert_into(deleted_block::table)
            .values((
                deleted_block::hash.eq(hash.clone()),
                deleted_block::size.eq(size),
                deleted_block::volume_id.eq(volume_id),
            ))
            .execute(conn)?;
        diesel::delete(block::table.filter(block::id.eq(id))).execute(conn)?;
    }

    // Step 4: transition now-orphaned Files volumes to Deleting.
    let candidates: Vec<i64> = remote_volume::table
        .filter(remote_volume::kind.eq("Files"))
        .filter(remote_volume::id.ne_all(fileset::table.select(fileset::volume_id)))
        .filter(remote_volume::state.eq_any([
            VolumeState::Uploaded.as_str(),
            VolumeState::Verified.as_str(),
            VolumeState::Temporary.as_str(),
            VolumeState::Deleting.as_str(),
        ]))
        .select(remote_volume::id)
        .load(conn)?;

    let transitioned = bvault_db::models::RemoteVolume::transition_to_deleting(conn, &candidates)?;
    if transitioned != timestamps.len() {
        return Err(CompactError::inconsistent(format!(
            "expected {} Files volumes to transition to Deleting, got {transitioned}",
            timestamps.len()
        )));
    }

    // Step 5: yield every Files volume now in Deleting.
    let dropped = remote_volume::table
        .filter(remote_volume::kind.eq("Files"))
        .filter(remote_volume::state.eq(VolumeState::Deleting.as_str()))
        .select((remote_volume::name, remote_volume::size))
        .load::<(String, i64)>(conn)?
        .into_iter()
        .map(|(name, size)| DroppedVolume { name, size })
        .collect();

    Ok(dropped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bvault_common::filename::VolumeKind;
    use bvault_db::models::{Fileset, FilesetEntry, FileLookup, PathPrefix, RemoteVolume};
    use bvault_db::Database;

    fn make_files_volume(conn: &mut SqliteConnection, suffix: &str) -> i64 {
        RemoteVolume::create(
            conn,
            &format!("p-f0123456789abcdef0123456789{suffix}-20260101T000000Z.zip"),
            VolumeKind::Files,
            VolumeState::Uploaded,
            1024,
            0,
        )
        .unwrap()
    }

    #[test]
    fn s1_round_trip_drop() {
        let db = Database::open_in_memory().unwrap();
        db.transaction("setup", |conn| {
            let v1 = make_files_volume(conn, "abcde1");
            let v2 = make_files_volume(conn, "abcde2");
            let v3 = make_files_volume(conn, "abcde3");

            let prefix = PathPrefix::find_or_create(conn, "/home/")?;
            let f1 = Fileset::create(conn, 1, v1, true)?;
            let f2 = Fileset::create(conn, 2, v2, true)?;
            let f3 = Fileset::create(conn, 3, v3, false)?;

            for (fileset_id, name) in [(f1, "a"), (f2, "b"), (f3, "c")] {
                let bs = bvault_db::models::Blockset::find_or_create(conn, &format!("h{name}"), 10)?;
                let file_id = FileLookup::insert(conn, prefix, name, bs, None)?;
                FilesetEntry::insert(conn, fileset_id, file_id, 0)?;
            }
            Ok(())
        })
        .unwrap();

        let dropped = db.transaction("drop", |conn| drop_filesets(conn, &[2])).unwrap();

        assert_eq!(dropped.len(), 1);
        db.with_connection(|conn| {
            let remaining = fileset::table.count().get_result::<i64>(conn)?;
            assert_eq!(remaining, 2);

            let f2_entries = fileset_entry::table
                .filter(fileset_entry::fileset_id.eq(2))
                .count()
                .get_result::<i64>(conn)?;
            assert_eq!(f2_entries, 0);
            Ok(())
        })
        .unwrap();
    }
}
