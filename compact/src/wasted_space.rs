//! Wasted-space report (spec §4.4): per-`Blocks`-volume active/inactive/
//! compressed size and sort-time, the input to the compact decision rules.

use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;

use bvault_db::schema::{
    block, blockset_entry, deleted_block, fileset, fileset_entry, metadataset, remote_volume,
};

use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeWaste {
    pub volume_id: i64,
    pub volume_name: String,
    pub active_size: i64,
    pub inactive_size: i64,
    pub data_size: i64,
    pub wasted_size: i64,
    pub compressed_size: i64,
    pub sort_time: i64,
}

/// Computes the wasted-space report for every `Blocks` volume, ordered by
/// `SortTime` ascending (oldest-first compaction).
pub fn wasted_space_report(conn: &mut SqliteConnection) -> Result<Vec<VolumeWaste>> {
    let volumes: Vec<(i64, String, i64)> = remote_volume::table
        .filter(remote_volume::kind.eq("Blocks"))
        .select((remote_volume::id, remote_volume::name, remote_volume::size))
        .load(conn)?;

    let mut report = Vec::with_capacity(volumes.len());
    for (volume_id, volume_name, compressed_size) in volumes {
        let active_size: Option<i64> = block::table
            .filter(block::volume_id.eq(volume_id))
            .filter(
                diesel::dsl::not(diesel::dsl::exists(
                    deleted_block::table.filter(
                        deleted_block::hash
                            .eq(block::hash)
                            .and(deleted_block::size.eq(block::size))
                            .and(deleted_block::volume_id.eq(block::volume_id)),
                    ),
                )),
            )
            .select(diesel::dsl::sum(block::size))
            .first(conn)?;
        let active_size = active_size.unwrap_or(0);

        let inactive_size: Option<i64> = deleted_block::table
            .filter(deleted_block::volume_id.eq(volume_id))
            .select(diesel::dsl::sum(deleted_block::size))
            .first(conn)?;
        let inactive_size = inactive_size.unwrap_or(0);

        // SortTime = earliest fileset timestamp reaching a block in this
        // volume, via either a file's content blockset or its metadata
        // blockset. Computed as two independent joins and combined here,
        // since a block may be reachable through either path.
        let via_content: Option<i64> = fileset::table
            .inner_join(fileset_entry::table.on(fileset_entry::fileset_id.eq(fileset::id)))
            .inner_join(
                bvault_db::schema::file_lookup::table
                    .on(bvault_db::schema::file_lookup::id.eq(fileset_entry::file_id)),
            )
            .inner_join(
                blockset_entry::table
                    .on(blockset_entry::blockset_id.eq(bvault_db::schema::file_lookup::blockset_id)),
            )
            .inner_join(block::table.on(block::id.eq(blockset_entry::block_id)))
            .filter(block::volume_id.eq(volume_id))
            .select(diesel::dsl::min(fileset::timestamp))
            .first(conn)?;

        let via_metadata: Option<i64> = fileset::table
            .inner_join(fileset_entry::table.on(fileset_entry::fileset_id.eq(fileset::id)))
            .inner_join(
                bvault_db::schema::file_lookup::table
                    .on(bvault_db::schema::file_lookup::id.eq(fileset_entry::file_id)),
            )
            .inner_join(
                metadataset::table
                    .on(metadataset::id
                        .nullable()
                        .eq(bvault_db::schema::file_lookup::metadata_id)),
            )
            .inner_join(
                blockset_entry::table.on(blockset_entry::blockset_id.eq(metadataset::blockset_id)),
            )
            .inner_join(block::table.on(block::id.eq(blockset_entry::block_id)))
            .filter(block::volume_id.eq(volume_id))
            .select(diesel::dsl::min(fileset::timestamp))
            .first(conn)?;

        let sort_time = match (via_content, via_metadata) {
            (Some(a), Some(b)) => a.min(b),
            (Some(a), None) | (None, Some(a)) => a,
            (None, None) => 0,
        };

        report.push(VolumeWaste {
            volume_id,
            volume_name,
            active_size,
            inactive_size,
            data_size: active_size + inactive_size,
            wasted_size: inactive_size,
            compressed_size,
            sort_time,
        });
    }

    report.sort_by_key(|v| v.sort_time);
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bvault_common::filename::VolumeKind;
    use bvault_common::types::VolumeState;
    use bvault_db::models::{Block, DeletedBlock, RemoteVolume};
    use bvault_db::Database;

    #[test]
    fn s2_wasted_space() {
        let db = Database::open_in_memory().unwrap();
        db.transaction("setup", |conn| {
            let v = RemoteVolume::create(
                conn,
                "p-b0123456789abcdef0123456789abcdef-20260101T000000Z.zip",
                VolumeKind::Blocks,
                VolumeState::Uploaded,
                1000,
                0,
            )?;
            for i in 0..10 {
                let hash = format!("h{i}");
                Block::insert(conn, &hash, 100, v)?;
                if i < 6 {
                    DeletedBlock::insert(conn, &hash, 100, v)?;
                    Block::delete(conn, Block::by_hash_size(conn, &hash, 100)?.unwrap().id)?;
                }
            }
            Ok(())
        })
        .unwrap();

        let report = db.with_connection(wasted_space_report).unwrap();
        assert_eq!(report.len(), 1);
        let v = &report[0];
        assert_eq!(v.active_size, 400);
        assert_eq!(v.inactive_size, 600);
        assert_eq!(v.data_size, 1000);
        assert_eq!(v.wasted_size, 600);
    }
}
