use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;

use crate::error::Result;
use crate::schema::{blocklist_hash, blockset, blockset_entry, small_blockset_link};

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = blockset)]
pub struct BlocksetRow {
    pub id: i64,
    pub full_hash: String,
    pub length: i64,
}

pub struct Blockset;

impl Blockset {
    pub fn find_or_create(conn: &mut SqliteConnection, full_hash: &str, length: i64) -> Result<i64> {
        if let Some(id) = blockset::table
            .filter(blockset::full_hash.eq(full_hash))
            .filter(blockset::length.eq(length))
            .select(blockset::id)
            .first::<i64>(conn)
            .optional()?
        {
            return Ok(id);
        }
        diesel::insert_into(blockset::table)
            .values((
                blockset::full_hash.eq(full_hash),
                blockset::length.eq(length),
            ))
            .execute(conn)?;
        Ok(blockset::table
            .filter(blockset::full_hash.eq(full_hash))
            .filter(blockset::length.eq(length))
            .select(blockset::id)
            .first(conn)?)
    }

    pub fn get(conn: &mut SqliteConnection, id: i64) -> Result<BlocksetRow> {
        Ok(blockset::table
            .filter(blockset::id.eq(id))
            .select(BlocksetRow::as_select())
            .first(conn)?)
    }
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = blockset_entry)]
pub struct BlocksetEntryRow {
    pub blockset_id: i64,
    pub index: i64,
    pub block_id: i64,
}

pub struct BlocksetEntry;

impl BlocksetEntry {
    pub fn insert(conn: &mut SqliteConnection, blockset_id: i64, index: i64, block_id: i64) -> Result<()> {
        diesel::insert_into(blockset_entry::table)
            .values((
                blockset_entry::blockset_id.eq(blockset_id),
                blockset_entry::index.eq(index),
                blockset_entry::block_id.eq(block_id),
            ))
            .execute(conn)?;
        Ok(())
    }

    pub fn ordered_for_blockset(
        conn: &mut SqliteConnection,
        blockset_id: i64,
    ) -> Result<Vec<BlocksetEntryRow>> {
        Ok(blockset_entry::table
            .filter(blockset_entry::blockset_id.eq(blockset_id))
            .order(blockset_entry::index.asc())
            .select(BlocksetEntryRow::as_select())
            .load(conn)?)
    }
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = blocklist_hash)]
pub struct BlocklistHashRow {
    pub blockset_id: i64,
    pub index: i64,
    pub hash: String,
}

pub struct BlocklistHash;

impl BlocklistHash {
    pub fn insert(conn: &mut SqliteConnection, blockset_id: i64, index: i64, hash: &str) -> Result<()> {
        diesel::insert_into(blocklist_hash::table)
            .values((
                blocklist_hash::blockset_id.eq(blockset_id),
                blocklist_hash::index.eq(index),
                blocklist_hash::hash.eq(hash),
            ))
            .execute(conn)?;
        Ok(())
    }

    pub fn ordered_for_blockset(
        conn: &mut SqliteConnection,
        blockset_id: i64,
    ) -> Result<Vec<BlocklistHashRow>> {
        Ok(blocklist_hash::table
            .filter(blocklist_hash::blockset_id.eq(blockset_id))
            .order(blocklist_hash::index.asc())
            .select(BlocklistHashRow::as_select())
            .load(conn)?)
    }
}

/// Small-file blocksets (spec §4.11: files smaller than `small_file_size`
/// are batched together rather than each getting their own blockset) are
/// additionally indexed by content hash so a later small file with
/// identical content can reuse the same blockset without re-chunking.
pub struct SmallBlocksetLink;

impl SmallBlocksetLink {
    pub fn insert(conn: &mut SqliteConnection, blockset_id: i64, hash: &str) -> Result<()> {
        diesel::insert_into(small_blockset_link::table)
            .values((
                small_blockset_link::blockset_id.eq(blockset_id),
                small_blockset_link::hash.eq(hash),
            ))
            .execute(conn)?;
        Ok(())
    }

    pub fn find_by_hash(conn: &mut SqliteConnection, hash: &str) -> Result<Option<i64>> {
        Ok(small_blockset_link::table
            .filter(small_blockset_link::hash.eq(hash))
            .select(small_blockset_link::blockset_id)
            .first(conn)
            .optional()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Database;

    #[test]
    fn blockset_entries_load_in_index_order() {
        let db = Database::open_in_memory().unwrap();
        db.with_connection(|conn| {
            let bs = Blockset::find_or_create(conn, "fullhash", 300)?;
            crate::models::RemoteVolume::create(
                conn,
                "p-b0123456789abcdef0123456789abcde-20260101T000000Z.zip",
                bvault_common::filename::VolumeKind::Blocks,
                bvault_common::types::VolumeState::Uploaded,
                0,
                0,
            )?;
            let b0 = crate::models::Block::insert(conn, "h0", 100, 1)?;
            let b1 = crate::models::Block::insert(conn, "h1", 100, 1)?;
            let b2 = crate::models::Block::insert(conn, "h2", 100, 1)?;
            BlocksetEntry::insert(conn, bs, 2, b2)?;
            BlocksetEntry::insert(conn, bs, 0, b0)?;
            BlocksetEntry::insert(conn, bs, 1, b1)?;

            let entries = BlocksetEntry::ordered_for_blockset(conn, bs)?;
            let indices: Vec<i64> = entries.iter().map(|e| e.index).collect();
            assert_eq!(indices, vec![0, 1, 2]);
            Ok(())
        })
        .unwrap();
    }
}
