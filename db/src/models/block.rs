use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use lru::LruCache;
use std::num::NonZeroUsize;

use crate::error::Result;
use crate::schema::{block, deleted_block, duplicate_block};

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = block)]
pub struct BlockRow {
    pub id: i64,
    pub hash: String,
    pub size: i64,
    pub volume_id: i64,
}

pub struct Block;

impl Block {
    pub fn by_hash_size(
        conn: &mut SqliteConnection,
        hash: &str,
        size: i64,
    ) -> Result<Option<BlockRow>> {
        Ok(block::table
            .filter(block::hash.eq(hash))
            .filter(block::size.eq(size))
            .select(BlockRow::as_select())
            .first(conn)
            .optional()?)
    }

    pub fn by_id(conn: &mut SqliteConnection, id: i64) -> Result<BlockRow> {
        Ok(block::table
            .filter(block::id.eq(id))
            .select(BlockRow::as_select())
            .first(conn)?)
    }

    pub fn insert(conn: &mut SqliteConnection, hash: &str, size: i64, volume_id: i64) -> Result<i64> {
        diesel::insert_into(block::table)
            .values((
                block::hash.eq(hash),
                block::size.eq(size),
                block::volume_id.eq(volume_id),
            ))
            .execute(conn)?;
        let id = block::table
            .filter(block::hash.eq(hash))
            .filter(block::size.eq(size))
            .select(block::id)
            .first(conn)?;
        Ok(id)
    }

    /// `UpdateBlock` from spec §4.9 P3: inserts `(hash, size, volume_id)` if
    /// no block with that `(hash, size)` exists yet; otherwise leaves the
    /// existing row untouched. Returns whether a new row was inserted.
    pub fn upsert(
        conn: &mut SqliteConnection,
        hash: &str,
        size: i64,
        volume_id: i64,
    ) -> Result<(i64, bool)> {
        if let Some(existing) = Self::by_hash_size(conn, hash, size)? {
            return Ok((existing.id, false));
        }
        let id = Self::insert(conn, hash, size, volume_id)?;
        Ok((id, true))
    }

    pub fn set_volume(conn: &mut SqliteConnection, id: i64, volume_id: i64) -> Result<()> {
        diesel::update(block::table.filter(block::id.eq(id)))
            .set(block::volume_id.eq(volume_id))
            .execute(conn)?;
        Ok(())
    }

    pub fn delete(conn: &mut SqliteConnection, id: i64) -> Result<()> {
        diesel::delete(block::table.filter(block::id.eq(id))).execute(conn)?;
        Ok(())
    }

    pub fn ids_in_volume(conn: &mut SqliteConnection, volume_id: i64) -> Result<Vec<i64>> {
        Ok(block::table
            .filter(block::volume_id.eq(volume_id))
            .select(block::id)
            .load(conn)?)
    }
}

pub struct DeletedBlock;

impl DeletedBlock {
    pub fn insert(conn: &mut SqliteConnection, hash: &str, size: i64, volume_id: i64) -> Result<()> {
        diesel::insert_into(deleted_block::table)
            .values((
                deleted_block::hash.eq(hash),
                deleted_block::size.eq(size),
                deleted_block::volume_id.eq(volume_id),
            ))
            .execute(conn)?;
        Ok(())
    }

    pub fn sum_size_by_volume(conn: &mut SqliteConnection, volume_id: i64) -> Result<i64> {
        use diesel::dsl::sum;
        let total: Option<i64> = deleted_block::table
            .filter(deleted_block::volume_id.eq(volume_id))
            .select(sum(deleted_block::size))
            .first(conn)?;
        Ok(total.unwrap_or(0))
    }
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = duplicate_block)]
pub struct DuplicateBlockRow {
    pub block_id: i64,
    pub volume_id: i64,
}

pub struct DuplicateBlock;

impl DuplicateBlock {
    pub fn insert(conn: &mut SqliteConnection, block_id: i64, volume_id: i64) -> Result<()> {
        diesel::insert_into(duplicate_block::table)
            .values((
                duplicate_block::block_id.eq(block_id),
                duplicate_block::volume_id.eq(volume_id),
            ))
            .execute(conn)?;
        Ok(())
    }

    pub fn for_block(conn: &mut SqliteConnection, block_id: i64) -> Result<Vec<DuplicateBlockRow>> {
        Ok(duplicate_block::table
            .filter(duplicate_block::block_id.eq(block_id))
            .select(DuplicateBlockRow::as_select())
            .load(conn)?)
    }

    pub fn delete(conn: &mut SqliteConnection, block_id: i64, volume_id: i64) -> Result<usize> {
        Ok(diesel::delete(
            duplicate_block::table
                .filter(duplicate_block::block_id.eq(block_id))
                .filter(duplicate_block::volume_id.eq(volume_id)),
        )
        .execute(conn)?)
    }

    pub fn delete_all_in_volume(conn: &mut SqliteConnection, volume_id: i64) -> Result<usize> {
        Ok(
            diesel::delete(duplicate_block::table.filter(duplicate_block::volume_id.eq(volume_id)))
                .execute(conn)?,
        )
    }
}

/// O(1) (amortised) cached lookup of "is block H/S live, and in which
/// volume?" (spec §4.2). Constructed once per compact cycle; not required
/// to be thread-safe -- it is an owned per-operation helper wrapping an
/// LRU front for repeat lookups, with Diesel's own statement cache on the
/// underlying connection standing in for the "single prepared statement
/// reused across calls" of the source design.
pub struct BlockQuery {
    cache: LruCache<(String, i64), i64>,
}

impl BlockQuery {
    pub fn new(capacity: usize) -> Self {
        Self {
            cache: LruCache::new(NonZeroUsize::new(capacity.max(1)).unwrap()),
        }
    }

    /// Returns `false` if no block matches `(hash, size)`. Returns `true` if
    /// `expected_volume_id` is `-1` (the caller only asks liveness).
    /// Otherwise returns whether the stored `volume_id` equals
    /// `expected_volume_id`.
    pub fn use_block(
        &mut self,
        conn: &mut SqliteConnection,
        hash: &str,
        size: i64,
        expected_volume_id: i64,
    ) -> Result<bool> {
        let key = (hash.to_string(), size);
        let volume_id = if let Some(&v) = self.cache.get(&key) {
            v
        } else {
            match Block::by_hash_size(conn, hash, size)? {
                None => return Ok(false),
                Some(row) => {
                    self.cache.put(key, row.volume_id);
                    row.volume_id
                }
            }
        };
        if expected_volume_id == -1 {
            return Ok(true);
        }
        Ok(volume_id == expected_volume_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Database;

    #[test]
    fn use_block_liveness_and_volume_match() {
        let db = Database::open_in_memory().unwrap();
        db.with_connection(|conn| {
            crate::models::RemoteVolume::create(
                conn,
                "p-b0123456789abcdef0123456789abcde-20260101T000000Z.zip",
                bvault_common::filename::VolumeKind::Blocks,
                bvault_common::types::VolumeState::Uploaded,
                0,
                0,
            )?;
            Block::insert(conn, "deadbeef", 100, 1)?;
            Ok(())
        })
        .unwrap();

        let mut bq = BlockQuery::new(16);
        db.with_connection(|conn| {
            assert!(bq.use_block(conn, "deadbeef", 100, -1).unwrap());
            assert!(bq.use_block(conn, "deadbeef", 100, 1).unwrap());
            assert!(!bq.use_block(conn, "deadbeef", 100, 2).unwrap());
            assert!(!bq.use_block(conn, "nothash", 100, -1).unwrap());
            Ok(())
        })
        .unwrap();
    }
}
