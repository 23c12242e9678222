//! Delete ordering (spec §4.7): `reorder_deletable(volumes)`.

use std::collections::{HashMap, HashSet};

use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;

use bvault_db::schema::index_block_link;

use crate::error::Result;

/// Bidirectional view over `IndexBlockLink`, loaded once per compact cycle.
pub struct IndexBlockMap {
    index_to_blocks: HashMap<i64, HashSet<i64>>,
    block_to_indexes: HashMap<i64, Vec<i64>>,
}

impl IndexBlockMap {
    pub fn load(conn: &mut SqliteConnection) -> Result<Self> {
        let links: Vec<(i64, i64)> = index_block_link::table
            .select((index_block_link::index_volume_id, index_block_link::block_volume_id))
            .load(conn)?;

        let mut index_to_blocks: HashMap<i64, HashSet<i64>> = HashMap::new();
        let mut block_to_indexes: HashMap<i64, Vec<i64>> = HashMap::new();
        for (index_id, block_id) in links {
            index_to_blocks.entry(index_id).or_default().insert(block_id);
            block_to_indexes.entry(block_id).or_default().push(index_id);
        }
        Ok(Self {
            index_to_blocks,
            block_to_indexes,
        })
    }

    /// Yields `volumes` in order, interleaving each index volume immediately
    /// after the last block volume that references it -- guaranteeing an
    /// index file is removed only after its last block file (spec P3).
    pub fn reorder_deletable(&mut self, volumes: &[i64]) -> Vec<i64> {
        let mut out = Vec::with_capacity(volumes.len());
        let mut yielded_index = HashSet::new();

        for &v in volumes {
            out.push(v);
            if let Some(indexes) = self.block_to_indexes.get(&v).cloned() {
                for i in indexes {
                    if let Some(blocks) = self.index_to_blocks.get_mut(&i) {
                        blocks.remove(&v);
                        if blocks.is_empty() && yielded_index.insert(i) {
                            out.push(i);
                        }
                    }
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn p3_index_follows_its_last_block() {
        let mut map = IndexBlockMap {
            index_to_blocks: HashMap::from([(100, HashSet::from([1, 2]))]),
            block_to_indexes: HashMap::from([(1, vec![100]), (2, vec![100])]),
        };
        let out = map.reorder_deletable(&[1, 2]);
        assert_eq!(out, vec![1, 2, 100]);
    }

    #[test]
    fn index_is_not_yielded_before_all_its_blocks_are_gone() {
        let mut map = IndexBlockMap {
            index_to_blocks: HashMap::from([(100, HashSet::from([1, 2, 3]))]),
            block_to_indexes: HashMap::from([(1, vec![100]), (2, vec![100]), (3, vec![100])]),
        };
        let out = map.reorder_deletable(&[1, 2]);
        assert_eq!(out, vec![1, 2]);
        let out2 = map.reorder_deletable(&[3]);
        assert_eq!(out2, vec![3, 100]);
    }
}
