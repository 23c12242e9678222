//! `TempBlockListHash` (spec §4.9 P3): an in-memory buffer of blocklists
//! read off index (and later block) volumes, pending reconciliation against
//! known `Blockset`s. Modeled as an owned per-session helper rather than a
//! real SQL temp table (`db::with_temp_value_table`) since its lifetime
//! spans several volume-ingest transactions, not one (spec §5: "the
//! recreate engine commits after each successful volume ingest").

use std::collections::HashMap;

/// One buffered blocklist: the blockset content hash it claims to describe,
/// and the ordered block hashes it lists.
#[derive(Debug, Clone, Default)]
pub struct TempBlockListHash {
    entries: HashMap<String, Vec<String>>,
}

impl TempBlockListHash {
    pub fn new() -> Self {
        Self::default()
    }

    /// Buffers a blocklist under its own hash. Later entries with the same
    /// hash overwrite earlier ones -- index and block volumes are expected
    /// to agree, and the newest ingest wins.
    pub fn insert(&mut self, hash: impl Into<String>, block_hashes: Vec<String>) {
        self.entries.insert(hash.into(), block_hashes);
    }

    pub fn get(&self, hash: &str) -> Option<&[String]> {
        self.entries.get(hash).map(|v| v.as_slice())
    }

    pub fn contains(&self, hash: &str) -> bool {
        self.entries.contains_key(hash)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn hashes(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(|s| s.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn newest_insert_for_a_hash_wins() {
        let mut buf = TempBlockListHash::new();
        buf.insert("h", vec!["a".to_string()]);
        buf.insert("h", vec!["a".to_string(), "b".to_string()]);
        assert_eq!(buf.get("h"), Some(["a".to_string(), "b".to_string()].as_slice()));
        assert_eq!(buf.len(), 1);
    }
}
