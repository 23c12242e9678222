//! (P2) File-list ingest (spec §4.9): register each `Files` volume as a
//! `Fileset` and populate `FileLookup`, `Blockset`, `Metadataset` and
//! `SmallBlocksetLink` from its declared entries.

use diesel::sqlite::SqliteConnection;

use bvault_backend::FileListVolumeReader;
use bvault_common::types::EntryType;
use bvault_db::models::{Blockset, FileLookup, Metadataset, PathPrefix, SmallBlocksetLink};

use crate::error::Result;

/// Splits a path into `(prefix, name)` the way `FileLookup` stores it: the
/// prefix is everything up to and including the final separator.
fn split_path(path: &str) -> (&str, &str) {
    match path.rfind('/') {
        Some(idx) => (&path[..=idx], &path[idx + 1..]),
        None => ("", path),
    }
}

/// Ingests one `Files` volume's declared entries into a newly created
/// `Fileset`, returning its id. Must run inside the caller's transaction;
/// the recreate engine commits once per volume (spec §5 Ordering
/// guarantees: "the recreate engine commits after each successful volume
/// ingest").
pub fn ingest_file_list(
    conn: &mut SqliteConnection,
    volume_id: i64,
    timestamp: i64,
    reader: &dyn FileListVolumeReader,
) -> Result<i64> {
    let fileset_id = bvault_db::models::Fileset::create(conn, timestamp, volume_id, reader.is_full_backup())?;

    for entry in reader.entries() {
        let content_hash = entry.hash.clone().unwrap_or_default();
        let blockset_id = Blockset::find_or_create(conn, &content_hash, entry.size as i64)?;

        for (index, hash) in entry.blockset_hashes.iter().enumerate() {
            bvault_db::models::BlocklistHash::insert(conn, blockset_id, index as i64, hash)?;
        }

        // Single-block blocksets: link directly to their sole block hash so
        // a later block-volume probe can be skipped (spec §4.9 P2).
        if let Some(blockhash) = &entry.blockhash {
            SmallBlocksetLink::insert(conn, blockset_id, blockhash)?;
        }

        let metadata_id = match &entry.metahash {
            Some(metahash) => {
                let meta_blockset_id =
                    Blockset::find_or_create(conn, metahash, entry.metasize.unwrap_or(0) as i64)?;
                for (index, hash) in entry.meta_blockset_hashes.iter().enumerate() {
                    bvault_db::models::BlocklistHash::insert(conn, meta_blockset_id, index as i64, hash)?;
                }
                Some(Metadataset::find_or_create(conn, meta_blockset_id)?)
            }
            None => None,
        };

        let (prefix, name) = split_path(&entry.path);
        let prefix_id = PathPrefix::find_or_create(conn, prefix)?;
        let file_id = FileLookup::insert(conn, prefix_id, name, blockset_id, metadata_id)?;
        bvault_db::models::FilesetEntry::insert(conn, fileset_id, file_id, entry.time)?;
    }

    Ok(fileset_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bvault_backend::{FileListEntry, InMemoryFileListVolume};
    use bvault_common::filename::VolumeKind;
    use bvault_common::types::VolumeState;
    use bvault_db::Database;

    fn volume(conn: &mut SqliteConnection) -> i64 {
        bvault_db::models::RemoteVolume::create(
            conn,
            "p-f0123456789abcdef0123456789abcde1-20260101T000000Z.zip",
            VolumeKind::Files,
            VolumeState::Uploaded,
            1024,
            0,
        )
        .unwrap()
    }

    #[test]
    fn ingests_a_file_and_its_metadata() {
        let db = Database::open_in_memory().unwrap();
        db.transaction("ingest", |conn| {
            let vol = volume(conn);
            let mut reader = InMemoryFileListVolume::new("f1", true);
            reader.entries.push(FileListEntry {
                entry_type: EntryType::File,
                path: "/home/user/doc.txt".to_string(),
                time: 100,
                size: 300,
                hash: Some("filehash".to_string()),
                blockset_hashes: vec!["bl0".to_string(), "bl1".to_string(), "bl2".to_string()],
                metahash: Some("metahash".to_string()),
                metasize: Some(64),
                meta_blockset_hashes: vec!["mbl0".to_string()],
                blockhash: None,
            });

            let fileset_id = ingest_file_list(conn, vol, 100, &reader)?;

            let entries = bvault_db::models::FilesetEntry::for_fileset(conn, fileset_id)?;
            assert_eq!(entries.len(), 1);

            let file = FileLookup::get(conn, entries[0].file_id)?;
            assert_eq!(file.name, "doc.txt");
            assert!(file.metadata_id.is_some());
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn single_block_files_link_through_small_blockset_link() {
        let db = Database::open_in_memory().unwrap();
        db.transaction("ingest", |conn| {
            let vol = volume(conn);
            let mut reader = InMemoryFileListVolume::new("f1", true);
            reader.entries.push(FileListEntry {
                entry_type: EntryType::File,
                path: "/small.txt".to_string(),
                time: 0,
                size: 10,
                hash: Some("smallhash".to_string()),
                blockset_hashes: vec![],
                metahash: None,
                metasize: None,
                meta_blockset_hashes: vec![],
                blockhash: Some("onlyblock".to_string()),
            });
            ingest_file_list(conn, vol, 0, &reader)?;

            let blockset_id = Blockset::find_or_create(conn, "smallhash", 10)?;
            assert_eq!(SmallBlocksetLink::find_by_hash(conn, "onlyblock")?, Some(blockset_id));
            Ok(())
        })
        .unwrap();
    }
}
