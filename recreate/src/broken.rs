//! `ListBrokenFiles` (spec §2): identifies filesets with unresolved blocks
//! after remote loss, and marks the never-recovered placeholder volumes
//! (spec §4.9 P3's `Temporary` registrations) for deletion so compact can
//! purge them.

use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;

use bvault_common::types::VolumeState;
use bvault_db::models::{Fileset, FilesetEntry, RemoteVolume};
use bvault_db::schema::{path_prefix, remote_volume};

use crate::error::Result;
use crate::reconcile::blockset_is_complete;

/// One file whose blockset could not be fully recovered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokenFile {
    pub fileset_id: i64,
    pub file_id: i64,
    pub path: String,
}

fn full_path(conn: &mut SqliteConnection, prefix_id: i64, name: &str) -> Result<String> {
    let prefix: String = path_prefix::table
        .filter(path_prefix::id.eq(prefix_id))
        .select(path_prefix::prefix)
        .first(conn)?;
    Ok(format!("{prefix}{name}"))
}

/// Walks every fileset's entries and reports the ones whose blockset is
/// still missing content after recreate has run to completion.
pub fn list_broken_files(conn: &mut SqliteConnection, blocksize: u64) -> Result<Vec<BrokenFile>> {
    let mut broken = Vec::new();

    for fileset in Fileset::all_by_recency(conn)? {
        for entry in FilesetEntry::for_fileset(conn, fileset.id)? {
            let file = bvault_db::models::FileLookup::get(conn, entry.file_id)?;
            if !blockset_is_complete(conn, file.blockset_id, blocksize)? {
                broken.push(BrokenFile {
                    fileset_id: fileset.id,
                    file_id: entry.file_id,
                    path: full_path(conn, file.path_prefix_id, &file.name)?,
                });
            }
        }
    }

    Ok(broken)
}

/// Marks every `Blocks` volume still stuck in `Temporary` (spec §4.9 P3: a
/// placeholder registered for a reference that was never resolved to real
/// remote content) as `Deleting`, so the compact engine purges it.
pub fn mark_missing_volumes_for_deletion(conn: &mut SqliteConnection) -> Result<usize> {
    let candidates: Vec<i64> = remote_volume::table
        .filter(remote_volume::kind.eq("Blocks"))
        .filter(remote_volume::state.eq(VolumeState::Temporary.as_str()))
        .select(remote_volume::id)
        .load(conn)?;
    RemoteVolume::transition_to_deleting(conn, &candidates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bvault_common::filename::VolumeKind;
    use bvault_db::models::{Blockset, FileLookup, PathPrefix};
    use bvault_db::Database;

    #[test]
    fn reports_files_whose_blockset_is_still_incomplete() {
        let db = Database::open_in_memory().unwrap();
        db.transaction("t", |conn| {
            let vol = RemoteVolume::create(
                conn,
                "p-f0123456789abcdef0123456789abcde1-20260101T000000Z.zip",
                VolumeKind::Files,
                VolumeState::Uploaded,
                0,
                0,
            )?;
            let fileset_id = Fileset::create(conn, 0, vol, true)?;
            let prefix = PathPrefix::find_or_create(conn, "/home/")?;
            let bs = Blockset::find_or_create(conn, "h", 500)?;
            let file_id = FileLookup::insert(conn, prefix, "doc.txt", bs, None)?;
            FilesetEntry::insert(conn, fileset_id, file_id, 0)?;

            let broken = list_broken_files(conn, 100)?;
            assert_eq!(broken.len(), 1);
            assert_eq!(broken[0].path, "/home/doc.txt");
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn marks_unresolved_placeholders_for_deletion() {
        let db = Database::open_in_memory().unwrap();
        db.transaction("t", |conn| {
            let placeholder = RemoteVolume::create(
                conn,
                "p-b0123456789abcdef0123456789abcde2-20260101T000000Z.zip",
                VolumeKind::Blocks,
                VolumeState::Temporary,
                0,
                0,
            )?;
            let marked = mark_missing_volumes_for_deletion(conn)?;
            assert_eq!(marked, 1);
            assert_eq!(RemoteVolume::get(conn, placeholder)?.state(), VolumeState::Deleting);
            Ok(())
        })
        .unwrap();
    }
}
