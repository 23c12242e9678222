//! `ListBrokenFiles` (spec §2): reports files whose blockset never fully
//! recovered, and clears out the placeholder volumes recreate left behind
//! for references it could never resolve.

use bvault_db::Database;
use bvault_recreate::{list_broken_files, mark_missing_volumes_for_deletion, BrokenFile};

use crate::error::Result;

/// Lists every broken file, then marks any still-`Temporary` block volume
/// for deletion so a subsequent compact run purges it. Both steps run in
/// one transaction since they share the same read of the index database.
pub fn list_and_clean_broken_files(db: &Database, blocksize: u64) -> Result<Vec<BrokenFile>> {
    db.transaction("list-broken-files", |conn| {
        let broken = list_broken_files(conn, blocksize)
            .map_err(|e| bvault_db::DbError::Inconsistent(e.to_string()))?;
        mark_missing_volumes_for_deletion(conn)
            .map_err(|e| bvault_db::DbError::Inconsistent(e.to_string()))?;
        Ok(broken)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_database_has_no_broken_files() {
        let db = Database::open_in_memory().unwrap();
        let broken = list_and_clean_broken_files(&db, 100 * 1024 * 1024).unwrap();
        assert!(broken.is_empty());
    }
}
