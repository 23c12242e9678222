use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;

use crate::error::Result;
use crate::schema::{fileset, fileset_entry};

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = fileset)]
pub struct FilesetRow {
    pub id: i64,
    pub timestamp: i64,
    pub volume_id: i64,
    pub is_full_backup: bool,
}

pub struct Fileset;

impl Fileset {
    pub fn create(
        conn: &mut SqliteConnection,
        timestamp: i64,
        volume_id: i64,
        is_full_backup: bool,
    ) -> Result<i64> {
        diesel::insert_into(fileset::table)
            .values((
                fileset::timestamp.eq(timestamp),
                fileset::volume_id.eq(volume_id),
                fileset::is_full_backup.eq(is_full_backup),
            ))
            .execute(conn)?;
        Ok(fileset::table
            .filter(fileset::volume_id.eq(volume_id))
            .select(fileset::id)
            .first(conn)?)
    }

    pub fn get(conn: &mut SqliteConnection, id: i64) -> Result<FilesetRow> {
        Ok(fileset::table
            .filter(fileset::id.eq(id))
            .select(FilesetRow::as_select())
            .first(conn)?)
    }

    /// All filesets (each corresponding to one backup version) ordered
    /// newest-first, the ordering every retention policy remover operates
    /// on (spec §4.8).
    pub fn all_by_recency(conn: &mut SqliteConnection) -> Result<Vec<FilesetRow>> {
        Ok(fileset::table
            .order(fileset::timestamp.desc())
            .select(FilesetRow::as_select())
            .load(conn)?)
    }

    pub fn delete(conn: &mut SqliteConnection, id: i64) -> Result<()> {
        diesel::delete(fileset::table.filter(fileset::id.eq(id))).execute(conn)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = fileset_entry)]
pub struct FilesetEntryRow {
    pub fileset_id: i64,
    pub file_id: i64,
    pub last_modified: i64,
}

pub struct FilesetEntry;

impl FilesetEntry {
    pub fn insert(
        conn: &mut SqliteConnection,
        fileset_id: i64,
        file_id: i64,
        last_modified: i64,
    ) -> Result<()> {
        diesel::insert_into(fileset_entry::table)
            .values((
                fileset_entry::fileset_id.eq(fileset_id),
                fileset_entry::file_id.eq(file_id),
                fileset_entry::last_modified.eq(last_modified),
            ))
            .execute(conn)?;
        Ok(())
    }

    pub fn for_fileset(conn: &mut SqliteConnection, fileset_id: i64) -> Result<Vec<FilesetEntryRow>> {
        Ok(fileset_entry::table
            .filter(fileset_entry::fileset_id.eq(fileset_id))
            .select(FilesetEntryRow::as_select())
            .load(conn)?)
    }

    /// Every fileset referencing `file_id`, used by the dropper (spec §4.3)
    /// to decide whether a `FileLookup` row is still reachable once its
    /// owning fileset is removed.
    pub fn filesets_referencing_file(conn: &mut SqliteConnection, file_id: i64) -> Result<Vec<i64>> {
        Ok(fileset_entry::table
            .filter(fileset_entry::file_id.eq(file_id))
            .select(fileset_entry::fileset_id)
            .load(conn)?)
    }

    pub fn delete_for_fileset(conn: &mut SqliteConnection, fileset_id: i64) -> Result<usize> {
        Ok(
            diesel::delete(fileset_entry::table.filter(fileset_entry::fileset_id.eq(fileset_id)))
                .execute(conn)?,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Database;

    #[test]
    fn filesets_list_newest_first() {
        let db = Database::open_in_memory().unwrap();
        db.with_connection(|conn| {
            for (ts, prefix) in [(100, "a"), (300, "b"), (200, "c")] {
                let vol_id = crate::models::RemoteVolume::create(
                    conn,
                    &format!("{prefix}-f0123456789abcdef0123456789abcdef-20260101T000000Z.zip"),
                    bvault_common::filename::VolumeKind::Files,
                    bvault_common::types::VolumeState::Uploaded,
                    0,
                    0,
                )?;
                Fileset::create(conn, ts, vol_id, true)?;
            }
            let sets = Fileset::all_by_recency(conn)?;
            let timestamps: Vec<i64> = sets.iter().map(|s| s.timestamp).collect();
            assert_eq!(timestamps, vec![300, 200, 100]);
            Ok(())
        })
        .unwrap();
    }
}
