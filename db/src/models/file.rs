use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;

use crate::error::Result;
use crate::schema::{change_journal_data, file_lookup, metadataset, path_prefix};

pub struct PathPrefix;

impl PathPrefix {
    pub fn find_or_create(conn: &mut SqliteConnection, prefix: &str) -> Result<i64> {
        if let Some(id) = path_prefix::table
            .filter(path_prefix::prefix.eq(prefix))
            .select(path_prefix::id)
            .first::<i64>(conn)
            .optional()?
        {
            return Ok(id);
        }
        diesel::insert_into(path_prefix::table)
            .values(path_prefix::prefix.eq(prefix))
            .execute(conn)?;
        Ok(path_prefix::table
            .filter(path_prefix::prefix.eq(prefix))
            .select(path_prefix::id)
            .first(conn)?)
    }
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = metadataset)]
pub struct MetadatasetRow {
    pub id: i64,
    pub blockset_id: i64,
}

pub struct Metadataset;

impl Metadataset {
    pub fn find_or_create(conn: &mut SqliteConnection, blockset_id: i64) -> Result<i64> {
        if let Some(id) = metadataset::table
            .filter(metadataset::blockset_id.eq(blockset_id))
            .select(metadataset::id)
            .first::<i64>(conn)
            .optional()?
        {
            return Ok(id);
        }
        diesel::insert_into(metadataset::table)
            .values(metadataset::blockset_id.eq(blockset_id))
            .execute(conn)?;
        Ok(metadataset::table
            .filter(metadataset::blockset_id.eq(blockset_id))
            .select(metadataset::id)
            .first(conn)?)
    }
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = file_lookup)]
pub struct FileLookupRow {
    pub id: i64,
    pub path_prefix_id: i64,
    pub name: String,
    pub blockset_id: i64,
    pub metadata_id: Option<i64>,
}

pub struct FileLookup;

impl FileLookup {
    pub fn insert(
        conn: &mut SqliteConnection,
        path_prefix_id: i64,
        name: &str,
        blockset_id: i64,
        metadata_id: Option<i64>,
    ) -> Result<i64> {
        diesel::insert_into(file_lookup::table)
            .values((
                file_lookup::path_prefix_id.eq(path_prefix_id),
                file_lookup::name.eq(name),
                file_lookup::blockset_id.eq(blockset_id),
                file_lookup::metadata_id.eq(metadata_id),
            ))
            .execute(conn)?;
        Ok(file_lookup::table
            .filter(file_lookup::path_prefix_id.eq(path_prefix_id))
            .filter(file_lookup::name.eq(name))
            .filter(file_lookup::blockset_id.eq(blockset_id))
            .select(file_lookup::id)
            .order(file_lookup::id.desc())
            .first(conn)?)
    }

    pub fn find(
        conn: &mut SqliteConnection,
        path_prefix_id: i64,
        name: &str,
    ) -> Result<Option<FileLookupRow>> {
        Ok(file_lookup::table
            .filter(file_lookup::path_prefix_id.eq(path_prefix_id))
            .filter(file_lookup::name.eq(name))
            .select(FileLookupRow::as_select())
            .first(conn)
            .optional()?)
    }

    pub fn get(conn: &mut SqliteConnection, id: i64) -> Result<FileLookupRow> {
        Ok(file_lookup::table
            .filter(file_lookup::id.eq(id))
            .select(FileLookupRow::as_select())
            .first(conn)?)
    }
}

/// Entries recorded by a filesystem change-journal source (spec §4.11: an
/// OS-level change notification feed used to skip a full directory walk on
/// incremental backups) pending reconciliation into the next `Fileset`.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = change_journal_data)]
pub struct ChangeJournalDataRow {
    pub id: i64,
    pub fileset_entry_id: i64,
    pub path: String,
    pub event_kind: String,
    pub observed_at: i64,
}

pub struct ChangeJournalData;

impl ChangeJournalData {
    pub fn record(
        conn: &mut SqliteConnection,
        fileset_entry_id: i64,
        path: &str,
        event_kind: &str,
        observed_at: i64,
    ) -> Result<i64> {
        diesel::insert_into(change_journal_data::table)
            .values((
                change_journal_data::fileset_entry_id.eq(fileset_entry_id),
                change_journal_data::path.eq(path),
                change_journal_data::event_kind.eq(event_kind),
                change_journal_data::observed_at.eq(observed_at),
            ))
            .execute(conn)?;
        Ok(change_journal_data::table
            .order(change_journal_data::id.desc())
            .select(change_journal_data::id)
            .first(conn)?)
    }

    pub fn pending_since(
        conn: &mut SqliteConnection,
        since: i64,
    ) -> Result<Vec<ChangeJournalDataRow>> {
        Ok(change_journal_data::table
            .filter(change_journal_data::observed_at.ge(since))
            .order(change_journal_data::observed_at.asc())
            .select(ChangeJournalDataRow::as_select())
            .load(conn)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Database;

    #[test]
    fn path_prefix_is_reused() {
        let db = Database::open_in_memory().unwrap();
        db.with_connection(|conn| {
            let a = PathPrefix::find_or_create(conn, "/home/user/")?;
            let b = PathPrefix::find_or_create(conn, "/home/user/")?;
            assert_eq!(a, b);
            Ok(())
        })
        .unwrap();
    }
}
