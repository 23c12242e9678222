use bvault_common::filename::VolumeKind;
use bvault_common::types::VolumeState;
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;

use crate::error::Result;
use crate::schema::remote_volume;

fn kind_to_str(kind: VolumeKind) -> &'static str {
    match kind {
        VolumeKind::Files => "Files",
        VolumeKind::Blocks => "Blocks",
        VolumeKind::Index => "Index",
    }
}

fn kind_from_str(s: &str) -> Option<VolumeKind> {
    match s {
        "Files" => Some(VolumeKind::Files),
        "Blocks" => Some(VolumeKind::Blocks),
        "Index" => Some(VolumeKind::Index),
        _ => None,
    }
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = remote_volume)]
pub struct RemoteVolumeRow {
    pub id: i64,
    pub name: String,
    kind: String,
    state: String,
    pub size: i64,
    pub hash: Option<String>,
    pub delete_grace_period: Option<i64>,
    pub created_at: i64,
}

impl RemoteVolumeRow {
    pub fn kind(&self) -> VolumeKind {
        kind_from_str(&self.kind).expect("invalid volume kind persisted in database")
    }

    pub fn state(&self) -> VolumeState {
        VolumeState::from_str(&self.state).expect("invalid volume state persisted in database")
    }
}

pub struct RemoteVolume;

impl RemoteVolume {
    pub fn create(
        conn: &mut SqliteConnection,
        name: &str,
        kind: VolumeKind,
        state: VolumeState,
        size: i64,
        created_at: i64,
    ) -> Result<i64> {
        diesel::insert_into(remote_volume::table)
            .values((
                remote_volume::name.eq(name),
                remote_volume::kind.eq(kind_to_str(kind)),
                remote_volume::state.eq(state.as_str()),
                remote_volume::size.eq(size),
                remote_volume::created_at.eq(created_at),
            ))
            .execute(conn)?;

        let id = remote_volume::table
            .filter(remote_volume::name.eq(name))
            .select(remote_volume::id)
            .first(conn)?;
        Ok(id)
    }

    pub fn get(conn: &mut SqliteConnection, id: i64) -> Result<RemoteVolumeRow> {
        Ok(remote_volume::table
            .filter(remote_volume::id.eq(id))
            .select(RemoteVolumeRow::as_select())
            .first(conn)?)
    }

    pub fn get_by_name(conn: &mut SqliteConnection, name: &str) -> Result<Option<RemoteVolumeRow>> {
        Ok(remote_volume::table
            .filter(remote_volume::name.eq(name))
            .select(RemoteVolumeRow::as_select())
            .first(conn)
            .optional()?)
    }

    pub fn set_state(conn: &mut SqliteConnection, id: i64, state: VolumeState) -> Result<()> {
        diesel::update(remote_volume::table.filter(remote_volume::id.eq(id)))
            .set(remote_volume::state.eq(state.as_str()))
            .execute(conn)?;
        Ok(())
    }

    /// Transitions every `Blocks`/`Files`/`Index` volume whose `id` is in
    /// `ids` and whose current state allows it (spec §3 Lifecycle) to
    /// `Deleting`. Returns the number of rows actually transitioned, so
    /// callers can assert it against an expected count.
    pub fn transition_to_deleting(conn: &mut SqliteConnection, ids: &[i64]) -> Result<usize> {
        let mut count = 0usize;
        for &id in ids {
            let row = Self::get(conn, id)?;
            if row.state().can_transition_to_deleting() {
                Self::set_state(conn, id, VolumeState::Deleting)?;
                count += 1;
            }
        }
        Ok(count)
    }

    pub fn list_by_state(
        conn: &mut SqliteConnection,
        kind: VolumeKind,
        state: VolumeState,
    ) -> Result<Vec<RemoteVolumeRow>> {
        Ok(remote_volume::table
            .filter(remote_volume::kind.eq(kind_to_str(kind)))
            .filter(remote_volume::state.eq(state.as_str()))
            .select(RemoteVolumeRow::as_select())
            .load(conn)?)
    }

    pub fn list_all_of_kind(
        conn: &mut SqliteConnection,
        kind: VolumeKind,
    ) -> Result<Vec<RemoteVolumeRow>> {
        Ok(remote_volume::table
            .filter(remote_volume::kind.eq(kind_to_str(kind)))
            .select(RemoteVolumeRow::as_select())
            .load(conn)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Database;

    #[test]
    fn transitions_respect_lifecycle() {
        let db = Database::open_in_memory().unwrap();
        db.with_connection(|conn| {
            let id = RemoteVolume::create(
                conn,
                "prefix-f0123456789abcdef0123456789abcde-20260101T000000Z.zip",
                VolumeKind::Files,
                VolumeState::Uploaded,
                1024,
                0,
            )?;
            let transitioned = RemoteVolume::transition_to_deleting(conn, &[id])?;
            assert_eq!(transitioned, 1);
            assert_eq!(RemoteVolume::get(conn, id)?.state(), VolumeState::Deleting);

            // Already-deleted volumes are not re-transitioned by a second
            // pass with a fresh lifecycle check (Deleted disallows it).
            RemoteVolume::set_state(conn, id, VolumeState::Deleted)?;
            let transitioned_again = RemoteVolume::transition_to_deleting(conn, &[id])?;
            assert_eq!(transitioned_again, 0);
            Ok(())
        })
        .unwrap();
    }
}
