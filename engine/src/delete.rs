//! Drives the fileset dropper (spec §4.3) inside one transaction, then
//! deletes the freed `Files` volumes from the remote backend.

use bvault_backend::RemoteBackend;
use bvault_compact::drop_filesets;
use bvault_db::Database;

use crate::error::Result;

/// Drops every fileset whose timestamp is in `timestamps`, then deletes the
/// `Files` volumes the cascade freed from `backend`. Returns the freed
/// volume names. Fileset-drop steps run atomically (spec §5 Ordering
/// guarantees); the remote deletes happen afterwards, outside that
/// transaction, since remote I/O is a suspension point and must not run
/// while holding the database lock (spec §5 Suspension points).
pub async fn drop_filesets_and_remove(
    db: &Database,
    backend: &dyn RemoteBackend,
    timestamps: &[i64],
) -> Result<Vec<String>> {
    let dropped = db.transaction("drop-filesets", |conn| {
        drop_filesets(conn, timestamps).map_err(|e| bvault_db::DbError::Inconsistent(e.to_string()))
    })?;

    let mut freed = Vec::with_capacity(dropped.len());
    for volume in dropped {
        backend.delete(&volume.name, volume.size as u64, false).await?;
        freed.push(volume.name);
    }
    backend.wait_for_empty().await?;
    Ok(freed)
}
