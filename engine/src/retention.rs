//! Orchestrates retention policy evaluation (spec §4.8) against the live
//! `Fileset` table and feeds the result into [`crate::delete::drop_filesets`].

use bvault_backend::RemoteBackend;
use bvault_common::Options;
use bvault_db::models::Fileset;
use bvault_db::Database;
use bvault_retention::{
    explicit_versions, keep_time, keep_versions, resolve_deletions, retention_policy, FilesetView,
    TimeframeInterval,
};

use crate::delete::drop_filesets_and_remove;
use crate::error::Result;

/// The removers a caller may enable for one retention pass; all `None`
/// fields are simply skipped (spec §4.8: "four independent removers ...
/// composed with deduplication").
#[derive(Debug, Default, Clone)]
pub struct RetentionRequest {
    pub explicit_versions: Option<std::collections::HashSet<usize>>,
    pub keep_time_cutoff: Option<i64>,
    pub keep_versions_n: Option<usize>,
    pub retention_policy: Option<(i64, Vec<TimeframeInterval>)>,
}

fn load_filesets(conn: &mut diesel::sqlite::SqliteConnection) -> bvault_db::Result<Vec<FilesetView>> {
    Ok(Fileset::all_by_recency(conn)?
        .into_iter()
        .map(|row| FilesetView {
            id: row.id,
            timestamp: row.timestamp,
            is_full_backup: row.is_full_backup,
        })
        .collect())
}

/// Evaluates `request` against the current fileset table and drops every
/// fileset the union selects, returning the remote volumes it freed.
pub async fn run_retention(
    db: &Database,
    backend: &dyn RemoteBackend,
    options: &Options,
    request: &RetentionRequest,
) -> Result<Vec<String>> {
    let filesets = db.with_connection(|conn| {
        load_filesets(conn).map_err(|e| bvault_db::DbError::Inconsistent(e.to_string()))
    })?;

    let mut removers: Vec<std::collections::HashSet<i64>> = Vec::new();
    if let Some(versions) = &request.explicit_versions {
        removers.push(explicit_versions(&filesets, versions));
    }
    if let Some(cutoff) = request.keep_time_cutoff {
        removers.push(keep_time(&filesets, cutoff));
    }
    if let Some(n) = request.keep_versions_n {
        removers.push(keep_versions(&filesets, n));
    }
    if let Some((now, windows)) = &request.retention_policy {
        removers.push(retention_policy(&filesets, *now, windows, options.allow_full_removal));
    }

    let deletable_ids = resolve_deletions(&filesets, removers, options.allow_full_removal);
    if deletable_ids.is_empty() {
        return Ok(Vec::new());
    }

    let timestamps: Vec<i64> = filesets
        .iter()
        .filter(|fs| deletable_ids.contains(&fs.id))
        .map(|fs| fs.timestamp)
        .collect();

    if options.dry_run {
        log::info!("retention: would drop {} filesets (dry run)", timestamps.len());
        return Ok(Vec::new());
    }

    drop_filesets_and_remove(db, backend, &timestamps).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use bvault_backend::InMemoryBackend;
    use bvault_common::filename::VolumeKind;
    use bvault_common::types::VolumeState;
    use bvault_db::models::{Fileset, RemoteVolume};

    // S1: drop a single fileset by explicit version and confirm its Files
    // volume is freed.
    #[tokio::test]
    async fn run_retention_drops_explicit_version() {
        let db = Database::open_in_memory().unwrap();
        let backend = InMemoryBackend::new();
        backend.seed("p-f0123456789abcdef0123456789abcd2-20260102T000000Z.zip", vec![]);

        db.transaction("seed", |conn| {
            for (ts, suffix) in [(1, "1"), (2, "2"), (3, "3")] {
                let name = format!("p-f0123456789abcdef0123456789abcd{suffix}-20260101T000000Z.zip");
                let vol = RemoteVolume::create(
                    conn,
                    &name,
                    VolumeKind::Files,
                    VolumeState::Uploaded,
                    0,
                    0,
                )?;
                Fileset::create(conn, ts, vol, true)?;
            }
            Ok(())
        })
        .unwrap();

        let request = RetentionRequest {
            explicit_versions: Some([1].into_iter().collect()),
            ..Default::default()
        };
        let options = Options::default();
        let freed = run_retention(&db, &backend, &options, &request).await.unwrap();
        assert_eq!(freed.len(), 1);

        let remaining = db.with_connection(|conn| Fileset::all_by_recency(conn)).unwrap();
        assert_eq!(remaining.len(), 2);
    }
}
