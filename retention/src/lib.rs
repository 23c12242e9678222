//! Retention policy evaluation (spec §4.8): four independent removers whose
//! results are unioned, deduplicated by fileset id, and guarded by a safety
//! net that never lets every fileset disappear unless explicitly allowed.

use std::collections::HashSet;

/// The minimal view of a [`Fileset`] a retention remover needs. `id` is the
/// database row id; `timestamp` is seconds since the Unix epoch; the
/// "version" (user-visible backup index) is derived from sorting these
/// descending by `timestamp`, per spec §3 invariant 6.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilesetView {
    pub id: i64,
    pub timestamp: i64,
    pub is_full_backup: bool,
}

/// Sorts `filesets` newest-first and pairs each with its zero-based version
/// index (spec §3 invariant 6 / glossary "Fileset").
pub fn backup_versions(filesets: &[FilesetView]) -> Vec<(usize, FilesetView)> {
    let mut sorted = filesets.to_vec();
    sorted.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    sorted.into_iter().enumerate().collect()
}

/// Remover 1: deletes filesets whose user-visible version is named
/// explicitly by the caller.
pub fn explicit_versions(filesets: &[FilesetView], versions: &HashSet<usize>) -> HashSet<i64> {
    backup_versions(filesets)
        .into_iter()
        .filter(|(v, _)| versions.contains(v))
        .map(|(_, fs)| fs.id)
        .collect()
}

/// Remover 2: `KeepTime(cutoff)` (spec §4.8.2). Sorts descending, skips
/// (keeps) while `time >= cutoff` or no full backup has been seen yet; the
/// remainder, once that stops holding, is deletable. Guarantees at least one
/// full backup survives if any exists in the input (property P4).
pub fn keep_time(filesets: &[FilesetView], cutoff: i64) -> HashSet<i64> {
    let mut sorted = filesets.to_vec();
    sorted.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

    let mut seen_full = false;
    let mut past_cutoff = false;
    let mut deletable = HashSet::new();
    for fs in sorted {
        if !past_cutoff {
            if fs.timestamp >= cutoff || !seen_full {
                if fs.is_full_backup {
                    seen_full = true;
                }
                continue;
            }
            past_cutoff = true;
        }
        deletable.insert(fs.id);
    }
    deletable
}

/// Remover 3: `KeepVersions(N)` (spec §4.8.3). Leading partial backups (most
/// recent, before the first full backup) are always kept since there is no
/// anchor to compact them against yet. Once the first full backup is seen,
/// up to `N` full backups are kept; partials found between kept fulls are
/// deletable ("intermediate partials surrounded by two fulls"); once the
/// `N`+1th full backup is reached, it and everything older is deletable.
pub fn keep_versions(filesets: &[FilesetView], keep_n: usize) -> HashSet<i64> {
    let mut sorted = filesets.to_vec();
    sorted.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

    let mut deletable = HashSet::new();
    let mut seen_first_full = false;
    let mut full_count = 0usize;
    let mut beyond = false;

    for fs in sorted {
        if beyond {
            deletable.insert(fs.id);
            continue;
        }
        if !seen_first_full {
            if fs.is_full_backup {
                seen_first_full = true;
                full_count = 1;
                if full_count > keep_n {
                    beyond = true;
                    deletable.insert(fs.id);
                }
            }
            // leading partial: always kept.
            continue;
        }
        if fs.is_full_backup {
            full_count += 1;
            if full_count > keep_n {
                beyond = true;
                deletable.insert(fs.id);
            }
            // else: one of the N kept fulls.
        } else {
            // intermediate partial between two retained fulls.
            deletable.insert(fs.id);
        }
    }
    deletable
}

/// One `(timeframe, interval)` pair from spec §4.8.4. `timeframe = None`
/// means "no upper bound" (the catch-all last entry); `timeframe = Some(s)`
/// covers backups up to `s` seconds old. `interval` is the minimum spacing
/// (in seconds) required between two kept full backups inside this window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeframeInterval {
    pub timeframe: Option<i64>,
    pub interval: i64,
}

/// Remover 4: `RetentionPolicy` (spec §4.8.4). `now` anchors the timeframe
/// windows; `allow_full_removal` controls whether the single most recent
/// backup may itself be deleted when it falls outside every timeframe.
///
/// Windows are looked up ascending by `timeframe` (property P6): the first
/// pair whose `timeframe` is `None`, or whose `timeframe >= age`, supplies
/// the spacing rule for a backup of that age. Backups are walked newest to
/// oldest; a full backup is kept only if it is at least `interval` seconds
/// older than the most recently kept full backup (partials are always kept
/// inside a covered window and never update the spacing anchor). A backup
/// older than every `timeframe` is deletable outright, except the single
/// most recent backup in the whole input, which is force-kept unless
/// `allow_full_removal` is set.
pub fn retention_policy(
    filesets: &[FilesetView],
    now: i64,
    timeframes: &[TimeframeInterval],
    allow_full_removal: bool,
) -> HashSet<i64> {
    let mut windows = timeframes.to_vec();
    windows.sort_by(|a, b| match (a.timeframe, b.timeframe) {
        (None, None) => std::cmp::Ordering::Equal,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (Some(_), None) => std::cmp::Ordering::Less,
        (Some(x), Some(y)) => x.cmp(&y),
    });

    let lookup_interval = |age: i64| -> Option<i64> {
        windows
            .iter()
            .find(|w| w.timeframe.map_or(true, |t| age <= t))
            .map(|w| w.interval)
    };

    let mut sorted = filesets.to_vec();
    sorted.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

    let mut deletable = HashSet::new();
    let mut last_kept: Option<i64> = None;
    for (i, fs) in sorted.iter().enumerate() {
        let age = now - fs.timestamp;
        match lookup_interval(age) {
            None => {
                // Older than every timeframe.
                if i == 0 && !allow_full_removal {
                    if fs.is_full_backup {
                        last_kept = Some(fs.timestamp);
                    }
                } else {
                    deletable.insert(fs.id);
                }
            }
            Some(interval) => {
                if !fs.is_full_backup {
                    continue; // partials are always kept inside timeframes.
                }
                let keep = match last_kept {
                    None => true,
                    Some(last) => (last - fs.timestamp) > interval,
                };
                if keep {
                    last_kept = Some(fs.timestamp);
                } else {
                    deletable.insert(fs.id);
                }
            }
        }
    }
    deletable
}

/// Unions the outputs of whichever removers the caller chose to run,
/// deduplicating by fileset id, then applies the safety net from spec
/// §4.8: if the union would delete every fileset and `allow_full_removal`
/// is false, the oldest fileset is spared.
pub fn resolve_deletions(
    filesets: &[FilesetView],
    removers: impl IntoIterator<Item = HashSet<i64>>,
    allow_full_removal: bool,
) -> HashSet<i64> {
    let mut deletable: HashSet<i64> = HashSet::new();
    for set in removers {
        deletable.extend(set);
    }

    if !allow_full_removal && !filesets.is_empty() && deletable.len() == filesets.len() {
        if let Some(oldest) = filesets.iter().min_by_key(|fs| fs.timestamp) {
            log::warn!(
                "retention: union would delete every fileset; sparing oldest (id={})",
                oldest.id
            );
            deletable.remove(&oldest.id);
        }
    }
    deletable
}
