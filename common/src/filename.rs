//! Remote file naming (spec §6): `<prefix>-<type><guid>-<ISO8601 time>.<compression>[.<encryption>]`.
//!
//! Parsing and generation are required to be exact inverses of one another
//! (property P7); [`probe`] additionally requires that regenerating a
//! candidate filename from a parsed one with a substituted codec pair
//! round-trips too (property P8).

use chrono::{DateTime, SecondsFormat, TimeZone, Utc};
use rand::RngCore;
use std::fmt;

/// The three kinds of remote volume, encoded as a single letter in the name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VolumeKind {
    Blocks,
    Index,
    Files,
}

impl VolumeKind {
    fn code(self) -> char {
        match self {
            VolumeKind::Blocks => 'b',
            VolumeKind::Index => 'i',
            VolumeKind::Files => 'f',
        }
    }

    fn from_code(c: char) -> Option<Self> {
        match c {
            'b' => Some(VolumeKind::Blocks),
            'i' => Some(VolumeKind::Index),
            'f' => Some(VolumeKind::Files),
            _ => None,
        }
    }
}

/// A 128-bit random identifier rendered as lowercase hex, used both for
/// remote filenames and for temporary table names (db crate).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Guid(pub String);

impl Guid {
    pub fn new_random() -> Self {
        let mut bytes = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(hex::encode(bytes))
    }
}

impl fmt::Display for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ParsedFilename {
    pub kind: VolumeKind,
    pub prefix: String,
    pub guid: Guid,
    pub time: DateTime<Utc>,
    pub compression: String,
    pub encryption: Option<String>,
}

fn format_time(time: &DateTime<Utc>) -> String {
    // yyyyMMdd'T'HHmmss'Z', the ISO8601 "basic" variant without separators,
    // matching the teacher's terse timestamp formatting elsewhere.
    time.to_rfc3339_opts(SecondsFormat::Secs, true)
        .replace(['-', ':'], "")
}

fn parse_time(s: &str) -> Option<DateTime<Utc>> {
    // s looks like "20260728T151200Z"
    let parsed = chrono::NaiveDateTime::parse_from_str(s, "%Y%m%dT%H%M%SZ").ok()?;
    Some(Utc.from_utc_datetime(&parsed))
}

/// Generates the canonical filename for a parsed/constructed volume
/// descriptor. Inverse of [`parse_filename`].
pub fn generate_filename(p: &ParsedFilename) -> String {
    let mut name = format!(
        "{}-{}{}-{}.{}",
        p.prefix,
        p.kind.code(),
        p.guid,
        format_time(&p.time),
        p.compression
    );
    if let Some(enc) = &p.encryption {
        name.push('.');
        name.push_str(enc);
    }
    name
}

/// Parses a remote filename into its components. Returns `None` when the
/// name does not match the expected shape at all (a non-Duplicati-style
/// file living alongside the volumes on the remote, for instance).
pub fn parse_filename(name: &str) -> Option<ParsedFilename> {
    // Split off the extensions first: "<base>.<compression>[.<encryption>]"
    let mut ext_parts = name.splitn(3, '.');
    let base = ext_parts.next()?;
    let compression = ext_parts.next()?.to_string();
    let encryption = ext_parts.next().map(|s| s.to_string());

    // base looks like "<prefix>-<type><guid>-<time>"
    let (head, time_str) = base.rsplit_once('-')?;
    let (prefix, type_and_guid) = head.rsplit_once('-')?;

    let mut chars = type_and_guid.chars();
    let kind = VolumeKind::from_code(chars.next()?)?;
    let guid: String = chars.collect();
    if guid.len() != 32 || !guid.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }

    let time = parse_time(time_str)?;

    Some(ParsedFilename {
        kind,
        prefix: prefix.to_string(),
        guid: Guid(guid),
        time,
        compression,
        encryption,
    })
}

/// Given a parsed filename and a set of candidate `(compression, encryption)`
/// pairs (including a `None` encryption entry for "no encryption"), tries
/// every combination and returns the first one that appears in `exists`.
/// Returns `None` if no candidate matches (spec §4.10: "(-1, original)" in
/// the design's native error convention, translated here to `Option`).
pub fn probe<'a, F>(
    original: &ParsedFilename,
    candidates: impl IntoIterator<Item = (&'a str, Option<&'a str>)>,
    mut exists: F,
) -> Option<String>
where
    F: FnMut(&str) -> bool,
{
    for (compression, encryption) in candidates {
        let candidate = ParsedFilename {
            kind: original.kind,
            prefix: original.prefix.clone(),
            guid: original.guid.clone(),
            time: original.time,
            compression: compression.to_string(),
            encryption: encryption.map(|s| s.to_string()),
        };
        let name = generate_filename(&candidate);
        if exists(&name) {
            return Some(name);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ParsedFilename {
        ParsedFilename {
            kind: VolumeKind::Blocks,
            prefix: "duplicate-backup".to_string(),
            guid: Guid("0123456789abcdef0123456789abcdef".to_string()),
            time: Utc.with_ymd_and_hms(2026, 7, 28, 15, 12, 0).unwrap(),
            compression: "zip".to_string(),
            encryption: Some("aes".to_string()),
        }
    }

    #[test]
    fn round_trips_with_encryption() {
        let p = sample();
        let name = generate_filename(&p);
        assert_eq!(parse_filename(&name), Some(p));
    }

    #[test]
    fn round_trips_without_encryption() {
        let mut p = sample();
        p.encryption = None;
        let name = generate_filename(&p);
        assert_eq!(parse_filename(&name), Some(p));
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_filename("not-a-volume-name.txt").is_none());
        assert!(parse_filename("prefix-xGUID-20260728T151200Z.zip").is_none());
    }

    #[test]
    fn probe_finds_first_match() {
        let p = sample();
        let candidates = [("zip", None), ("zip", Some("aes"))];
        let target = {
            let mut q = p.clone();
            q.encryption = None;
            generate_filename(&q)
        };
        let found = probe(&p, candidates, |n| n == target);
        assert_eq!(found, Some(target));
    }

    #[test]
    fn probe_returns_none_when_nothing_matches() {
        let p = sample();
        let candidates = [("zip", Some("aes"))];
        assert_eq!(probe(&p, candidates, |_| false), None);
    }
}
