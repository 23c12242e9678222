//! (P1) Remote listing (spec §4.9): parse every remote filename, reject an
//! empty or wrong-prefix remote, and require a passphrase once any volume
//! advertises encryption.

use bvault_common::error::UserErrorKind;
use bvault_common::filename::{parse_filename, ParsedFilename};
use bvault_common::Options;

use crate::error::{RecreateError, Result};

/// One parsed remote entry, kept alongside its original filename since
/// later phases (index ingest, probing) need to look files up by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteEntry {
    pub name: String,
    pub parsed: ParsedFilename,
}

/// Parses every name in `names`, keeping only the ones matching the remote
/// filename grammar. Fails `EmptyRemoteLocation` when nothing at all
/// parses, and distinguishes that from "every parseable file has a
/// different prefix" by reporting `WrongRemotePrefix` once at least one
/// entry parsed but none matched `prefix`.
pub fn list_remote(names: &[String], prefix: &str) -> Result<Vec<RemoteEntry>> {
    let parsed: Vec<RemoteEntry> = names
        .iter()
        .filter_map(|name| {
            parse_filename(name).map(|parsed| RemoteEntry {
                name: name.clone(),
                parsed,
            })
        })
        .collect();

    if parsed.is_empty() {
        return Err(RecreateError::user(
            UserErrorKind::EmptyRemoteLocation,
            "no parseable backup volumes found at the remote location",
        ));
    }

    let matching: Vec<RemoteEntry> = parsed.into_iter().filter(|e| e.parsed.prefix == prefix).collect();
    if matching.is_empty() {
        return Err(RecreateError::user(
            UserErrorKind::WrongRemotePrefix,
            format!("remote location has volumes, but none with prefix '{prefix}'"),
        ));
    }

    Ok(matching)
}

/// Fails `MissingPassphrase` if any listed volume declares encryption and
/// `options.passphrase` is unset.
pub fn require_passphrase_if_encrypted(entries: &[RemoteEntry], options: &Options) -> Result<()> {
    let encrypted = entries.iter().any(|e| e.parsed.encryption.is_some());
    if encrypted && options.passphrase.is_none() {
        return Err(RecreateError::user(
            UserErrorKind::MissingPassphrase,
            "remote volumes are encrypted but no passphrase is configured",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bvault_common::filename::{generate_filename, Guid, VolumeKind};
    use chrono::{TimeZone, Utc};

    fn name(kind: VolumeKind, prefix: &str, enc: Option<&str>) -> String {
        generate_filename(&ParsedFilename {
            kind,
            prefix: prefix.to_string(),
            guid: Guid::new_random(),
            time: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
            compression: "zip".to_string(),
            encryption: enc.map(|s| s.to_string()),
        })
    }

    #[test]
    fn empty_remote_location_is_rejected() {
        let err = list_remote(&["README.txt".to_string()], "p").unwrap_err();
        assert!(matches!(
            err,
            RecreateError::User {
                kind: UserErrorKind::EmptyRemoteLocation,
                ..
            }
        ));
    }

    #[test]
    fn wrong_prefix_is_distinguished_from_empty() {
        let names = vec![name(VolumeKind::Files, "other", None)];
        let err = list_remote(&names, "mine").unwrap_err();
        assert!(matches!(
            err,
            RecreateError::User {
                kind: UserErrorKind::WrongRemotePrefix,
                ..
            }
        ));
    }

    #[test]
    fn missing_passphrase_is_detected_for_encrypted_volumes() {
        let names = vec![name(VolumeKind::Blocks, "p", Some("aes"))];
        let entries = list_remote(&names, "p").unwrap();
        let err = require_passphrase_if_encrypted(&entries, &Options::default()).unwrap_err();
        assert!(matches!(
            err,
            RecreateError::User {
                kind: UserErrorKind::MissingPassphrase,
                ..
            }
        ));

        let ok_options = Options::default().with_passphrase(Some("secret".to_string()));
        assert!(require_passphrase_if_encrypted(&entries, &ok_options).is_ok());
    }

    #[test]
    fn unencrypted_listing_needs_no_passphrase() {
        let names = vec![name(VolumeKind::Blocks, "p", None)];
        let entries = list_remote(&names, "p").unwrap();
        assert!(require_passphrase_if_encrypted(&entries, &Options::default()).is_ok());
    }
}
