use std::fmt;

/// Lifecycle state of a [`crate::filename::VolumeKind`] remote volume (spec §3).
///
/// Forms a DAG: `Temporary -> Uploading -> Uploaded -> Verified -> Deleting
/// -> Deleted`. Only `Uploaded` or `Verified` volumes may serve reads;
/// `Temporary` and `Uploading` are invisible to consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VolumeState {
    Temporary,
    Uploading,
    Uploaded,
    Verified,
    Deleting,
    Deleted,
}

impl VolumeState {
    pub fn as_str(&self) -> &'static str {
        match self {
            VolumeState::Temporary => "Temporary",
            VolumeState::Uploading => "Uploading",
            VolumeState::Uploaded => "Uploaded",
            VolumeState::Verified => "Verified",
            VolumeState::Deleting => "Deleting",
            VolumeState::Deleted => "Deleted",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        Some(match s {
            "Temporary" => VolumeState::Temporary,
            "Uploading" => VolumeState::Uploading,
            "Uploaded" => VolumeState::Uploaded,
            "Verified" => VolumeState::Verified,
            "Deleting" => VolumeState::Deleting,
            "Deleted" => VolumeState::Deleted,
            _ => return None,
        })
    }

    /// Only volumes in these states may serve reads (spec §3 Lifecycle).
    pub fn is_readable(&self) -> bool {
        matches!(self, VolumeState::Uploaded | VolumeState::Verified)
    }

    /// Whether a fileset-drop / compact pass may transition this state to
    /// `Deleting` (spec §4.3 step 4).
    pub fn can_transition_to_deleting(&self) -> bool {
        matches!(
            self,
            VolumeState::Uploaded
                | VolumeState::Verified
                | VolumeState::Temporary
                | VolumeState::Deleting
        )
    }
}

impl fmt::Display for VolumeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A content hash, opaque to the core (the hasher is an external
/// collaborator per spec §1/§6). Stored and compared as raw bytes; rendered
/// as lowercase hex for logging and remote filenames.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Hash(pub Vec<u8>);

impl Hash {
    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }

    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        Ok(Self(hex::decode(s)?))
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// The kind of filesystem entry a `FileLookup` row stands for, as declared
/// by a file-list volume (spec §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryType {
    File,
    Folder,
    Symlink,
}
