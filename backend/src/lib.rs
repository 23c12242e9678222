//! External interfaces (spec §6): the capability surface the core consumes
//! from a transport backend, plus the volume-reader contracts and codec
//! registries that are otherwise external collaborators (spec §1).

pub mod codecs;
pub mod error;
pub mod remote;
pub mod volumes;

pub use codecs::{default_compressors, default_encryptors, probe_candidates, Compressor, Encryptor, Registry};
pub use error::{BackendError, Result};
pub use remote::{DownloadStream, InMemoryBackend, OverlappedDownload, RemoteBackend};
pub use volumes::{
    BlockVolumeReader, FileListEntry, FileListVolumeReader, IndexBlockListEntry, IndexVolumeEntry,
    IndexVolumeReader, InMemoryBlockVolume, InMemoryFileListVolume, InMemoryIndexVolume,
};
