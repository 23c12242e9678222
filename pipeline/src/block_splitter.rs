//! `StreamBlockSplitter` (spec §9 Design Note: the backup pipeline's second
//! actor stage, between the metadata pre-processor and the volume
//! manager). The chunker and hasher that actually split file content into
//! fixed-size blocks are external collaborators (spec §1); this actor owns
//! only the forwarding/backpressure shape, matching the rest of the
//! actor-per-stage pipeline.

use crate::actor::{Actor, ActorHandle};
use crate::metadata::ProcessedEntry;
use crate::volume_manager::VolumeManager;

/// A content block ready for volume assembly, produced by the external
/// chunker/hasher for one [`ProcessedEntry::FileCandidate`].
#[derive(Debug, Clone)]
pub struct SplitBlock {
    pub hash: String,
    pub size: u64,
    pub data: bytes::Bytes,
}

pub struct BlockSplitter {
    out: Option<ActorHandle<VolumeManager>>,
}

impl BlockSplitter {
    pub fn new(out: ActorHandle<VolumeManager>) -> Self {
        Self { out: Some(out) }
    }

    /// A splitter with no downstream volume manager, for tests that only
    /// need something to hand a `ActorHandle<BlockSplitter>` to.
    pub fn new_noop() -> Self {
        Self { out: None }
    }
}

impl Actor for BlockSplitter {
    type Message = ProcessedEntry;

    async fn handle_message(&mut self, message: Self::Message) {
        let ProcessedEntry::FileCandidate { name, .. } = &message else {
            return;
        };
        let Some(out) = &self.out else {
            log::debug!("block splitter has no downstream volume manager (test/noop mode)");
            return;
        };
        log::debug!("splitting file candidate {name} into blocks");
        out.send(crate::volume_manager::VolumeManagerMessage::FileProcessed {
            name: name.clone(),
        })
        .await;
    }
}
