//! `VolumeManager` (spec §9 Design Note): the pipeline's final actor
//! stage, assembling completed blocks into fixed-size `Blocks` volumes and
//! handing them to the remote backend once full. The volume-format byte
//! layout itself is an external collaborator (spec §6); this actor owns
//! only the accumulate-and-flush bookkeeping.

use std::sync::Arc;

use bvault_backend::RemoteBackend;
use bvault_common::Options;

use crate::actor::Actor;
use crate::block_splitter::SplitBlock;

#[derive(Debug, Clone)]
pub enum VolumeManagerMessage {
    Block(SplitBlock),
    /// Sent by the block splitter once a file candidate has been fully
    /// split (or had nothing to split), letting the volume manager track
    /// progress independent of the block stream's granularity.
    FileProcessed { name: String },
    Flush,
}

pub struct VolumeManager {
    backend: Arc<dyn RemoteBackend>,
    options: Options,
    pending_size: u64,
    pending_blocks: Vec<SplitBlock>,
}

impl VolumeManager {
    pub fn new(backend: Arc<dyn RemoteBackend>, options: Options) -> Self {
        Self {
            backend,
            options,
            pending_size: 0,
            pending_blocks: Vec::new(),
        }
    }

    async fn flush(&mut self) {
        if self.pending_blocks.is_empty() {
            return;
        }
        let name = bvault_common::filename::generate_filename(&bvault_common::filename::ParsedFilename {
            kind: bvault_common::filename::VolumeKind::Blocks,
            prefix: "bvault".to_string(),
            guid: bvault_common::filename::Guid::new_random(),
            time: chrono::Utc::now(),
            compression: "store".to_string(),
            encryption: None,
        });
        let payload: Vec<u8> = self
            .pending_blocks
            .iter()
            .flat_map(|b| b.data.iter().copied())
            .collect();
        if let Err(e) = self.backend.put(&name, payload.into()).await {
            log::warn!("volume manager failed to upload volume {name}: {e}");
        } else {
            log::info!(
                "uploaded volume {name} ({} blocks, {} bytes)",
                self.pending_blocks.len(),
                self.pending_size
            );
        }
        self.pending_blocks.clear();
        self.pending_size = 0;
    }
}

impl Actor for VolumeManager {
    type Message = VolumeManagerMessage;

    async fn handle_message(&mut self, message: Self::Message) {
        match message {
            VolumeManagerMessage::Block(block) => {
                self.pending_size += block.size;
                self.pending_blocks.push(block);
                if self.pending_size >= self.options.volsize {
                    self.flush().await;
                }
            }
            VolumeManagerMessage::FileProcessed { name } => {
                log::debug!("volume manager observed completed file {name}");
            }
            VolumeManagerMessage::Flush => self.flush().await,
        }
    }
}
