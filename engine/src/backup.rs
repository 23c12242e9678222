//! Wires the backup pipeline's three actor stages (spec §2 "Data flow:
//! source scan -> metadata pre-processor -> block pipeline -> volume
//! writers -> remote store") into one running chain. The filesystem
//! scanner that produces [`SourceEntry`](bvault_pipeline::SourceEntry)
//! values is an external collaborator (spec §1); this module only owns
//! assembling the stages and driving them to completion.

use std::sync::Arc;

use bvault_backend::RemoteBackend;
use bvault_common::Options;
use bvault_db::Database;
use bvault_pipeline::{
    spawn_actor, ActorHandle, BlockSplitter, MetadataEncoder, MetadataPreProcessor, SourceEntry,
    DEFAULT_QUEUE_SIZE,
};

/// A running backup pipeline: feed [`SourceEntry`] values in via `feed`,
/// then call `finish` once the source scan is exhausted.
pub struct BackupPipeline {
    intake: ActorHandle<MetadataPreProcessor>,
}

impl BackupPipeline {
    /// Spawns the volume manager, block splitter, and metadata
    /// pre-processor in that order (each stage's handle feeds the next),
    /// then returns a handle to the first stage.
    pub fn spawn(
        db: Arc<Database>,
        backend: Arc<dyn RemoteBackend>,
        encoder: Arc<dyn MetadataEncoder>,
        options: Options,
    ) -> Self {
        let volume_manager = bvault_pipeline::VolumeManager::new(backend, options.clone());
        let volume_manager_handle = spawn_actor(volume_manager, DEFAULT_QUEUE_SIZE);

        let block_splitter = BlockSplitter::new(volume_manager_handle);
        let block_splitter_handle = spawn_actor(block_splitter, DEFAULT_QUEUE_SIZE);

        let pre_processor = MetadataPreProcessor::new(db, encoder, options, block_splitter_handle);
        let intake = spawn_actor(pre_processor, DEFAULT_QUEUE_SIZE);

        Self { intake }
    }

    /// Forwards one source-tree entry into the pipeline, suspending if the
    /// first stage's queue is full (spec §5 Suspension points).
    pub async fn feed(&self, entry: SourceEntry) {
        self.intake.send(entry).await;
    }
}
