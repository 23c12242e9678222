//! Pipeline runtime (spec §5, §9): a generic actor/event-bus scheduler,
//! cooperative cancellation, and the metadata pre-processor stage plus its
//! two downstream actors (`StreamBlockSplitter`, `VolumeManager`).

pub mod actor;
pub mod block_splitter;
pub mod cancellation;
pub mod error;
pub mod event_bus;
pub mod metadata;
pub mod volume_manager;

pub use actor::{spawn_actor, Actor, ActorHandle, DEFAULT_QUEUE_SIZE};
pub use block_splitter::{BlockSplitter, SplitBlock};
pub use cancellation::CancellationToken;
pub use error::{PipelineError, Result};
pub use event_bus::{select_either, EventBus, EventBusMessage};
pub use metadata::{MetadataEncoder, MetadataPreProcessor, PriorFileState, ProcessedEntry, SourceEntry};
pub use volume_manager::{VolumeManager, VolumeManagerMessage};
