//! Delete/compact engine: fileset dropper, wasted-space analyzer, compact
//! report decision rules, block reassignment and delete ordering.

pub mod dropper;
pub mod error;
pub mod reassign;
pub mod reorder;
pub mod report;
pub mod wasted_space;

pub use dropper::{drop_filesets, DroppedVolume};
pub use error::{CompactError, Result};
pub use reassign::prepare_for_delete;
pub use reorder::IndexBlockMap;
pub use report::{compact_report, CompactInputs, CompactReport};
pub use wasted_space::{wasted_space_report, VolumeWaste};
