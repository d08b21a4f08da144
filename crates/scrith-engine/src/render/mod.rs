//! Frame rendering.
//!
//! A frame is first built as a [`FramePlan`] (steps plus every declared state
//! transition) and then recorded by a [`FrameRecorder`]. [`Renderer`] owns the
//! GPU objects and records plans through wgpu.

mod mesh;
mod orchestrator;
mod pipelines;
mod plan;
mod recorder;
mod targets;

pub use mesh::{HexMesh, Mesh};
pub use orchestrator::{CLEAR_COLOR, FrameOutcome, Renderer};
pub use pipelines::{POST_GROUP, Pipelines, TILE_GROUP, Tables, tile_workgroups};
pub use plan::{FrameKind, FramePlan, Step};
pub use recorder::FrameRecorder;
pub use targets::{PostTargets, STORAGE_FORMAT, Target, row_workgroups};

pub(crate) use pipelines::compute_pipeline_with_prelude;
