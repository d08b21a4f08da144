//! GPU device, swap chain and synchronization.
//!
//! This module is responsible for:
//! - creating the wgpu Instance/Adapter/Device/Queue and caching capabilities
//! - the CPU/GPU fence and `flush`
//! - the double-buffered swap chain and its depth buffer
//! - tracking declared resource states across a frame

mod context;
mod error;
mod fence;
mod frame;
mod gpu;
mod init;
mod state;
mod surface;

pub use context::GraphicsContext;
pub use error::{DeviceError, SurfaceErrorAction, TransitionError};
pub use fence::{Fence, QueueTimeline, SignalQueue};
pub use frame::{BUFFER_COUNT, FrameContext, ScissorRect, Viewport};
pub use gpu::{DESCRIPTOR_INCREMENT, DeviceCaps, Gpu};
pub use init::DeviceInit;
pub use state::{ResourceId, ResourceState, StateTracker, Transition};
pub use surface::{AcquiredFrame, DEPTH_FORMAT, DepthBuffer, MsaaTarget, SwapChain};
