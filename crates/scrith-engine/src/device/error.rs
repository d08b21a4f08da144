use thiserror::Error;

use super::state::{ResourceId, ResourceState};

/// Failures raised by the device layer.
#[derive(Error, Debug)]
pub enum DeviceError {
    #[error("no suitable GPU adapter: {0}")]
    NoAdapter(#[from] wgpu::RequestAdapterError),

    #[error("device request failed: {0}")]
    RequestDevice(#[from] wgpu::RequestDeviceError),

    #[error("surface creation failed: {0}")]
    CreateSurface(#[from] wgpu::CreateSurfaceError),

    #[error("surface reports no supported formats")]
    NoSurfaceFormat,

    #[error("fence wait for value {value} failed: {reason}")]
    FenceWait { value: u64, reason: String },

    #[error("fence value {value} still pending after wait (completed {completed})")]
    FenceIncomplete { value: u64, completed: u64 },

    #[error(transparent)]
    Transition(#[from] TransitionError),
}

/// A resource barrier that does not match the tracked state.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransitionError {
    #[error("`{resource}` is in {actual:?}, barrier expects {expected:?}")]
    StateMismatch {
        resource: ResourceId,
        expected: ResourceState,
        actual: ResourceState,
    },

    #[error("`{0}` is not tracked")]
    UnknownResource(ResourceId),
}

/// High-level response after a surface error.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum SurfaceErrorAction {
    /// Surface was reconfigured; rendering may resume next frame.
    Reconfigured,
    /// Transient error; skip the current frame.
    SkipFrame,
    /// Fatal error (commonly OOM); terminate gracefully.
    Fatal,
}
