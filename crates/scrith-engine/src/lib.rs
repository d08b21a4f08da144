//! Scrith engine crate.
//!
//! Frame lifecycle and GPU synchronization for the hex tile demo: the task
//! scheduler, the window shim, device and swap chain ownership, the
//! descriptor registry and the per-frame orchestration of raster, compute and
//! optional ray-query passes.

pub mod config;
pub mod core;
pub mod descriptor;
pub mod device;
pub mod input;
pub mod logging;
pub mod raytracing;
pub mod render;
pub mod scene;
pub mod time;
pub mod window;
