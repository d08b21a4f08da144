//! Window/platform shim.
//!
//! Owns the `winit` event loop and the demo window. Events are pumped on
//! demand and folded into scheduler signals and input state.

mod shim;

pub use shim::WindowShim;
