//! Time subsystem.
//!
//! Provides stable, testable frame timing utilities without coupling to the runtime.
//! Intended usage:
//! - one `FrameClock` per render loop
//! - call `tick()` once per Runtime iteration to obtain `GameTime`

mod frame_clock;

pub use frame_clock::{FrameClock, GameTime};
