//! Core engine-facing contracts.
//!
//! Applications are expressed as a [`TaskGraph`]: three ordered lists of
//! blocks (Init, Runtime, Destroy) contributed by the platform, graphics and
//! application layers. The [`Scheduler`] drives the graph and resolves task
//! outcomes into a single [`Signal`].

mod scheduler;
mod signal;
mod task;

pub use scheduler::Scheduler;
pub use signal::Signal;
pub use task::{Block, Phase, Task, TaskGraph};
