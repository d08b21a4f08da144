//! Descriptor heaps and the role registry.
//!
//! All handle arithmetic lives in [`heap`]; the registry maps each
//! [`DescriptorRole`] to a fixed slot and assembles descriptor tables (bind
//! groups) from role lists.

mod heap;
mod registry;
mod role;

use thiserror::Error;

pub use heap::{CpuHandle, DescriptorHandle, DescriptorHeap, GpuHandle, HeapKind};
pub use registry::{DescriptorRegistry, DescriptorResource, DescriptorTable, TableEntry};
pub use role::DescriptorRole;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DescriptorError {
    #[error("{kind:?} heap slot {index} out of range (capacity {capacity})")]
    OutOfRange {
        kind: HeapKind,
        index: u32,
        capacity: u32,
    },

    #[error("descriptor slot `{}` is empty", .0.label())]
    EmptySlot(DescriptorRole),
}
