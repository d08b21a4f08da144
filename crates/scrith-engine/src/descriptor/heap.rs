use super::DescriptorError;

/// Kind of descriptor a heap stores.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum HeapKind {
    /// Constant buffers, shader resources and unordered-access views.
    CbvSrvUav,
    /// Render target views.
    Rtv,
    /// Depth-stencil views.
    Dsv,
}

impl HeapKind {
    fn tag(self) -> u64 {
        match self {
            HeapKind::CbvSrvUav => 1,
            HeapKind::Rtv => 2,
            HeapKind::Dsv => 3,
        }
    }
}

/// CPU-side descriptor address.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct CpuHandle(pub u64);

/// GPU-side descriptor address (only for shader-visible heaps).
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct GpuHandle(pub u64);

/// CPU/GPU address pair of one heap slot.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct DescriptorHandle {
    pub index: u32,
    pub cpu: CpuHandle,
    pub gpu: Option<GpuHandle>,
}

/// Fixed-capacity descriptor heap.
///
/// wgpu keeps real descriptors opaque, so addresses here are synthetic: a base
/// per heap kind plus `index * increment`. They are stable for the life of the
/// heap, which is what callers rely on. The heap never grows.
#[derive(Debug, Clone)]
pub struct DescriptorHeap {
    kind: HeapKind,
    capacity: u32,
    increment: u32,
    cpu_base: CpuHandle,
    gpu_base: Option<GpuHandle>,
}

const GPU_SPACE: u64 = 1 << 63;

impl DescriptorHeap {
    pub fn new(kind: HeapKind, capacity: u32, increment: u32, shader_visible: bool) -> Self {
        debug_assert!(increment > 0);
        let cpu_base = kind.tag() << 32;
        Self {
            kind,
            capacity,
            increment,
            cpu_base: CpuHandle(cpu_base),
            gpu_base: shader_visible.then_some(GpuHandle(GPU_SPACE | cpu_base)),
        }
    }

    pub fn kind(&self) -> HeapKind {
        self.kind
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    pub fn increment(&self) -> u32 {
        self.increment
    }

    pub fn is_shader_visible(&self) -> bool {
        self.gpu_base.is_some()
    }

    pub fn cpu_start(&self) -> CpuHandle {
        self.cpu_base
    }

    pub fn gpu_start(&self) -> Option<GpuHandle> {
        self.gpu_base
    }

    /// Address pair of slot `index`.
    pub fn handle(&self, index: u32) -> Result<DescriptorHandle, DescriptorError> {
        if index >= self.capacity {
            return Err(DescriptorError::OutOfRange {
                kind: self.kind,
                index,
                capacity: self.capacity,
            });
        }

        let offset = u64::from(index) * u64::from(self.increment);
        Ok(DescriptorHandle {
            index,
            cpu: CpuHandle(self.cpu_base.0 + offset),
            gpu: self.gpu_base.map(|g| GpuHandle(g.0 + offset)),
        })
    }

    /// Address pairs of every slot, in index order.
    pub fn handles(&self) -> impl Iterator<Item = DescriptorHandle> + '_ {
        (0..self.capacity).filter_map(|i| self.handle(i).ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handles_step_by_increment() {
        let heap = DescriptorHeap::new(HeapKind::Rtv, 2, 32, false);
        let a = heap.handle(0).unwrap();
        let b = heap.handle(1).unwrap();

        assert_eq!(a.cpu, heap.cpu_start());
        assert_eq!(b.cpu.0 - a.cpu.0, 32);
        assert_eq!(a.gpu, None);
    }

    #[test]
    fn shader_visible_heap_pairs_cpu_and_gpu_offsets() {
        let heap = DescriptorHeap::new(HeapKind::CbvSrvUav, 8, 4, true);
        for h in heap.handles() {
            let gpu = h.gpu.unwrap();
            let start = heap.gpu_start().unwrap();
            assert_eq!(gpu.0 - start.0, h.cpu.0 - heap.cpu_start().0);
        }
        assert_eq!(heap.handles().count(), 8);
    }

    #[test]
    fn out_of_range_index_is_an_error() {
        let heap = DescriptorHeap::new(HeapKind::Dsv, 1, 1, false);
        assert!(matches!(
            heap.handle(1),
            Err(DescriptorError::OutOfRange { index: 1, capacity: 1, .. })
        ));
    }

    #[test]
    fn kinds_do_not_overlap() {
        let rtv = DescriptorHeap::new(HeapKind::Rtv, 2, 1, false);
        let dsv = DescriptorHeap::new(HeapKind::Dsv, 2, 1, false);
        assert_ne!(rtv.handle(0).unwrap().cpu, dsv.handle(0).unwrap().cpu);
    }
}
