use std::num::NonZeroU64;

use super::heap::{DescriptorHandle, DescriptorHeap, HeapKind};
use super::role::DescriptorRole;
use super::DescriptorError;

/// Resource view stored in a heap slot.
#[derive(Debug, Clone)]
pub enum DescriptorResource {
    Buffer {
        buffer: wgpu::Buffer,
        offset: u64,
        size: Option<NonZeroU64>,
    },
    TextureView(wgpu::TextureView),
}

impl DescriptorResource {
    pub fn whole_buffer(buffer: &wgpu::Buffer) -> Self {
        DescriptorResource::Buffer {
            buffer: buffer.clone(),
            offset: 0,
            size: None,
        }
    }

    pub fn binding(&self) -> wgpu::BindingResource<'_> {
        match self {
            DescriptorResource::Buffer {
                buffer,
                offset,
                size,
            } => wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                buffer,
                offset: *offset,
                size: *size,
            }),
            DescriptorResource::TextureView(view) => wgpu::BindingResource::TextureView(view),
        }
    }
}

/// One entry of a descriptor table: a role viewed as a particular binding type.
#[derive(Debug, Clone, Copy)]
pub struct TableEntry {
    pub role: DescriptorRole,
    pub ty: wgpu::BindingType,
}

/// A contiguous set of roles bound together (one bind group).
///
/// Binding numbers follow entry order.
#[derive(Debug)]
pub struct DescriptorTable {
    label: &'static str,
    entries: Vec<TableEntry>,
    layout: wgpu::BindGroupLayout,
}

impl DescriptorTable {
    pub fn new(
        device: &wgpu::Device,
        label: &'static str,
        visibility: wgpu::ShaderStages,
        entries: &[TableEntry],
    ) -> Self {
        let layout_entries: Vec<wgpu::BindGroupLayoutEntry> = entries
            .iter()
            .enumerate()
            .map(|(i, e)| wgpu::BindGroupLayoutEntry {
                binding: i as u32,
                visibility,
                ty: e.ty,
                count: None,
            })
            .collect();

        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some(label),
            entries: &layout_entries,
        });

        Self {
            label,
            entries: entries.to_vec(),
            layout,
        }
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    pub fn layout(&self) -> &wgpu::BindGroupLayout {
        &self.layout
    }

    pub fn roles(&self) -> impl Iterator<Item = DescriptorRole> + '_ {
        self.entries.iter().map(|e| e.role)
    }

    /// Same layout bound to different roles, entry for entry.
    pub fn with_roles(&self, label: &'static str, roles: &[DescriptorRole]) -> Self {
        debug_assert_eq!(roles.len(), self.entries.len());
        let entries = self
            .entries
            .iter()
            .zip(roles)
            .map(|(e, role)| TableEntry { role: *role, ty: e.ty })
            .collect();

        Self {
            label,
            entries,
            layout: self.layout.clone(),
        }
    }
}

/// Shader-visible heap with one slot per [`DescriptorRole`].
///
/// Handles are computed once when the registry is created; rewriting a slot
/// (for example after a resize) replaces the view but keeps the handles.
/// Slots hold `R`, a [`DescriptorResource`] everywhere except in tests.
#[derive(Debug)]
pub struct DescriptorRegistry<R = DescriptorResource> {
    heap: DescriptorHeap,
    handles: [DescriptorHandle; DescriptorRole::COUNT],
    slots: [Option<R>; DescriptorRole::COUNT],
    revisions: [u32; DescriptorRole::COUNT],
}

impl<R> DescriptorRegistry<R> {
    pub fn new(increment: u32) -> Result<Self, DescriptorError> {
        let heap = DescriptorHeap::new(
            HeapKind::CbvSrvUav,
            DescriptorRole::COUNT as u32,
            increment,
            true,
        );

        let mut handles = [DescriptorHandle {
            index: 0,
            cpu: heap.cpu_start(),
            gpu: heap.gpu_start(),
        }; DescriptorRole::COUNT];
        for role in DescriptorRole::ALL {
            handles[role.index()] = heap.handle(role.index() as u32)?;
        }

        Ok(Self {
            heap,
            handles,
            slots: Default::default(),
            revisions: [0; DescriptorRole::COUNT],
        })
    }

    pub fn heap(&self) -> &DescriptorHeap {
        &self.heap
    }

    /// CPU/GPU handle pair of `role`.
    pub fn handle(&self, role: DescriptorRole) -> DescriptorHandle {
        self.handles[role.index()]
    }

    /// Writes (or rewrites) the view stored for `role`.
    pub fn write(&mut self, role: DescriptorRole, resource: R) {
        let slot = role.index();
        self.slots[slot] = Some(resource);
        self.revisions[slot] = self.revisions[slot].wrapping_add(1);
        log::trace!("descriptor `{}` written (rev {})", role.label(), self.revisions[slot]);
    }

    pub fn resource(&self, role: DescriptorRole) -> Option<&R> {
        self.slots[role.index()].as_ref()
    }

    /// How many times `role` has been written.
    pub fn revision(&self, role: DescriptorRole) -> u32 {
        self.revisions[role.index()]
    }
}

impl DescriptorRegistry {
    pub fn binding_resource(
        &self,
        role: DescriptorRole,
    ) -> Result<wgpu::BindingResource<'_>, DescriptorError> {
        self.resource(role)
            .map(DescriptorResource::binding)
            .ok_or(DescriptorError::EmptySlot(role))
    }

    /// Creates the bind group for `table` from the current slot contents.
    pub fn bind_group(
        &self,
        device: &wgpu::Device,
        table: &DescriptorTable,
    ) -> Result<wgpu::BindGroup, DescriptorError> {
        let entries = table
            .roles()
            .enumerate()
            .map(|(i, role)| {
                Ok(wgpu::BindGroupEntry {
                    binding: i as u32,
                    resource: self.binding_resource(role)?,
                })
            })
            .collect::<Result<Vec<_>, DescriptorError>>()?;

        Ok(device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(table.label()),
            layout: table.layout(),
            entries: &entries,
        }))
    }
}
