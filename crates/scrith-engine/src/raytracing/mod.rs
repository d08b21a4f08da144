//! Optional ray-traced path.
//!
//! Uses inline ray queries from a compute pass: a BLAS over the tile floor, a
//! one-instance TLAS and three single-record shader tables, all built once.
//! The path only exists when the device granted ray queries and it was enabled.

mod accel;
mod shader_table;

use anyhow::{Context, Result};
use winit::dpi::PhysicalSize;

use crate::descriptor::{DescriptorRegistry, DescriptorResource, DescriptorRole, DescriptorTable};
use crate::device::{Gpu, ResourceId, ResourceState, StateTracker};
use crate::render::{HexMesh, Target, compute_pipeline_with_prelude};

pub use accel::AccelerationStructures;
pub use shader_table::{
    RECORD_ALIGNMENT, RECORD_SIZE, Region, ShaderKind, ShaderRecord, ShaderTables, TABLE_ALIGNMENT,
};

/// Threads per ray workgroup along each axis.
pub const RAY_GROUP: u32 = 8;

const RAY_QUERY_ENABLE: &str = "enable wgpu_ray_query;";

pub struct RayPath {
    accel: AccelerationStructures,
    layout: wgpu::BindGroupLayout,
    pipeline: wgpu::ComputePipeline,

    output: Option<Target>,
    bind_group: Option<wgpu::BindGroup>,
}

impl RayPath {
    /// Builds acceleration structures and shader tables and publishes the
    /// shader-table slot.
    pub fn new(
        gpu: &mut Gpu,
        mesh: &HexMesh,
        scene_table: &DescriptorTable,
        registry: &mut DescriptorRegistry,
    ) -> Result<Self> {
        let accel = AccelerationStructures::build(gpu, mesh)
            .context("failed to build acceleration structures")?;

        let device = gpu.device();
        let tables = ShaderTables::default();
        registry.write(
            DescriptorRole::ShaderTables,
            DescriptorResource::whole_buffer(&tables.upload(device)),
        );

        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("scrith ray table"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::StorageTexture {
                        access: wgpu::StorageTextureAccess::WriteOnly,
                        format: crate::render::STORAGE_FORMAT,
                        view_dimension: wgpu::TextureViewDimension::D2,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::AccelerationStructure {
                        vertex_return: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
            ],
        });

        let pipeline = compute_pipeline_with_prelude(
            device,
            "scrith rays",
            RAY_QUERY_ENABLE,
            include_str!("shaders/rays.wgsl"),
            &[scene_table.layout(), &layout],
        );

        Ok(Self {
            accel,
            layout,
            pipeline,
            output: None,
            bind_group: None,
        })
    }

    /// Recreates the output texture for `size` and republishes its slots.
    pub fn resize(
        &mut self,
        device: &wgpu::Device,
        size: PhysicalSize<u32>,
        registry: &mut DescriptorRegistry,
        tracker: &mut StateTracker,
    ) {
        self.bind_group = None;
        self.output = None;
        tracker.forget(ResourceId::RayOutput);
        if size.width == 0 || size.height == 0 {
            return;
        }

        let output = Target::storage(device, "scrith ray output", size);
        registry.write(
            DescriptorRole::RayOutputUav,
            DescriptorResource::TextureView(output.view.clone()),
        );
        registry.write(
            DescriptorRole::RayOutputSrv,
            DescriptorResource::TextureView(output.view.clone()),
        );
        tracker.register(ResourceId::RayOutput, ResourceState::UnorderedAccess);
        self.output = Some(output);
    }

    /// Rebuilds the ray bind group from the current registry slots.
    pub fn rebind(&mut self, device: &wgpu::Device, registry: &DescriptorRegistry) -> Result<()> {
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("scrith ray bind group"),
            layout: &self.layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: registry.binding_resource(DescriptorRole::RayOutputUav)?,
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::AccelerationStructure(self.accel.tlas()),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: registry.binding_resource(DescriptorRole::ShaderTables)?,
                },
            ],
        });
        self.bind_group = Some(bind_group);
        Ok(())
    }

    /// Records one ray dispatch over `size`.
    pub fn dispatch(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        scene: &wgpu::BindGroup,
        size: PhysicalSize<u32>,
    ) -> Result<()> {
        let bind_group = self
            .bind_group
            .as_ref()
            .context("ray bind group used before resize")?;

        let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some("scrith rays"),
            timestamp_writes: None,
        });
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, scene, &[]);
        pass.set_bind_group(1, bind_group, &[]);
        pass.dispatch_workgroups(
            size.width.div_ceil(RAY_GROUP),
            size.height.div_ceil(RAY_GROUP),
            1,
        );
        Ok(())
    }
}
