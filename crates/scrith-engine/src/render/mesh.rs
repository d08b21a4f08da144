use anyhow::{Result, bail};
use glam::Vec2;
use wgpu::util::DeviceExt;

use crate::config::SceneConfig;
use crate::descriptor::{DescriptorRegistry, DescriptorResource, DescriptorRole};
use crate::scene::{HexGeometry, TILE_VERTEX_STRIDE, TileField, TileOffset};

/// GPU geometry drawn with one indexed instanced call.
pub trait Mesh {
    /// Vertex storage for every instance, `vertices_per_instance` apart.
    fn vertex_buffer(&self) -> &wgpu::Buffer;
    /// Indices of one instance.
    fn index_buffer(&self) -> &wgpu::Buffer;

    fn index_format(&self) -> wgpu::IndexFormat {
        wgpu::IndexFormat::Uint32
    }

    fn vertices_per_instance(&self) -> u32;
    fn indices_per_instance(&self) -> u32;
    fn instance_count(&self) -> u32;

    fn total_vertices(&self) -> u32 {
        self.vertices_per_instance() * self.instance_count()
    }
}

/// The hex tile floor: a replicated vertex block per tile plus the per-tile offsets.
pub struct HexMesh {
    geometry: HexGeometry,
    field: TileField,

    vertices: wgpu::Buffer,
    base: wgpu::Buffer,
    indices: wgpu::Buffer,
    /// All tiles' indices, for acceleration structure builds.
    blas_indices: Option<wgpu::Buffer>,

    offsets: wgpu::Buffer,
    offsets_staging: wgpu::Buffer,
}

impl HexMesh {
    /// Uploads the tile geometry. `blas_input` adds the usages needed to build
    /// acceleration structures from it.
    ///
    /// Fails when the replicated vertex storage does not fit the device limits.
    pub fn new(device: &wgpu::Device, scene: &SceneConfig, blas_input: bool) -> Result<Self> {
        let geometry = HexGeometry::build(scene.tile_size, scene.subdivision);
        let field = TileField::new(scene.rings, scene.tile_size);
        check_vertex_storage(&geometry, field.len(), &device.limits())?;

        let mut vertex_usage = wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::VERTEX;
        if blas_input {
            vertex_usage |= wgpu::BufferUsages::BLAS_INPUT;
        }

        let vertices = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("scrith tile vertices"),
            contents: bytemuck::cast_slice(&geometry.instance_vertices(&field)),
            usage: vertex_usage,
        });

        let base = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("scrith tile base"),
            contents: bytemuck::cast_slice(&base_positions(&geometry)),
            usage: wgpu::BufferUsages::STORAGE,
        });

        let indices = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("scrith tile indices"),
            contents: bytemuck::cast_slice(&geometry.indices),
            usage: wgpu::BufferUsages::INDEX,
        });

        let blas_indices = blas_input.then(|| {
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("scrith blas indices"),
                contents: bytemuck::cast_slice(&geometry.instance_indices(field.len())),
                usage: wgpu::BufferUsages::INDEX | wgpu::BufferUsages::BLAS_INPUT,
            })
        });

        let initial = field.offsets();
        let offsets = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("scrith tile offsets"),
            contents: bytemuck::cast_slice(&initial),
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
        });
        let offsets_staging = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("scrith tile offsets staging"),
            contents: bytemuck::cast_slice(&initial),
            usage: wgpu::BufferUsages::COPY_SRC | wgpu::BufferUsages::COPY_DST,
        });

        log::info!(
            "tile mesh: {} tiles x {} vertices ({} rings)",
            field.len(),
            geometry.vertex_count(),
            scene.rings
        );

        Ok(Self {
            geometry,
            field,
            vertices,
            base,
            indices,
            blas_indices,
            offsets,
            offsets_staging,
        })
    }

    pub fn field(&self) -> &TileField {
        &self.field
    }

    pub fn blas_indices(&self) -> Option<&wgpu::Buffer> {
        self.blas_indices.as_ref()
    }

    /// Index count over all tiles.
    pub fn total_indices(&self) -> u32 {
        self.geometry.index_count() * self.instance_count()
    }

    pub fn offsets_buffer(&self) -> &wgpu::Buffer {
        &self.offsets
    }

    pub fn offsets_staging(&self) -> &wgpu::Buffer {
        &self.offsets_staging
    }

    pub fn offsets_size(&self) -> u64 {
        (self.field.len() * std::mem::size_of::<TileOffset>()) as u64
    }

    /// Recenters the field under `camera_xz` and stages the new offsets.
    ///
    /// The copy into the bound offsets buffer is recorded by the frame.
    pub fn recenter(&mut self, queue: &wgpu::Queue, camera_xz: Vec2) -> usize {
        let wrapped = self.field.recenter_world(camera_xz);
        if wrapped > 0 {
            log::trace!("recentered on {:?}: {wrapped} tiles wrapped", self.field.center());
        }
        queue.write_buffer(
            &self.offsets_staging,
            0,
            bytemuck::cast_slice(&self.field.offsets()),
        );
        wrapped
    }

    pub fn write_descriptors(&self, registry: &mut DescriptorRegistry) {
        registry.write(
            DescriptorRole::TileOffsetsSrv,
            DescriptorResource::whole_buffer(&self.offsets),
        );
        registry.write(
            DescriptorRole::MeshVertexUav,
            DescriptorResource::whole_buffer(&self.vertices),
        );
        registry.write(
            DescriptorRole::MeshVertexSrv,
            DescriptorResource::whole_buffer(&self.vertices),
        );
        registry.write(
            DescriptorRole::MeshBaseSrv,
            DescriptorResource::whole_buffer(&self.base),
        );
    }
}

impl Mesh for HexMesh {
    fn vertex_buffer(&self) -> &wgpu::Buffer {
        &self.vertices
    }

    fn index_buffer(&self) -> &wgpu::Buffer {
        &self.indices
    }

    fn vertices_per_instance(&self) -> u32 {
        self.geometry.vertex_count()
    }

    fn indices_per_instance(&self) -> u32 {
        self.geometry.index_count()
    }

    fn instance_count(&self) -> u32 {
        self.field.len() as u32
    }
}

/// Bytes of vertex storage for `tiles` copies of `geometry`.
fn vertex_storage_bytes(geometry: &HexGeometry, tiles: usize) -> u64 {
    u64::from(geometry.vertex_count()) * tiles as u64 * TILE_VERTEX_STRIDE
}

/// The vertex storage is bound whole, so it must fit one storage binding.
fn check_vertex_storage(geometry: &HexGeometry, tiles: usize, limits: &wgpu::Limits) -> Result<()> {
    let bytes = vertex_storage_bytes(geometry, tiles);
    let max = u64::from(limits.max_storage_buffer_binding_size).min(limits.max_buffer_size);
    if bytes > max {
        bail!(
            "{tiles} tiles of {} vertices need {bytes} bytes of vertex storage, \
             device allows {max}; lower the ring count or subdivision",
            geometry.vertex_count()
        );
    }
    Ok(())
}

/// Positions of one tile, padded to `vec4` for storage buffers.
fn base_positions(geometry: &HexGeometry) -> Vec<[f32; 4]> {
    geometry
        .positions
        .iter()
        .map(|p| [p.x, p.y, p.z, 1.0])
        .collect()
}
