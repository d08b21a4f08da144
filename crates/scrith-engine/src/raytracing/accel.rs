use anyhow::{Context, Result, anyhow};

use crate::device::Gpu;
use crate::render::{HexMesh, Mesh};
use crate::scene::TILE_VERTEX_STRIDE;

const IDENTITY_3X4: [f32; 12] = [
    1.0, 0.0, 0.0, 0.0, //
    0.0, 1.0, 0.0, 0.0, //
    0.0, 0.0, 1.0, 0.0,
];

/// Bottom-level structure over the tile floor and a one-instance top level.
///
/// Built once at startup from the initial vertex positions. The TLAS instance
/// holds the BLAS.
pub struct AccelerationStructures {
    tlas: wgpu::Tlas,
}

impl AccelerationStructures {
    /// Records the build in its own submission and waits for it.
    pub fn build(gpu: &mut Gpu, mesh: &HexMesh) -> Result<Self> {
        let indices = mesh
            .blas_indices()
            .ok_or_else(|| anyhow!("tile mesh was created without acceleration structure inputs"))?;
        let device = gpu.device();

        let size = wgpu::BlasTriangleGeometrySizeDescriptor {
            vertex_format: wgpu::VertexFormat::Float32x3,
            vertex_count: mesh.total_vertices(),
            index_format: Some(wgpu::IndexFormat::Uint32),
            index_count: Some(mesh.total_indices()),
            flags: wgpu::AccelerationStructureGeometryFlags::OPAQUE,
        };

        let blas = device.create_blas(
            &wgpu::CreateBlasDescriptor {
                label: Some("scrith floor blas"),
                flags: wgpu::AccelerationStructureFlags::PREFER_FAST_TRACE,
                update_mode: wgpu::AccelerationStructureUpdateMode::Build,
            },
            wgpu::BlasGeometrySizeDescriptors::Triangles {
                descriptors: vec![size.clone()],
            },
        );

        let mut tlas = device.create_tlas(&wgpu::CreateTlasDescriptor {
            label: Some("scrith floor tlas"),
            max_instances: 1,
            flags: wgpu::AccelerationStructureFlags::PREFER_FAST_TRACE,
            update_mode: wgpu::AccelerationStructureUpdateMode::Build,
        });
        tlas[0] = Some(wgpu::TlasInstance::new(&blas, IDENTITY_3X4, 0, 0xff));

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("scrith acceleration build"),
        });
        encoder.build_acceleration_structures(
            std::iter::once(&wgpu::BlasBuildEntry {
                blas: &blas,
                geometry: wgpu::BlasGeometries::TriangleGeometries(vec![
                    wgpu::BlasTriangleGeometry {
                        size: &size,
                        vertex_buffer: mesh.vertex_buffer(),
                        first_vertex: 0,
                        vertex_stride: TILE_VERTEX_STRIDE,
                        index_buffer: Some(indices),
                        first_index: Some(0),
                        transform_buffer: None,
                        transform_buffer_offset: None,
                    },
                ]),
            }),
            std::iter::once(&tlas),
        );
        gpu.submit(encoder.finish());
        gpu.flush().context("acceleration structure build did not complete")?;

        let triangles = mesh.total_indices() / 3;
        log::info!("acceleration structures built: {triangles} triangles");

        Ok(Self { tlas })
    }

    pub fn tlas(&self) -> &wgpu::Tlas {
        &self.tlas
    }
}
