use crate::descriptor::{DescriptorRole, DescriptorTable, TableEntry};
use crate::device::DEPTH_FORMAT;

use super::targets::STORAGE_FORMAT;

/// Threads per tile compute workgroup.
pub const TILE_GROUP: u32 = 64;
/// Threads per post compute workgroup (x only).
pub const POST_GROUP: u32 = 256;

const MAX_GROUPS_PER_DIM: u32 = 65_535;

pub(crate) const COMMON_WGSL: &str = include_str!("shaders/common.wgsl");

/// Builds a shader module from the shared declarations plus `body`.
///
/// `prelude` lands before the shared block (for `enable` directives).
pub(crate) fn shader_module(
    device: &wgpu::Device,
    label: &'static str,
    prelude: &str,
    body: &str,
) -> wgpu::ShaderModule {
    let source = format!("{prelude}\n{COMMON_WGSL}\n{body}");
    device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(label),
        source: wgpu::ShaderSource::Wgsl(source.into()),
    })
}

// ── tables ────────────────────────────────────────────────────────────────

fn uniform() -> wgpu::BindingType {
    wgpu::BindingType::Buffer {
        ty: wgpu::BufferBindingType::Uniform,
        has_dynamic_offset: false,
        min_binding_size: None,
    }
}

fn storage(read_only: bool) -> wgpu::BindingType {
    wgpu::BindingType::Buffer {
        ty: wgpu::BufferBindingType::Storage { read_only },
        has_dynamic_offset: false,
        min_binding_size: None,
    }
}

fn sampled_texture() -> wgpu::BindingType {
    wgpu::BindingType::Texture {
        sample_type: wgpu::TextureSampleType::Float { filterable: false },
        view_dimension: wgpu::TextureViewDimension::D2,
        multisampled: false,
    }
}

fn storage_texture() -> wgpu::BindingType {
    wgpu::BindingType::StorageTexture {
        access: wgpu::StorageTextureAccess::WriteOnly,
        format: STORAGE_FORMAT,
        view_dimension: wgpu::TextureViewDimension::D2,
    }
}

/// Descriptor tables of the raster path (the root signature, in bind groups).
pub struct Tables {
    /// Group 0 everywhere except the blit.
    pub scene: DescriptorTable,
    pub raster: DescriptorTable,
    pub tiles: DescriptorTable,
    pub post: DescriptorTable,
    pub blit_post: DescriptorTable,
    pub blit_rays: DescriptorTable,
}

impl Tables {
    pub fn new(device: &wgpu::Device) -> Self {
        let scene = DescriptorTable::new(
            device,
            "scrith scene table",
            wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT | wgpu::ShaderStages::COMPUTE,
            &[TableEntry {
                role: DescriptorRole::SceneConstants,
                ty: uniform(),
            }],
        );

        let raster = DescriptorTable::new(
            device,
            "scrith raster table",
            wgpu::ShaderStages::VERTEX,
            &[TableEntry {
                role: DescriptorRole::MeshVertexSrv,
                ty: storage(true),
            }],
        );

        let tiles = DescriptorTable::new(
            device,
            "scrith tiles table",
            wgpu::ShaderStages::COMPUTE,
            &[
                TableEntry {
                    role: DescriptorRole::TileOffsetsSrv,
                    ty: storage(true),
                },
                TableEntry {
                    role: DescriptorRole::MeshBaseSrv,
                    ty: storage(true),
                },
                TableEntry {
                    role: DescriptorRole::MeshVertexUav,
                    ty: storage(false),
                },
            ],
        );

        let post = DescriptorTable::new(
            device,
            "scrith post table",
            wgpu::ShaderStages::COMPUTE,
            &[
                TableEntry {
                    role: DescriptorRole::PostMap0Srv,
                    ty: sampled_texture(),
                },
                TableEntry {
                    role: DescriptorRole::PostMap1Uav,
                    ty: storage_texture(),
                },
            ],
        );

        let blit_post = DescriptorTable::new(
            device,
            "scrith blit table",
            wgpu::ShaderStages::FRAGMENT,
            &[TableEntry {
                role: DescriptorRole::PostMap1Srv,
                ty: sampled_texture(),
            }],
        );
        let blit_rays = blit_post.with_roles("scrith ray blit table", &[DescriptorRole::RayOutputSrv]);

        Self {
            scene,
            raster,
            tiles,
            post,
            blit_post,
            blit_rays,
        }
    }
}

// ── pipelines ─────────────────────────────────────────────────────────────

/// Pipeline state objects of the raster path.
pub struct Pipelines {
    pub raster: wgpu::RenderPipeline,
    pub tiles: wgpu::ComputePipeline,
    pub post: wgpu::ComputePipeline,
    pub blit: wgpu::RenderPipeline,
}

impl Pipelines {
    pub fn new(
        device: &wgpu::Device,
        tables: &Tables,
        color_format: wgpu::TextureFormat,
        sample_count: u32,
    ) -> Self {
        let pipelines = Self {
            raster: raster_pipeline(device, tables, color_format, sample_count),
            tiles: compute_pipeline(
                device,
                "scrith tiles",
                include_str!("shaders/tiles.wgsl"),
                &[tables.scene.layout(), tables.tiles.layout()],
            ),
            post: compute_pipeline(
                device,
                "scrith post",
                include_str!("shaders/post.wgsl"),
                &[tables.scene.layout(), tables.post.layout()],
            ),
            blit: blit_pipeline(device, tables, color_format),
        };
        log::debug!("pipelines created for {color_format:?} ({sample_count}x)");
        pipelines
    }
}

fn raster_pipeline(
    device: &wgpu::Device,
    tables: &Tables,
    color_format: wgpu::TextureFormat,
    sample_count: u32,
) -> wgpu::RenderPipeline {
    let shader = shader_module(device, "scrith scene shader", "", include_str!("shaders/scene.wgsl"));

    let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("scrith raster pipeline layout"),
        bind_group_layouts: &[tables.scene.layout(), tables.raster.layout()],
        immediate_size: 0,
    });

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("scrith raster pipeline"),
        layout: Some(&layout),

        // Vertices are pulled from storage by index.
        vertex: wgpu::VertexState {
            module: &shader,
            entry_point: Some("vs_main"),
            compilation_options: Default::default(),
            buffers: &[],
        },

        fragment: Some(wgpu::FragmentState {
            module: &shader,
            entry_point: Some("fs_main"),
            compilation_options: Default::default(),
            targets: &[Some(wgpu::ColorTargetState {
                format: color_format,
                blend: None,
                write_mask: wgpu::ColorWrites::ALL,
            })],
        }),

        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: None,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },

        depth_stencil: Some(wgpu::DepthStencilState {
            format: DEPTH_FORMAT,
            depth_write_enabled: true,
            depth_compare: wgpu::CompareFunction::Less,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }),
        multisample: wgpu::MultisampleState {
            count: sample_count,
            mask: !0,
            alpha_to_coverage_enabled: false,
        },

        multiview_mask: None,
        cache: None,
    })
}

fn blit_pipeline(
    device: &wgpu::Device,
    tables: &Tables,
    color_format: wgpu::TextureFormat,
) -> wgpu::RenderPipeline {
    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("scrith blit shader"),
        source: wgpu::ShaderSource::Wgsl(include_str!("shaders/blit.wgsl").into()),
    });

    let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("scrith blit pipeline layout"),
        bind_group_layouts: &[tables.blit_post.layout()],
        immediate_size: 0,
    });

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("scrith blit pipeline"),
        layout: Some(&layout),
        vertex: wgpu::VertexState {
            module: &shader,
            entry_point: Some("vs_main"),
            compilation_options: Default::default(),
            buffers: &[],
        },
        fragment: Some(wgpu::FragmentState {
            module: &shader,
            entry_point: Some("fs_main"),
            compilation_options: Default::default(),
            targets: &[Some(wgpu::ColorTargetState {
                format: color_format,
                blend: None,
                write_mask: wgpu::ColorWrites::ALL,
            })],
        }),
        primitive: wgpu::PrimitiveState::default(),
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        multiview_mask: None,
        cache: None,
    })
}

pub(crate) fn compute_pipeline(
    device: &wgpu::Device,
    label: &'static str,
    body: &str,
    layouts: &[&wgpu::BindGroupLayout],
) -> wgpu::ComputePipeline {
    compute_pipeline_with_prelude(device, label, "", body, layouts)
}

pub(crate) fn compute_pipeline_with_prelude(
    device: &wgpu::Device,
    label: &'static str,
    prelude: &str,
    body: &str,
    layouts: &[&wgpu::BindGroupLayout],
) -> wgpu::ComputePipeline {
    let shader = shader_module(device, label, prelude, body);

    let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some(label),
        bind_group_layouts: layouts,
        immediate_size: 0,
    });

    device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
        label: Some(label),
        layout: Some(&layout),
        module: &shader,
        entry_point: Some("cs_main"),
        compilation_options: Default::default(),
        cache: None,
    })
}

/// Work groups covering `threads` invocations of the tile pass.
///
/// Spills into y when x would exceed the per-dimension limit; the shader
/// linearizes with the group count.
pub fn tile_workgroups(threads: u32) -> (u32, u32, u32) {
    let groups = threads.div_ceil(TILE_GROUP).max(1);
    if groups <= MAX_GROUPS_PER_DIM {
        (groups, 1, 1)
    } else {
        (MAX_GROUPS_PER_DIM, groups.div_ceil(MAX_GROUPS_PER_DIM), 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tile_groups_cover_every_vertex() {
        assert_eq!(tile_workgroups(64), (1, 1, 1));
        assert_eq!(tile_workgroups(65), (2, 1, 1));
        assert_eq!(tile_workgroups(0), (1, 1, 1));

        let threads = 49_537 * 247;
        let (x, y, _) = tile_workgroups(threads);
        assert!(x <= MAX_GROUPS_PER_DIM);
        assert!(x * y * TILE_GROUP >= threads);
    }

    #[test]
    fn shared_block_declares_scene_constants() {
        assert!(COMMON_WGSL.contains("struct SceneConstants"));
        assert!(COMMON_WGSL.contains("hex_meta: vec4<u32>"));
    }
}
