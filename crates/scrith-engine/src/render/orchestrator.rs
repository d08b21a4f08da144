use anyhow::{Context, Result, anyhow, bail};
use glam::Vec2;

use crate::config::DemoConfig;
use crate::descriptor::{DescriptorRegistry, DescriptorResource, DescriptorRole, DescriptorTable};
use crate::device::{
    AcquiredFrame, GraphicsContext, ResourceId, ResourceState, SurfaceErrorAction, Transition,
};
use crate::raytracing::RayPath;
use crate::scene::{FlyCamera, SceneConstants, align_constant_buffer};
use crate::time::GameTime;

use super::mesh::{HexMesh, Mesh};
use super::pipelines::{POST_GROUP, Pipelines, Tables, tile_workgroups};
use super::plan::{FrameKind, FramePlan};
use super::recorder::FrameRecorder;
use super::targets::{PostTargets, row_workgroups};

pub const CLEAR_COLOR: wgpu::Color = wgpu::Color {
    r: 0.0,
    g: 0.2,
    b: 0.4,
    a: 1.0,
};

/// Result of [`Renderer::frame`].
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum FrameOutcome {
    Presented {
        /// Back buffer to be used next.
        next_back_buffer: usize,
        fence: u64,
    },
    /// Nothing drawable, or a transient surface error.
    Skipped,
}

/// Bind groups of the current size generation.
struct BindGroups {
    scene: wgpu::BindGroup,
    raster: wgpu::BindGroup,
    tiles: wgpu::BindGroup,
    post: Option<wgpu::BindGroup>,
    blit_post: Option<wgpu::BindGroup>,
    blit_rays: Option<wgpu::BindGroup>,
}

/// Owns every frame-level GPU object and drives one frame at a time.
///
/// Must be dropped before the [`GraphicsContext`] it was created with.
pub struct Renderer {
    registry: DescriptorRegistry,
    tables: Tables,
    pipelines: Pipelines,
    mesh: HexMesh,

    constants: SceneConstants,
    constants_buffer: wgpu::Buffer,

    post_enabled: bool,
    post: Option<PostTargets>,
    rays: Option<RayPath>,
    bind_groups: Option<BindGroups>,
}

impl Renderer {
    pub fn new(gx: &mut GraphicsContext, config: &DemoConfig) -> Result<Self> {
        let mut registry: DescriptorRegistry = DescriptorRegistry::new(gx.gpu.caps().cbv_srv_uav_increment)
            .context("descriptor heap setup failed")?;

        let rays_enabled = config.device.ray_tracing && gx.gpu.caps().ray_query;
        let post_enabled = config.post_processing && gx.swap_chain.supports_copy_src();
        if config.post_processing && !post_enabled {
            log::warn!("post processing disabled: back buffer cannot be copied");
        }

        let device = gx.gpu.device();
        let tables = Tables::new(device);
        let pipelines = Pipelines::new(
            device,
            &tables,
            gx.swap_chain.format(),
            gx.swap_chain.sample_count(),
        );

        let mesh = HexMesh::new(device, &config.scene, rays_enabled)?;
        mesh.write_descriptors(&mut registry);
        gx.tracker
            .register(ResourceId::TileOffsets, ResourceState::GenericRead);
        gx.tracker
            .register(ResourceId::MeshVertices, ResourceState::Common);

        let constants_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("scrith scene constants"),
            size: align_constant_buffer(std::mem::size_of::<SceneConstants>() as u64),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        registry.write(
            DescriptorRole::SceneConstants,
            DescriptorResource::whole_buffer(&constants_buffer),
        );

        let mut constants = SceneConstants::default();
        constants.hex_meta = [
            mesh.vertices_per_instance(),
            config.scene.rings,
            mesh.instance_count(),
            mesh.indices_per_instance(),
        ];
        constants.tile = [
            config.scene.tile_size,
            config.scene.wave_amplitude,
            config.scene.wave_frequency,
            0.0,
        ];
        constants.hex_uv = mesh.field().center_uv();

        let rays = if rays_enabled {
            Some(RayPath::new(&mut gx.gpu, &mesh, &tables.scene, &mut registry)?)
        } else {
            None
        };

        let mut renderer = Self {
            registry,
            tables,
            pipelines,
            mesh,
            constants,
            constants_buffer,
            post_enabled,
            post: None,
            rays,
            bind_groups: None,
        };
        renderer.resize(gx)?;

        log::info!("renderer ready: {:?}", renderer.frame_kind());
        Ok(renderer)
    }

    pub fn frame_kind(&self) -> FrameKind {
        if self.rays.is_some() {
            FrameKind::RayTraced
        } else {
            FrameKind::Raster {
                post: self.post_enabled,
            }
        }
    }

    pub fn mesh(&self) -> &HexMesh {
        &self.mesh
    }

    /// Resizes the swap chain, then every size-dependent target.
    pub fn handle_resize(
        &mut self,
        gx: &mut GraphicsContext,
        size: winit::dpi::PhysicalSize<u32>,
    ) -> Result<()> {
        gx.resize(size)?;
        self.resize(gx)
    }

    /// Recreates size-dependent targets for the current swap chain size,
    /// rewrites their descriptor slots and rebuilds the bind groups.
    pub fn resize(&mut self, gx: &mut GraphicsContext) -> Result<()> {
        let size = gx.swap_chain.size();
        let device = gx.gpu.device();

        self.bind_groups = None;
        self.post = None;
        gx.tracker.forget(ResourceId::PostMap0);
        gx.tracker.forget(ResourceId::PostMap1);

        if let Some(rays) = &mut self.rays {
            rays.resize(device, size, &mut self.registry, &mut gx.tracker);
        }

        if !gx.swap_chain.is_drawable() {
            return Ok(());
        }

        if self.post_enabled {
            let targets = PostTargets::new(device, gx.swap_chain.format(), size);
            targets.publish(&mut self.registry, &mut gx.tracker);
            self.post = Some(targets);
        }

        if let Some(rays) = &mut self.rays {
            rays.rebind(device, &self.registry)?;
        }

        let registry = &self.registry;
        let tables = &self.tables;
        let optional = |enabled: bool, table: &DescriptorTable| -> Result<Option<wgpu::BindGroup>> {
            Ok(if enabled {
                Some(registry.bind_group(device, table)?)
            } else {
                None
            })
        };

        self.bind_groups = Some(BindGroups {
            scene: registry.bind_group(device, &tables.scene)?,
            raster: registry.bind_group(device, &tables.raster)?,
            tiles: registry.bind_group(device, &tables.tiles)?,
            post: optional(self.post.is_some(), &tables.post)?,
            blit_post: optional(self.post.is_some(), &tables.blit_post)?,
            blit_rays: optional(self.rays.is_some(), &tables.blit_rays)?,
        });

        log::debug!("renderer targets rebuilt for {}x{}", size.width, size.height);
        Ok(())
    }

    /// Writes this frame's scene constants and stages recentered tile offsets.
    pub fn update(
        &mut self,
        gx: &GraphicsContext,
        camera: &FlyCamera,
        time: &GameTime,
        mouse: [f32; 4],
    ) {
        let viewport = gx.swap_chain.frame().viewport();

        self.constants
            .set_view_projection(camera.view_projection(viewport.aspect()));
        self.constants.set_time(time);
        self.constants.set_viewport(viewport);
        self.constants
            .set_camera(camera.position, camera.effective_velocity());
        self.constants.mouse = mouse;

        if self.rays.is_none() {
            let xz = Vec2::new(camera.position.x, camera.position.z);
            self.mesh.recenter(gx.gpu.queue(), xz);
        }
        self.constants.hex_uv = self.mesh.field().center_uv();

        gx.gpu
            .queue()
            .write_buffer(&self.constants_buffer, 0, self.constants.as_bytes());
    }

    /// Records, submits and presents one frame, then waits for the GPU.
    pub fn frame(&mut self, gx: &mut GraphicsContext) -> Result<FrameOutcome> {
        let Some(groups) = self.bind_groups.as_ref() else {
            return Ok(FrameOutcome::Skipped);
        };
        if !gx.swap_chain.is_drawable() {
            return Ok(FrameOutcome::Skipped);
        }

        let acquired = match gx.swap_chain.acquire() {
            Ok(frame) => frame,
            Err(e) => {
                return match gx.swap_chain.handle_surface_error(&gx.gpu, e.clone()) {
                    SurfaceErrorAction::Reconfigured | SurfaceErrorAction::SkipFrame => {
                        log::debug!("frame skipped: {e}");
                        Ok(FrameOutcome::Skipped)
                    }
                    SurfaceErrorAction::Fatal => Err(anyhow!("surface error: {e}")),
                };
            }
        };

        let plan = FramePlan::build(self.frame_kind(), acquired.index);
        log::trace!("frame on back buffer {}: {} steps", plan.back_buffer(), plan.steps().len());

        let mut recorder = GpuRecorder {
            r: self,
            groups,
            gx,
            encoder: None,
            frame: Some(acquired),
            next_back_buffer: 0,
            fence: 0,
        };
        plan.record(&mut recorder)?;

        Ok(FrameOutcome::Presented {
            next_back_buffer: recorder.next_back_buffer,
            fence: recorder.fence,
        })
    }
}

const NO_ENCODER: &str = "no open command encoder";
const NO_FRAME: &str = "no acquired back buffer";

/// Records plan steps into one wgpu command encoder.
struct GpuRecorder<'a> {
    r: &'a Renderer,
    groups: &'a BindGroups,
    gx: &'a mut GraphicsContext,

    encoder: Option<wgpu::CommandEncoder>,
    frame: Option<AcquiredFrame>,

    next_back_buffer: usize,
    fence: u64,
}

impl GpuRecorder<'_> {
    fn frame_size(&self) -> Result<winit::dpi::PhysicalSize<u32>> {
        let frame = self.frame.as_ref().context(NO_FRAME)?;
        let size = frame.surface_texture.texture.size();
        Ok(winit::dpi::PhysicalSize::new(size.width, size.height))
    }
}

impl FrameRecorder for GpuRecorder<'_> {
    fn begin(&mut self) -> Result<()> {
        self.encoder = Some(self.gx.gpu.device().create_command_encoder(
            &wgpu::CommandEncoderDescriptor {
                label: Some("scrith frame"),
            },
        ));
        Ok(())
    }

    fn barrier(&mut self, transition: &Transition) -> Result<()> {
        self.gx.tracker.transition(*transition)?;
        Ok(())
    }

    fn raster(&mut self, draw: bool) -> Result<()> {
        let encoder = self.encoder.as_mut().context(NO_ENCODER)?;
        let frame = self.frame.as_ref().context(NO_FRAME)?;
        let sc = &self.gx.swap_chain;
        let depth = sc.depth().context("depth buffer missing")?;
        let rtv = sc
            .rtv_handle(frame.index)
            .context("back buffer has no render target view")?;
        let dsv = sc.dsv_handle().context("depth buffer has no view")?;
        log::trace!("raster into rtv {:#x}, dsv {:#x}", rtv.cpu.0, dsv.cpu.0);

        let (view, resolve_target) = match sc.msaa() {
            Some(msaa) => (&msaa.view, Some(&frame.view)),
            None => (&frame.view, None),
        };

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("scrith raster"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view,
                resolve_target,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(CLEAR_COLOR),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &depth.view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(0),
                    store: wgpu::StoreOp::Store,
                }),
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });

        if !draw {
            return Ok(());
        }

        let vp = sc.frame().viewport();
        let sr = sc.frame().scissor();
        let mesh = &self.r.mesh;

        pass.set_viewport(vp.x, vp.y, vp.width, vp.height, vp.min_depth, vp.max_depth);
        pass.set_scissor_rect(sr.x, sr.y, sr.width, sr.height);
        pass.set_pipeline(&self.r.pipelines.raster);
        pass.set_bind_group(0, &self.groups.scene, &[]);
        pass.set_bind_group(1, &self.groups.raster, &[]);
        pass.set_index_buffer(mesh.index_buffer().slice(..), mesh.index_format());
        pass.draw_indexed(0..mesh.indices_per_instance(), 0, 0..mesh.instance_count());
        Ok(())
    }

    fn upload_tile_offsets(&mut self) -> Result<()> {
        let encoder = self.encoder.as_mut().context(NO_ENCODER)?;
        let mesh = &self.r.mesh;
        encoder.copy_buffer_to_buffer(
            mesh.offsets_staging(),
            0,
            mesh.offsets_buffer(),
            0,
            mesh.offsets_size(),
        );
        Ok(())
    }

    fn dispatch_tiles(&mut self) -> Result<()> {
        let encoder = self.encoder.as_mut().context(NO_ENCODER)?;
        let (x, y, z) = tile_workgroups(self.r.mesh.total_vertices());

        let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some("scrith tiles"),
            timestamp_writes: None,
        });
        pass.set_pipeline(&self.r.pipelines.tiles);
        pass.set_bind_group(0, &self.groups.scene, &[]);
        pass.set_bind_group(1, &self.groups.tiles, &[]);
        pass.dispatch_workgroups(x, y, z);
        Ok(())
    }

    fn copy_back_buffer(&mut self, dst: ResourceId) -> Result<()> {
        let size = self.frame_size()?;
        let target = match dst {
            ResourceId::PostMap0 => &self.r.post.as_ref().context("post targets missing")?.map0,
            other => bail!("back buffer cannot be copied into {other}"),
        };
        let frame = self.frame.as_ref().context(NO_FRAME)?;
        let encoder = self.encoder.as_mut().context(NO_ENCODER)?;

        encoder.copy_texture_to_texture(
            frame.surface_texture.texture.as_image_copy(),
            target.texture.as_image_copy(),
            wgpu::Extent3d {
                width: size.width,
                height: size.height,
                depth_or_array_layers: 1,
            },
        );
        Ok(())
    }

    fn dispatch_post(&mut self) -> Result<()> {
        let size = self.frame_size()?;
        let group = self.groups.post.as_ref().context("post bind group missing")?;
        let encoder = self.encoder.as_mut().context(NO_ENCODER)?;
        let (x, y, z) = row_workgroups(size, POST_GROUP);

        let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some("scrith post"),
            timestamp_writes: None,
        });
        pass.set_pipeline(&self.r.pipelines.post);
        pass.set_bind_group(0, &self.groups.scene, &[]);
        pass.set_bind_group(1, group, &[]);
        pass.dispatch_workgroups(x, y, z);
        Ok(())
    }

    fn dispatch_rays(&mut self) -> Result<()> {
        let size = self.frame_size()?;
        let rays = self.r.rays.as_ref().context("ray path missing")?;
        let encoder = self.encoder.as_mut().context(NO_ENCODER)?;
        rays.dispatch(encoder, &self.groups.scene, size)
    }

    fn write_back_buffer(&mut self, src: ResourceId) -> Result<()> {
        let group = match src {
            ResourceId::PostMap1 => self.groups.blit_post.as_ref(),
            ResourceId::RayOutput => self.groups.blit_rays.as_ref(),
            other => bail!("{other} cannot be written onto the back buffer"),
        }
        .with_context(|| format!("no blit bind group for {src}"))?;

        let frame = self.frame.as_ref().context(NO_FRAME)?;
        let encoder = self.encoder.as_mut().context(NO_ENCODER)?;

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("scrith back buffer write"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &frame.view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });
        pass.set_pipeline(&self.r.pipelines.blit);
        pass.set_bind_group(0, group, &[]);
        pass.draw(0..3, 0..1);
        Ok(())
    }

    fn submit(&mut self) -> Result<()> {
        let encoder = self.encoder.take().context(NO_ENCODER)?;
        self.gx.gpu.submit(encoder.finish());
        Ok(())
    }

    fn present(&mut self) -> Result<()> {
        let frame = self.frame.take().context(NO_FRAME)?;
        self.next_back_buffer = self.gx.swap_chain.present(frame);
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.fence = self.gx.flush()?;
        Ok(())
    }
}
