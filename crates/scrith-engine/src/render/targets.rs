use winit::dpi::PhysicalSize;

use crate::descriptor::{DescriptorRegistry, DescriptorResource, DescriptorRole};
use crate::device::{ResourceId, ResourceState, StateTracker};

/// Format of compute-written targets. Storage textures cannot be sRGB.
pub const STORAGE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

/// A client-sized texture with its default view.
pub struct Target {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
}

impl Target {
    fn new(
        device: &wgpu::Device,
        label: &'static str,
        size: PhysicalSize<u32>,
        format: wgpu::TextureFormat,
        usage: wgpu::TextureUsages,
    ) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width: size.width,
                height: size.height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self { texture, view }
    }

    /// Texture written by a compute pass and read by the back-buffer blit.
    pub fn storage(device: &wgpu::Device, label: &'static str, size: PhysicalSize<u32>) -> Self {
        Self::new(
            device,
            label,
            size,
            STORAGE_FORMAT,
            wgpu::TextureUsages::STORAGE_BINDING | wgpu::TextureUsages::TEXTURE_BINDING,
        )
    }
}

/// The two post-process maps.
///
/// Map 0 receives a copy of the back buffer (same format) and is only sampled;
/// its UAV slot holds the same view but no table binds it. Map 1 is written by
/// the post compute pass.
pub struct PostTargets {
    pub map0: Target,
    pub map1: Target,
    size: PhysicalSize<u32>,
}

impl PostTargets {
    pub fn new(
        device: &wgpu::Device,
        back_buffer_format: wgpu::TextureFormat,
        size: PhysicalSize<u32>,
    ) -> Self {
        let map0 = Target::new(
            device,
            "scrith post map 0",
            size,
            back_buffer_format,
            wgpu::TextureUsages::COPY_DST | wgpu::TextureUsages::TEXTURE_BINDING,
        );
        let map1 = Target::storage(device, "scrith post map 1", size);
        Self { map0, map1, size }
    }

    pub fn size(&self) -> PhysicalSize<u32> {
        self.size
    }

    /// Rewrites the post-map slots and resets their tracked states.
    pub fn publish(&self, registry: &mut DescriptorRegistry, tracker: &mut StateTracker) {
        registry.write(
            DescriptorRole::PostMap0Srv,
            DescriptorResource::TextureView(self.map0.view.clone()),
        );
        registry.write(
            DescriptorRole::PostMap0Uav,
            DescriptorResource::TextureView(self.map0.view.clone()),
        );
        registry.write(
            DescriptorRole::PostMap1Srv,
            DescriptorResource::TextureView(self.map1.view.clone()),
        );
        registry.write(
            DescriptorRole::PostMap1Uav,
            DescriptorResource::TextureView(self.map1.view.clone()),
        );
        tracker.register(ResourceId::PostMap0, ResourceState::GenericRead);
        tracker.register(ResourceId::PostMap1, ResourceState::GenericRead);
    }
}

/// Work groups for a pass with `group` threads along x and one row per group in y.
pub fn row_workgroups(size: PhysicalSize<u32>, group: u32) -> (u32, u32, u32) {
    (size.width.div_ceil(group), size.height, 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_are_split_into_256_wide_groups() {
        assert_eq!(row_workgroups(PhysicalSize::new(1280, 720), 256), (5, 720, 1));
        assert_eq!(row_workgroups(PhysicalSize::new(257, 1), 256), (2, 1, 1));
        assert_eq!(row_workgroups(PhysicalSize::new(1, 1), 256), (1, 1, 1));
    }
}
