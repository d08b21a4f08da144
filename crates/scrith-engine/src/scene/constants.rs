use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};

use crate::device::Viewport;
use crate::time::GameTime;

/// Constant buffers are bound at 256-byte granularity.
pub const CONSTANT_BUFFER_ALIGNMENT: u64 = 256;

/// Rounds `size` up to the next multiple of 256.
pub const fn align_constant_buffer(size: u64) -> u64 {
    (size + (CONSTANT_BUFFER_ALIGNMENT - 1)) & !(CONSTANT_BUFFER_ALIGNMENT - 1)
}

/// Per-frame scene constants, rewritten wholesale every frame.
///
/// Layout matches `SceneConstants` in the WGSL sources.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct SceneConstants {
    /// Projection * view (column-major).
    pub wvp: [[f32; 4]; 4],
    /// x total seconds, y delta seconds, z average fps since start, w fps over the last second.
    pub time: [f32; 4],
    /// x, y top-left; z width; w height.
    pub viewport: [f32; 4],
    /// x, y pointer position; z button mask; w wheel.
    pub mouse: [f32; 4],
    /// x, z world center of the tile field; q, r axial center.
    pub hex_uv: [f32; 4],
    pub cam_pos: [f32; 4],
    pub cam_velo: [f32; 4],
    /// Inverse of `wvp`, for reconstructing rays from screen positions.
    pub wvp_inv: [[f32; 4]; 4],
    /// x vertices per tile, y rings, z instances, w indices per tile.
    pub hex_meta: [u32; 4],
    /// x tile size, y wave amplitude, z wave frequency.
    pub tile: [f32; 4],
}

impl Default for SceneConstants {
    fn default() -> Self {
        Self {
            wvp: Mat4::IDENTITY.to_cols_array_2d(),
            wvp_inv: Mat4::IDENTITY.to_cols_array_2d(),
            ..Zeroable::zeroed()
        }
    }
}

impl SceneConstants {
    pub fn set_view_projection(&mut self, wvp: Mat4) {
        self.wvp = wvp.to_cols_array_2d();
        self.wvp_inv = wvp.inverse().to_cols_array_2d();
    }

    pub fn set_time(&mut self, t: &GameTime) {
        self.time = [t.total, t.delta, t.fps_total, t.fps];
    }

    pub fn set_viewport(&mut self, vp: Viewport) {
        self.viewport = [vp.x, vp.y, vp.width, vp.height];
    }

    pub fn set_camera(&mut self, position: Vec3, velocity: Vec3) {
        self.cam_pos = position.extend(1.0).to_array();
        self.cam_velo = velocity.extend(0.0).to_array();
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constants_fill_exactly_one_aligned_block() {
        assert_eq!(std::mem::size_of::<SceneConstants>(), 256);
        assert_eq!(
            align_constant_buffer(std::mem::size_of::<SceneConstants>() as u64),
            256
        );
    }

    #[test]
    fn field_offsets_follow_wire_order() {
        use std::mem::offset_of;

        assert_eq!(offset_of!(SceneConstants, wvp), 0);
        assert_eq!(offset_of!(SceneConstants, time), 64);
        assert_eq!(offset_of!(SceneConstants, viewport), 80);
        assert_eq!(offset_of!(SceneConstants, mouse), 96);
        assert_eq!(offset_of!(SceneConstants, hex_uv), 112);
        assert_eq!(offset_of!(SceneConstants, cam_pos), 128);
        assert_eq!(offset_of!(SceneConstants, cam_velo), 144);
        assert_eq!(offset_of!(SceneConstants, wvp_inv), 160);
        assert_eq!(offset_of!(SceneConstants, hex_meta), 224);
        assert_eq!(offset_of!(SceneConstants, tile), 240);
    }

    #[test]
    fn alignment_rounds_up_to_256() {
        assert_eq!(align_constant_buffer(0), 0);
        assert_eq!(align_constant_buffer(1), 256);
        assert_eq!(align_constant_buffer(256), 256);
        assert_eq!(align_constant_buffer(257), 512);
    }

    #[test]
    fn default_matrix_is_identity() {
        let c = SceneConstants::default();
        assert_eq!(Mat4::from_cols_array_2d(&c.wvp), Mat4::IDENTITY);
        assert_eq!(c.time, [0.0; 4]);
    }

    #[test]
    fn view_projection_stores_inverse() {
        let mut c = SceneConstants::default();
        let m = Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0));
        c.set_view_projection(m);
        let product = Mat4::from_cols_array_2d(&c.wvp) * Mat4::from_cols_array_2d(&c.wvp_inv);
        assert!(product.abs_diff_eq(Mat4::IDENTITY, 1e-5));
    }
}
