/// Number of back buffers presented in round-robin.
pub const BUFFER_COUNT: usize = 2;

/// Rasterizer viewport in physical pixels.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Viewport {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub min_depth: f32,
    pub max_depth: f32,
}

impl Viewport {
    /// Full-window viewport with the standard [0, 1] depth range.
    pub fn full(width: u32, height: u32) -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width: width as f32,
            height: height as f32,
            min_depth: 0.0,
            max_depth: 1.0,
        }
    }

    #[inline]
    pub fn is_valid(self) -> bool {
        self.width > 0.0 && self.height > 0.0 && self.width.is_finite() && self.height.is_finite()
    }

    pub fn aspect(self) -> f32 {
        if self.height > 0.0 { self.width / self.height } else { 1.0 }
    }
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct ScissorRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Per-frame bookkeeping shared by the swap chain and the orchestrator.
///
/// Mutated once per presented frame and reset on resize.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameContext {
    back_buffer_index: usize,
    fence_watermark: u64,
    frames_presented: u64,
    viewport: Viewport,
    scissor: ScissorRect,
}

impl FrameContext {
    pub fn new(width: u32, height: u32) -> Self {
        let mut ctx = Self {
            back_buffer_index: 0,
            fence_watermark: 0,
            frames_presented: 0,
            viewport: Viewport::default(),
            scissor: ScissorRect::default(),
        };
        ctx.set_client_size(width, height);
        ctx
    }

    pub fn back_buffer_index(&self) -> usize {
        self.back_buffer_index
    }

    /// Fence value the last flush waited for.
    pub fn fence_watermark(&self) -> u64 {
        self.fence_watermark
    }

    pub fn frames_presented(&self) -> u64 {
        self.frames_presented
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn scissor(&self) -> ScissorRect {
        self.scissor
    }

    /// Rotates to the next back buffer after a present.
    pub fn advance(&mut self) -> usize {
        self.back_buffer_index = (self.back_buffer_index + 1) % BUFFER_COUNT;
        self.frames_presented += 1;
        self.back_buffer_index
    }

    pub fn record_fence(&mut self, value: u64) {
        debug_assert!(value >= self.fence_watermark);
        self.fence_watermark = value;
    }

    /// Recomputes viewport/scissor and restarts the rotation at buffer 0.
    pub fn set_client_size(&mut self, width: u32, height: u32) {
        self.back_buffer_index = 0;
        self.viewport = Viewport::full(width, height);
        self.scissor = ScissorRect {
            x: 0,
            y: 0,
            width,
            height,
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_after_m_frames_is_m_mod_buffer_count() {
        let mut ctx = FrameContext::new(640, 480);
        for m in 1..=9u64 {
            ctx.advance();
            assert_eq!(ctx.back_buffer_index() as u64, m % BUFFER_COUNT as u64);
        }
        assert_eq!(ctx.frames_presented(), 9);
    }

    #[test]
    fn resize_resets_index_and_rects() {
        let mut ctx = FrameContext::new(640, 480);
        ctx.advance();
        assert_eq!(ctx.back_buffer_index(), 1);

        ctx.set_client_size(1920, 1080);
        assert_eq!(ctx.back_buffer_index(), 0);
        assert_eq!(ctx.viewport().width, 1920.0);
        assert_eq!(ctx.viewport().max_depth, 1.0);
        assert_eq!(ctx.scissor(), ScissorRect { x: 0, y: 0, width: 1920, height: 1080 });
    }

    #[test]
    fn aspect_handles_zero_height() {
        assert_eq!(Viewport::full(800, 0).aspect(), 1.0);
        assert!(!Viewport::full(800, 0).is_valid());
        assert_eq!(Viewport::full(800, 400).aspect(), 2.0);
    }
}
