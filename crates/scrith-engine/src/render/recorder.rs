use anyhow::Result;

use crate::device::{ResourceId, Transition};

use super::plan::{FramePlan, Step};

/// Executes the steps of a [`FramePlan`].
///
/// The GPU implementation lives in the orchestrator; tests substitute a
/// recorder that only logs calls.
pub trait FrameRecorder {
    fn begin(&mut self) -> Result<()>;
    fn barrier(&mut self, transition: &Transition) -> Result<()>;
    fn raster(&mut self, draw: bool) -> Result<()>;
    fn upload_tile_offsets(&mut self) -> Result<()>;
    fn dispatch_tiles(&mut self) -> Result<()>;
    fn copy_back_buffer(&mut self, dst: ResourceId) -> Result<()>;
    fn dispatch_post(&mut self) -> Result<()>;
    fn dispatch_rays(&mut self) -> Result<()>;
    fn write_back_buffer(&mut self, src: ResourceId) -> Result<()>;
    fn submit(&mut self) -> Result<()>;
    fn present(&mut self) -> Result<()>;
    fn flush(&mut self) -> Result<()>;
}

impl FramePlan {
    /// Feeds every step to `recorder` in order, stopping at the first failure.
    pub fn record<R: FrameRecorder + ?Sized>(&self, recorder: &mut R) -> Result<()> {
        for step in self.steps() {
            match *step {
                Step::Begin => recorder.begin()?,
                Step::Barrier(ref t) => recorder.barrier(t)?,
                Step::Raster { draw } => recorder.raster(draw)?,
                Step::UploadTileOffsets => recorder.upload_tile_offsets()?,
                Step::DispatchTiles => recorder.dispatch_tiles()?,
                Step::CopyBackBuffer { dst } => recorder.copy_back_buffer(dst)?,
                Step::DispatchPost => recorder.dispatch_post()?,
                Step::DispatchRays => recorder.dispatch_rays()?,
                Step::WriteBackBuffer { src } => recorder.write_back_buffer(src)?,
                Step::Submit => recorder.submit()?,
                Step::Present => recorder.present()?,
                Step::Flush => recorder.flush()?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use anyhow::anyhow;

    use super::*;
    use crate::device::{BUFFER_COUNT, FrameContext, ResourceState, StateTracker};
    use crate::render::plan::{FrameKind, register_resting_states};

    /// Records call names and drives the state tracker and frame context
    /// the way the GPU recorder does.
    struct MockRecorder {
        calls: Vec<String>,
        tracker: StateTracker,
        frame: FrameContext,
        fence: u64,
        fail_on: Option<&'static str>,
    }

    impl MockRecorder {
        fn new() -> Self {
            let mut tracker = StateTracker::new();
            for i in 0..BUFFER_COUNT {
                tracker.register(ResourceId::BackBuffer(i), ResourceState::Present);
            }
            register_resting_states(&mut tracker);
            Self {
                calls: Vec::new(),
                tracker,
                frame: FrameContext::new(640, 480),
                fence: 0,
                fail_on: None,
            }
        }

        fn call(&mut self, name: &'static str) -> Result<()> {
            if self.fail_on == Some(name) {
                return Err(anyhow!("{name} failed"));
            }
            self.calls.push(name.to_string());
            Ok(())
        }
    }

    impl FrameRecorder for MockRecorder {
        fn begin(&mut self) -> Result<()> {
            self.call("begin")
        }
        fn barrier(&mut self, t: &Transition) -> Result<()> {
            self.tracker.transition(*t)?;
            self.call("barrier")
        }
        fn raster(&mut self, draw: bool) -> Result<()> {
            self.call(if draw { "raster" } else { "clear" })
        }
        fn upload_tile_offsets(&mut self) -> Result<()> {
            self.call("upload")
        }
        fn dispatch_tiles(&mut self) -> Result<()> {
            self.call("tiles")
        }
        fn copy_back_buffer(&mut self, _dst: ResourceId) -> Result<()> {
            self.call("copy")
        }
        fn dispatch_post(&mut self) -> Result<()> {
            self.call("post")
        }
        fn dispatch_rays(&mut self) -> Result<()> {
            self.call("rays")
        }
        fn write_back_buffer(&mut self, _src: ResourceId) -> Result<()> {
            self.call("write")
        }
        fn submit(&mut self) -> Result<()> {
            self.call("submit")
        }
        fn present(&mut self) -> Result<()> {
            self.frame.advance();
            self.call("present")
        }
        fn flush(&mut self) -> Result<()> {
            self.fence += 1;
            self.frame.record_fence(self.fence);
            self.call("flush")
        }
    }

    fn without_barriers(calls: &[String]) -> Vec<&str> {
        calls
            .iter()
            .map(String::as_str)
            .filter(|c| *c != "barrier")
            .collect()
    }

    #[test]
    fn raster_frame_records_in_order() {
        let mut rec = MockRecorder::new();
        FramePlan::build(FrameKind::Raster { post: true }, 0)
            .record(&mut rec)
            .unwrap();
        assert_eq!(
            without_barriers(&rec.calls),
            [
                "begin", "raster", "upload", "tiles", "copy", "post", "write", "submit", "present",
                "flush"
            ]
        );
    }

    #[test]
    fn back_buffer_index_follows_frame_count() {
        let mut rec = MockRecorder::new();
        for m in 0..7u64 {
            let index = rec.frame.back_buffer_index();
            assert_eq!(index as u64, m % BUFFER_COUNT as u64);
            FramePlan::build(FrameKind::Raster { post: false }, index)
                .record(&mut rec)
                .unwrap();
        }
        assert_eq!(rec.frame.back_buffer_index(), 1);
        assert_eq!(rec.frame.fence_watermark(), 7);
    }

    #[test]
    fn failure_stops_recording() {
        let mut rec = MockRecorder::new();
        rec.fail_on = Some("post");
        let err = FramePlan::build(FrameKind::Raster { post: true }, 0).record(&mut rec);
        assert!(err.is_err());
        assert!(!rec.calls.iter().any(|c| c == "submit"));
    }

    #[test]
    fn mismatched_barrier_aborts_the_frame() {
        let mut rec = MockRecorder::new();
        rec.tracker
            .register(ResourceId::BackBuffer(0), ResourceState::RenderTarget);
        let err = FramePlan::build(FrameKind::RayTraced, 0).record(&mut rec);
        assert!(err.is_err());
        assert_eq!(rec.calls, ["begin"]);
    }
}
