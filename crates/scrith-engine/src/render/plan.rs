use std::fmt;

use crate::device::{ResourceId, ResourceState, StateTracker, Transition, TransitionError};

/// Which pipeline path a frame takes.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum FrameKind {
    /// Tile floor rasterized; `post` adds the compute post-process.
    Raster { post: bool },
    /// Ray-query compute pass written straight onto the back buffer.
    RayTraced,
}

/// One recorded operation of a frame.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Step {
    Begin,
    Barrier(Transition),
    /// Clear color and depth; with `draw`, one indexed instanced draw of all tiles.
    Raster { draw: bool },
    UploadTileOffsets,
    DispatchTiles,
    /// Copy of the back buffer into `dst`.
    CopyBackBuffer { dst: ResourceId },
    DispatchPost,
    DispatchRays,
    /// Full-screen write of `src` onto the back buffer.
    WriteBackBuffer { src: ResourceId },
    Submit,
    Present,
    Flush,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Barrier(t) => write!(f, "barrier {} {:?} -> {:?}", t.resource, t.before, t.after),
            other => write!(f, "{other:?}"),
        }
    }
}

/// The ordered operations of one frame, including every declared transition.
///
/// Plans are pure data; a [`FrameRecorder`](super::FrameRecorder) turns them
/// into GPU commands.
#[derive(Debug, Clone)]
pub struct FramePlan {
    kind: FrameKind,
    back_buffer: usize,
    steps: Vec<Step>,
}

impl FramePlan {
    pub fn build(kind: FrameKind, back_buffer: usize) -> Self {
        use ResourceState::*;

        let bb = ResourceId::BackBuffer(back_buffer);
        let mut p = PlanBuilder::default();

        p.step(Step::Begin);
        p.barrier(bb, Present, RenderTarget);

        match kind {
            FrameKind::Raster { post } => {
                p.step(Step::Raster { draw: true });

                p.barrier(ResourceId::TileOffsets, GenericRead, CopyDest);
                p.step(Step::UploadTileOffsets);
                p.barrier(ResourceId::TileOffsets, CopyDest, GenericRead);

                p.barrier(ResourceId::MeshVertices, Common, UnorderedAccess);
                p.step(Step::DispatchTiles);
                p.barrier(ResourceId::MeshVertices, UnorderedAccess, Common);

                if post {
                    p.barrier(bb, RenderTarget, CopySource);
                    p.barrier(ResourceId::PostMap0, GenericRead, CopyDest);
                    p.step(Step::CopyBackBuffer {
                        dst: ResourceId::PostMap0,
                    });
                    p.barrier(ResourceId::PostMap0, CopyDest, GenericRead);

                    p.barrier(ResourceId::PostMap1, GenericRead, UnorderedAccess);
                    p.step(Step::DispatchPost);
                    p.barrier(ResourceId::PostMap1, UnorderedAccess, GenericRead);

                    p.barrier(bb, CopySource, CopyDest);
                    p.step(Step::WriteBackBuffer {
                        src: ResourceId::PostMap1,
                    });
                    p.barrier(bb, CopyDest, Present);
                } else {
                    p.barrier(bb, RenderTarget, Present);
                }
            }

            FrameKind::RayTraced => {
                p.step(Step::Raster { draw: false });
                p.step(Step::DispatchRays);

                p.barrier(ResourceId::RayOutput, UnorderedAccess, CopySource);
                p.barrier(bb, RenderTarget, CopyDest);
                p.step(Step::WriteBackBuffer {
                    src: ResourceId::RayOutput,
                });
                p.barrier(bb, CopyDest, Present);
                p.barrier(ResourceId::RayOutput, CopySource, UnorderedAccess);
            }
        }

        p.step(Step::Submit);
        p.step(Step::Present);
        p.step(Step::Flush);

        Self {
            kind,
            back_buffer,
            steps: p.steps,
        }
    }

    pub fn kind(&self) -> FrameKind {
        self.kind
    }

    pub fn back_buffer(&self) -> usize {
        self.back_buffer
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn transitions(&self) -> impl Iterator<Item = &Transition> {
        self.steps.iter().filter_map(|s| match s {
            Step::Barrier(t) => Some(t),
            _ => None,
        })
    }

    /// Composes the transitions of `resource`: its state before the frame and after it.
    ///
    /// `None` if the plan does not touch `resource` or its transitions do not chain.
    pub fn net_effect(&self, resource: ResourceId) -> Option<(ResourceState, ResourceState)> {
        let mut chain = self.transitions().filter(|t| t.resource == resource);
        let first = chain.next()?;
        let mut current = first.after;
        for t in chain {
            if t.before != current {
                return None;
            }
            current = t.after;
        }
        Some((first.before, current))
    }

    /// Applies every transition to `tracker`, failing on the first mismatch.
    pub fn validate(&self, tracker: &mut StateTracker) -> Result<(), TransitionError> {
        tracker.apply(self.transitions())
    }
}

#[derive(Default)]
struct PlanBuilder {
    steps: Vec<Step>,
}

impl PlanBuilder {
    fn step(&mut self, s: Step) {
        self.steps.push(s);
    }

    fn barrier(&mut self, resource: ResourceId, before: ResourceState, after: ResourceState) {
        self.steps
            .push(Step::Barrier(Transition::new(resource, before, after)));
    }
}

/// Registers every frame resource in the state it rests in between frames.
#[cfg(test)]
pub(crate) fn register_resting_states(tracker: &mut StateTracker) {
    tracker.register(ResourceId::TileOffsets, ResourceState::GenericRead);
    tracker.register(ResourceId::MeshVertices, ResourceState::Common);
    tracker.register(ResourceId::PostMap0, ResourceState::GenericRead);
    tracker.register(ResourceId::PostMap1, ResourceState::GenericRead);
    tracker.register(ResourceId::RayOutput, ResourceState::UnorderedAccess);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::BUFFER_COUNT;

    const KINDS: [FrameKind; 3] = [
        FrameKind::Raster { post: true },
        FrameKind::Raster { post: false },
        FrameKind::RayTraced,
    ];

    fn tracker() -> StateTracker {
        let mut t = StateTracker::new();
        for i in 0..BUFFER_COUNT {
            t.register(ResourceId::BackBuffer(i), ResourceState::Present);
        }
        register_resting_states(&mut t);
        t
    }

    // ── closure ──────────────────────────────────────────────────────────

    #[test]
    fn back_buffer_transitions_compose_to_identity_on_present() {
        for kind in KINDS {
            let plan = FramePlan::build(kind, 1);
            assert_eq!(
                plan.net_effect(ResourceId::BackBuffer(1)),
                Some((ResourceState::Present, ResourceState::Present)),
                "{kind:?}"
            );
            assert_eq!(plan.net_effect(ResourceId::BackBuffer(0)), None);
        }
    }

    #[test]
    fn every_touched_resource_returns_to_its_resting_state() {
        for kind in KINDS {
            let plan = FramePlan::build(kind, 0);
            for t in plan.transitions() {
                let (before, after) = plan.net_effect(t.resource).unwrap();
                assert_eq!(before, after, "{kind:?} {}", t.resource);
            }
        }
    }

    #[test]
    fn consecutive_frames_validate_against_the_tracker() {
        for kind in KINDS {
            let mut tracker = tracker();
            for frame in 0..4usize {
                let plan = FramePlan::build(kind, frame % BUFFER_COUNT);
                plan.validate(&mut tracker).unwrap();
            }
            assert_eq!(
                tracker.state(ResourceId::BackBuffer(0)),
                Some(ResourceState::Present)
            );
        }
    }

    #[test]
    fn wrong_resting_state_is_detected() {
        let mut tracker = tracker();
        tracker.register(ResourceId::PostMap1, ResourceState::UnorderedAccess);
        let plan = FramePlan::build(FrameKind::Raster { post: true }, 0);
        assert!(matches!(
            plan.validate(&mut tracker),
            Err(TransitionError::StateMismatch { resource: ResourceId::PostMap1, .. })
        ));
    }

    // ── ordering ─────────────────────────────────────────────────────────

    #[test]
    fn frame_ends_with_submit_present_flush() {
        for kind in KINDS {
            let plan = FramePlan::build(kind, 0);
            let steps = plan.steps();
            assert_eq!(steps[0], Step::Begin);
            assert_eq!(&steps[steps.len() - 3..], &[Step::Submit, Step::Present, Step::Flush]);
        }
    }

    #[test]
    fn post_copy_happens_after_the_tile_pass() {
        let plan = FramePlan::build(FrameKind::Raster { post: true }, 0);
        let pos = |s: Step| plan.steps().iter().position(|x| *x == s).unwrap();
        assert!(pos(Step::Raster { draw: true }) < pos(Step::UploadTileOffsets));
        assert!(pos(Step::DispatchTiles) < pos(Step::CopyBackBuffer { dst: ResourceId::PostMap0 }));
        assert!(pos(Step::DispatchPost) < pos(Step::WriteBackBuffer { src: ResourceId::PostMap1 }));
    }

    #[test]
    fn raster_without_post_has_no_post_steps() {
        let plan = FramePlan::build(FrameKind::Raster { post: false }, 0);
        assert!(!plan.steps().contains(&Step::DispatchPost));
        assert!(plan.net_effect(ResourceId::PostMap0).is_none());
    }

    #[test]
    fn ray_frame_skips_tile_work() {
        let plan = FramePlan::build(FrameKind::RayTraced, 0);
        assert!(plan.steps().contains(&Step::DispatchRays));
        assert!(!plan.steps().contains(&Step::DispatchTiles));
        assert!(plan.steps().contains(&Step::Raster { draw: false }));
    }
}
