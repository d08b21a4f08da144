use std::collections::HashMap;
use std::fmt;

use super::error::TransitionError;

/// Usage state of a GPU resource.
///
/// wgpu tracks hazards internally; these states are kept so that every pass
/// declares what it expects and a mismatch is caught on the CPU.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ResourceState {
    Common,
    Present,
    RenderTarget,
    DepthWrite,
    CopySource,
    CopyDest,
    GenericRead,
    UnorderedAccess,
}

/// Resources whose state is tracked across a frame.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ResourceId {
    BackBuffer(usize),
    DepthStencil,
    PostMap0,
    PostMap1,
    TileOffsets,
    MeshVertices,
    RayOutput,
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceId::BackBuffer(i) => write!(f, "back buffer {i}"),
            ResourceId::DepthStencil => f.write_str("depth stencil"),
            ResourceId::PostMap0 => f.write_str("post map 0"),
            ResourceId::PostMap1 => f.write_str("post map 1"),
            ResourceId::TileOffsets => f.write_str("tile offsets"),
            ResourceId::MeshVertices => f.write_str("mesh vertices"),
            ResourceId::RayOutput => f.write_str("ray output"),
        }
    }
}

/// A declared state change: `before` must match the tracked state.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Transition {
    pub resource: ResourceId,
    pub before: ResourceState,
    pub after: ResourceState,
}

impl Transition {
    pub const fn new(resource: ResourceId, before: ResourceState, after: ResourceState) -> Self {
        Self {
            resource,
            before,
            after,
        }
    }
}

/// Last known state per resource.
#[derive(Debug, Default, Clone)]
pub struct StateTracker {
    states: HashMap<ResourceId, ResourceState>,
}

impl StateTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts tracking `resource` (or resets it) at `state`.
    pub fn register(&mut self, resource: ResourceId, state: ResourceState) {
        self.states.insert(resource, state);
    }

    pub fn forget(&mut self, resource: ResourceId) {
        self.states.remove(&resource);
    }

    pub fn state(&self, resource: ResourceId) -> Option<ResourceState> {
        self.states.get(&resource).copied()
    }

    /// Applies a single transition after checking its `before` state.
    pub fn transition(&mut self, t: Transition) -> Result<(), TransitionError> {
        let current = self
            .states
            .get_mut(&t.resource)
            .ok_or(TransitionError::UnknownResource(t.resource))?;

        if *current != t.before {
            return Err(TransitionError::StateMismatch {
                resource: t.resource,
                expected: t.before,
                actual: *current,
            });
        }

        log::trace!("barrier {}: {:?} -> {:?}", t.resource, t.before, t.after);
        *current = t.after;
        Ok(())
    }

    /// Applies transitions in order; stops at the first mismatch.
    pub fn apply<'a, I>(&mut self, transitions: I) -> Result<(), TransitionError>
    where
        I: IntoIterator<Item = &'a Transition>,
    {
        for t in transitions {
            self.transition(*t)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ResourceState::*;

    #[test]
    fn valid_chain_updates_state() {
        let mut tracker = StateTracker::new();
        tracker.register(ResourceId::BackBuffer(0), Present);

        tracker
            .apply(&[
                Transition::new(ResourceId::BackBuffer(0), Present, RenderTarget),
                Transition::new(ResourceId::BackBuffer(0), RenderTarget, Present),
            ])
            .unwrap();

        assert_eq!(tracker.state(ResourceId::BackBuffer(0)), Some(Present));
    }

    #[test]
    fn mismatched_before_is_rejected() {
        let mut tracker = StateTracker::new();
        tracker.register(ResourceId::PostMap0, GenericRead);

        let err = tracker
            .transition(Transition::new(ResourceId::PostMap0, CopyDest, GenericRead))
            .unwrap_err();

        assert_eq!(
            err,
            TransitionError::StateMismatch {
                resource: ResourceId::PostMap0,
                expected: CopyDest,
                actual: GenericRead,
            }
        );
        // State is untouched on failure.
        assert_eq!(tracker.state(ResourceId::PostMap0), Some(GenericRead));
    }

    #[test]
    fn untracked_resource_is_rejected() {
        let mut tracker = StateTracker::new();
        let err = tracker
            .transition(Transition::new(ResourceId::RayOutput, UnorderedAccess, CopySource))
            .unwrap_err();
        assert_eq!(err, TransitionError::UnknownResource(ResourceId::RayOutput));
    }
}
