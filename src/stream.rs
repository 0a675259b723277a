//! The stream node itself: identity, state, priority slot, child map and
//! flow-control slots.
//!
//! A `Stream` never owns another `Stream`. The tree's parent/child links
//! are plain [`StreamId`]s resolved back through the owning
//! [`Connection`](crate::connection::Connection)'s registry — see that
//! module for why, and for the tree mutators, which need to touch more
//! than one registry entry at a time and so cannot live as methods that
//! only borrow `self`.

use std::any::Any;

use indexmap::IndexMap;

use crate::state::StreamState;
use crate::stream_id::StreamId;

/// Default weight assigned to a newly created or reserved stream.
pub const DEFAULT_WEIGHT: u16 = 16;
/// Minimum legal weight (RFC 7540 §5.3.2).
pub const MIN_WEIGHT: u16 = 1;
/// Maximum legal weight (RFC 7540 §5.3.2).
pub const MAX_WEIGHT: u16 = 256;

/// One node of the priority tree / stream registry.
///
/// Flow-control slots (`inbound_flow`/`outbound_flow`) are opaque to this
/// crate: it never inspects them, only stores them on behalf of whatever
/// flow-control subsystem is plugged into the surrounding codec.
pub struct Stream {
    id: StreamId,
    pub(crate) state: StreamState,
    pub(crate) weight: u16,
    pub(crate) parent: Option<StreamId>,
    pub(crate) children: IndexMap<StreamId, ()>,
    pub(crate) total_child_weights: u32,
    inbound_flow: Option<Box<dyn Any>>,
    outbound_flow: Option<Box<dyn Any>>,
}

impl Stream {
    /// Creates a freshly `Idle` stream with no parent and default weight.
    /// Registration under the connection stream happens in
    /// [`Connection`](crate::connection::Connection), not here, since it
    /// requires touching the parent's child map too.
    pub(crate) fn new(id: StreamId) -> Self {
        Stream {
            id,
            state: StreamState::Idle,
            weight: DEFAULT_WEIGHT,
            parent: None,
            children: IndexMap::new(),
            total_child_weights: 0,
            inbound_flow: None,
            outbound_flow: None,
        }
    }

    pub fn id(&self) -> StreamId {
        self.id
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    pub fn weight(&self) -> u16 {
        self.weight
    }

    pub fn parent(&self) -> Option<StreamId> {
        self.parent
    }

    pub fn total_child_weights(&self) -> u32 {
        self.total_child_weights
    }

    pub fn is_root(&self) -> bool {
        self.id.is_connection()
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    pub fn num_children(&self) -> usize {
        self.children.len()
    }

    pub fn has_child(&self, id: StreamId) -> bool {
        self.children.contains_key(&id)
    }

    /// Iterates direct children in insertion order. Order is observable
    /// and relied on by exclusive reparenting and by write schedulers.
    pub fn children(&self) -> impl Iterator<Item = StreamId> + '_ {
        self.children.keys().copied()
    }

    pub fn local_side_open(&self) -> bool {
        self.state.local_side_open()
    }

    pub fn remote_side_open(&self) -> bool {
        self.state.remote_side_open()
    }

    /// Checks that this stream's state is in `allowed`, returning `Ok(())`
    /// if so. The caller supplies the reason surfaced in the error, since
    /// only the caller knows what it was trying to do.
    pub fn verify_state(
        &self,
        allowed: &[StreamState],
        reason: &'static str,
    ) -> Result<(), crate::error::ProtocolError> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(crate::error::ProtocolError::UnexpectedState { id: self.id, reason })
        }
    }

    pub fn inbound_flow(&self) -> Option<&dyn Any> {
        self.inbound_flow.as_deref()
    }

    pub fn outbound_flow(&self) -> Option<&dyn Any> {
        self.outbound_flow.as_deref()
    }

    /// Installs the inbound flow-control slot. Flow-control subsystems are
    /// expected to call this exactly once per stream; subsequent calls
    /// overwrite silently since this crate does not interpret the slot's
    /// contents and so cannot judge whether re-installation is a bug.
    pub fn set_inbound_flow(&mut self, slot: Box<dyn Any>) {
        self.inbound_flow = Some(slot);
    }

    pub fn set_outbound_flow(&mut self, slot: Box<dyn Any>) {
        self.outbound_flow = Some(slot);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_stream_is_idle_leaf_with_default_weight() {
        let s = Stream::new(StreamId::new(3));
        assert_eq!(s.state(), StreamState::Idle);
        assert_eq!(s.weight(), DEFAULT_WEIGHT);
        assert!(s.is_leaf());
        assert_eq!(s.parent(), None);
        assert_eq!(s.total_child_weights(), 0);
    }

    #[test]
    fn verify_state_reports_caller_reason() {
        let s = Stream::new(StreamId::new(3));
        let err = s
            .verify_state(&[StreamState::Open], "expected open for DATA")
            .unwrap_err();
        match err {
            crate::error::ProtocolError::UnexpectedState { reason, .. } => {
                assert_eq!(reason, "expected open for DATA");
            }
            _ => panic!("wrong error variant"),
        }
    }
}
