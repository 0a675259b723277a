//! The removal policy seam: decides *when* a closed stream is actually
//! unlinked from the connection.
//!
//! The source models this as an injected object with a `setAction`/
//! `markForRemoval` pair, where the action is a callback that reaches
//! back into the connection to perform the unlink. A closure capturing
//! `&mut Connection` can't be stored safely alongside the connection
//! itself in Rust, so `Action` here is a handle onto a shared queue
//! instead: `mark_for_removal` still "invokes the action synchronously"
//! exactly as the source does, but the action's effect is to enqueue a
//! removal, and `Connection` drains that queue right after any operation
//! that could have triggered one. An immediate policy drains to empty
//! before returning control to the caller, which is observably identical
//! to a synchronous in-place removal.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use crate::stream_id::StreamId;

/// Handle a [`RemovalPolicy`] uses to request that a stream actually be
/// unlinked. Cheap to clone; all clones share the same underlying queue.
#[derive(Clone)]
pub struct Action {
    queue: Rc<RefCell<VecDeque<StreamId>>>,
}

impl Action {
    pub(crate) fn new(queue: Rc<RefCell<VecDeque<StreamId>>>) -> Self {
        Action { queue }
    }

    /// Requests removal of `id`. For the immediate policy this is acted
    /// on before the triggering `close()` call returns; other policies
    /// may batch it.
    pub fn remove_stream(&self, id: StreamId) {
        self.queue.borrow_mut().push_back(id);
    }
}

/// Decides when a stream that has entered `Closed` is actually removed
/// from the connection's registry and tree.
pub trait RemovalPolicy {
    /// Called exactly once, at connection construction.
    fn set_action(&mut self, action: Action);

    /// Called by a stream's `close()` once it reaches `Closed`. The
    /// policy decides whether to request removal now or later.
    fn mark_for_removal(&mut self, id: StreamId);
}

/// Removes closed streams as soon as they close. This is the default.
#[derive(Default)]
pub struct ImmediateRemovalPolicy {
    action: Option<Action>,
}

impl RemovalPolicy for ImmediateRemovalPolicy {
    fn set_action(&mut self, action: Action) {
        self.action = Some(action);
    }

    fn mark_for_removal(&mut self, id: StreamId) {
        if let Some(action) = &self.action {
            action.remove_stream(id);
        }
    }
}

/// Batches removals until [`DeferredRemovalPolicy::flush`] is called
/// explicitly, so a frame-processing loop can keep iterating over streams
/// closed mid-pass without the registry shifting under it, then flush once
/// at the end of the pass.
#[derive(Default)]
pub struct DeferredRemovalPolicy {
    action: Option<Action>,
    pending: Vec<StreamId>,
}

impl DeferredRemovalPolicy {
    /// Requests removal of every stream queued since the last flush.
    pub fn flush(&mut self) {
        if let Some(action) = &self.action {
            for id in self.pending.drain(..) {
                action.remove_stream(id);
            }
        }
    }

    /// Number of streams awaiting a flush.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

impl RemovalPolicy for DeferredRemovalPolicy {
    fn set_action(&mut self, action: Action) {
        self.action = Some(action);
    }

    fn mark_for_removal(&mut self, id: StreamId) {
        self.pending.push(id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn immediate_policy_enqueues_on_mark() {
        let queue = Rc::new(RefCell::new(VecDeque::new()));
        let mut policy = ImmediateRemovalPolicy::default();
        policy.set_action(Action::new(queue.clone()));
        policy.mark_for_removal(StreamId::new(3));
        assert_eq!(queue.borrow_mut().pop_front(), Some(StreamId::new(3)));
    }

    #[test]
    fn deferred_policy_waits_for_flush() {
        let queue = Rc::new(RefCell::new(VecDeque::new()));
        let mut policy = DeferredRemovalPolicy::default();
        policy.set_action(Action::new(queue.clone()));
        policy.mark_for_removal(StreamId::new(3));
        assert!(queue.borrow().is_empty());
        assert_eq!(policy.pending_len(), 1);
        policy.flush();
        assert_eq!(queue.borrow_mut().pop_front(), Some(StreamId::new(3)));
        assert_eq!(policy.pending_len(), 0);
    }
}
