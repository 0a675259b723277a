//! Stream lifecycle and priority observers.
//!
//! Modeled as a trait with a default no-op body per callback, rather than
//! the source's capability-set-of-seven-closures, so an observer only
//! implements what it cares about. The connection fans events out to all
//! registered listeners in insertion order (deterministic, unlike the
//! source's unordered set — see the crate's design notes).

use crate::error::ListenerError;
use crate::stream_id::StreamId;

/// Observes stream lifecycle and priority-tree events on a `Connection`.
///
/// A failing callback is logged and does not prevent delivery to the
/// remaining listeners, nor does it unwind the operation that triggered
/// the event (see `Connection`'s continue-on-error fan-out policy).
pub trait Listener {
    /// The stream was registered in the connection (attached under the
    /// connection stream, present in the registry) but not yet activated.
    fn stream_added(&mut self, _id: StreamId) -> Result<(), ListenerError> {
        Ok(())
    }

    /// The stream entered the active set.
    fn stream_active(&mut self, _id: StreamId) -> Result<(), ListenerError> {
        Ok(())
    }

    /// The stream transitioned `Open` -> `HalfClosed*`.
    fn stream_half_closed(&mut self, _id: StreamId) -> Result<(), ListenerError> {
        Ok(())
    }

    /// The stream left the active set (always just before `Closed` takes
    /// effect externally).
    fn stream_inactive(&mut self, _id: StreamId) -> Result<(), ListenerError> {
        Ok(())
    }

    /// The stream is about to be unlinked from the registry and tree.
    /// Fired before the unlink, so the stream can still be queried.
    fn stream_removed(&mut self, _id: StreamId) -> Result<(), ListenerError> {
        Ok(())
    }

    /// `id`'s priority changed without restructuring the tree (weight
    /// and/or parent changed in place). `prev_parent` is `id`'s parent
    /// before this change.
    fn stream_priority_changed(
        &mut self,
        _id: StreamId,
        _prev_parent: StreamId,
    ) -> Result<(), ListenerError> {
        Ok(())
    }

    /// `id`'s reparenting required hoisting `subtree_root` (formerly an
    /// ancestor of `id`'s new position) to break a would-be cycle.
    fn stream_priority_subtree_changed(
        &mut self,
        _id: StreamId,
        _subtree_root: StreamId,
    ) -> Result<(), ListenerError> {
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    /// Records every event it receives, in order, as a flat log of tags.
    /// Used by integration tests to assert event ordering without
    /// depending on a specific listener's business logic.
    #[derive(Default)]
    pub struct RecordingListener {
        pub events: Vec<String>,
    }

    impl Listener for RecordingListener {
        fn stream_added(&mut self, id: StreamId) -> Result<(), ListenerError> {
            self.events.push(format!("added({id})"));
            Ok(())
        }

        fn stream_active(&mut self, id: StreamId) -> Result<(), ListenerError> {
            self.events.push(format!("active({id})"));
            Ok(())
        }

        fn stream_half_closed(&mut self, id: StreamId) -> Result<(), ListenerError> {
            self.events.push(format!("half_closed({id})"));
            Ok(())
        }

        fn stream_inactive(&mut self, id: StreamId) -> Result<(), ListenerError> {
            self.events.push(format!("inactive({id})"));
            Ok(())
        }

        fn stream_removed(&mut self, id: StreamId) -> Result<(), ListenerError> {
            self.events.push(format!("removed({id})"));
            Ok(())
        }

        fn stream_priority_changed(
            &mut self,
            id: StreamId,
            prev_parent: StreamId,
        ) -> Result<(), ListenerError> {
            self.events
                .push(format!("priority_changed({id}, {prev_parent})"));
            Ok(())
        }

        fn stream_priority_subtree_changed(
            &mut self,
            id: StreamId,
            subtree_root: StreamId,
        ) -> Result<(), ListenerError> {
            self.events
                .push(format!("priority_subtree_changed({id}, {subtree_root})"));
            Ok(())
        }
    }

    /// Always fails, to exercise the continue-on-error fan-out policy.
    #[derive(Default)]
    pub struct FailingListener {
        pub calls: usize,
    }

    impl Listener for FailingListener {
        fn stream_added(&mut self, _id: StreamId) -> Result<(), ListenerError> {
            self.calls += 1;
            Err(ListenerError("boom".to_string()))
        }

        fn stream_active(&mut self, _id: StreamId) -> Result<(), ListenerError> {
            self.calls += 1;
            Err(ListenerError("boom".to_string()))
        }
    }
}
