//! The per-stream finite state machine.
//!
//! ```not_rust
//!                              +--------+
//!                      send PP |        | recv PP
//!                     ,--------|  idle  |--------.
//!                    /         |        |         \
//!                   v          +--------+          v
//!            +----------+          |           +----------+
//!            |          |          | send H /  |          |
//!     ,------| reserved |          | recv H    | reserved |------.
//!     |      | (local)  |          |           | (remote) |      |
//!     |      +----------+          v           +----------+      |
//!     |          |             +--------+             |          |
//!     |          |     recv ES |        | send ES     |          |
//!     |   send H |     ,-------|  open  |-------.     | recv H   |
//!     |          |    /        |        |        \    |          |
//!     |          v   v         +--------+         v   v          |
//!     |      +----------+          |           +----------+      |
//!     |      |   half   |          |           |   half   |      |
//!     |      |  closed  |          | send R /  |  closed  |      |
//!     |      | (remote) |          | recv R    | (local)  |      |
//!     |      +----------+          |           +----------+      |
//!     |           |                |                 |           |
//!     |           | send ES /      |       recv ES / |           |
//!     |           | send R /       v        send R / |           |
//!     |           | recv R     +--------+   recv R   |           |
//!     | send R /  `----------->|        |<-----------'  send R / |
//!     | recv R                 | closed |               recv R   |
//!     `----------------------->|        |<----------------------'
//!                              +--------+
//! ```

use std::fmt;

/// The state of one HTTP/2 stream, per RFC 7540 §5.1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    Idle,
    Open,
    ReservedLocal,
    ReservedRemote,
    HalfClosedLocal,
    HalfClosedRemote,
    Closed,
}

impl StreamState {
    /// `true` while the endpoint is permitted to send on this stream.
    pub fn local_side_open(self) -> bool {
        matches!(
            self,
            StreamState::HalfClosedRemote | StreamState::Open | StreamState::ReservedLocal
        )
    }

    /// `true` while the peer is permitted to send on this stream.
    pub fn remote_side_open(self) -> bool {
        matches!(
            self,
            StreamState::HalfClosedLocal | StreamState::Open | StreamState::ReservedRemote
        )
    }

    pub fn is_closed(self) -> bool {
        matches!(self, StreamState::Closed)
    }

    pub fn is_reserved(self) -> bool {
        matches!(self, StreamState::ReservedLocal | StreamState::ReservedRemote)
    }

    /// `true` for any state counted in the connection's active set: the
    /// stream has been activated (opened, directly or via push promotion)
    /// and has not yet closed.
    pub fn is_active(self) -> bool {
        matches!(
            self,
            StreamState::Open | StreamState::HalfClosedLocal | StreamState::HalfClosedRemote
        )
    }
}

impl fmt::Display for StreamState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StreamState::Idle => "idle",
            StreamState::Open => "open",
            StreamState::ReservedLocal => "reserved(local)",
            StreamState::ReservedRemote => "reserved(remote)",
            StreamState::HalfClosedLocal => "half-closed(local)",
            StreamState::HalfClosedRemote => "half-closed(remote)",
            StreamState::Closed => "closed",
        };
        f.write_str(s)
    }
}

/// The kind of `Idle -> {Open, HalfClosed*}` transition a freshly created
/// stream should start in, as decided by whoever is calling `create_stream`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitialDisposition {
    Open,
    HalfClosedLocal,
    HalfClosedRemote,
}

/// Pure transition table, kept separate from the owning `Stream` so it can
/// be unit tested without a connection/registry in scope.
///
/// Returns the new state, or `None` if the transition is illegal from the
/// given starting state (callers translate that into a `ProtocolError` or
/// `UserError` depending on who is attributable).
pub(crate) fn open_for_push(state: StreamState) -> Option<StreamState> {
    match state {
        StreamState::ReservedLocal => Some(StreamState::HalfClosedRemote),
        StreamState::ReservedRemote => Some(StreamState::HalfClosedLocal),
        _ => None,
    }
}

pub(crate) fn close_local_side(state: StreamState) -> Option<StreamState> {
    match state {
        StreamState::Open => Some(StreamState::HalfClosedLocal),
        StreamState::HalfClosedLocal => Some(StreamState::HalfClosedLocal),
        StreamState::HalfClosedRemote => Some(StreamState::Closed),
        StreamState::ReservedLocal | StreamState::ReservedRemote => Some(StreamState::Closed),
        StreamState::Closed => Some(StreamState::Closed),
        StreamState::Idle => None,
    }
}

pub(crate) fn close_remote_side(state: StreamState) -> Option<StreamState> {
    match state {
        StreamState::Open => Some(StreamState::HalfClosedRemote),
        StreamState::HalfClosedRemote => Some(StreamState::HalfClosedRemote),
        StreamState::HalfClosedLocal => Some(StreamState::Closed),
        StreamState::ReservedLocal | StreamState::ReservedRemote => Some(StreamState::Closed),
        StreamState::Closed => Some(StreamState::Closed),
        StreamState::Idle => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn half_close_then_other_side_closes() {
        let s = close_local_side(StreamState::Open).unwrap();
        assert_eq!(s, StreamState::HalfClosedLocal);
        let s = close_remote_side(s).unwrap();
        assert_eq!(s, StreamState::Closed);
    }

    #[test]
    fn half_close_is_idempotent() {
        assert_eq!(
            close_local_side(StreamState::HalfClosedLocal),
            Some(StreamState::HalfClosedLocal)
        );
        assert_eq!(
            close_remote_side(StreamState::HalfClosedRemote),
            Some(StreamState::HalfClosedRemote)
        );
    }

    #[test]
    fn close_from_idle_is_illegal() {
        assert_eq!(close_local_side(StreamState::Idle), None);
        assert_eq!(close_remote_side(StreamState::Idle), None);
    }

    #[test]
    fn reserved_open_for_push() {
        assert_eq!(
            open_for_push(StreamState::ReservedLocal),
            Some(StreamState::HalfClosedRemote)
        );
        assert_eq!(
            open_for_push(StreamState::ReservedRemote),
            Some(StreamState::HalfClosedLocal)
        );
        assert_eq!(open_for_push(StreamState::Open), None);
    }

    #[test]
    fn side_open_predicates() {
        assert!(StreamState::Open.local_side_open());
        assert!(StreamState::Open.remote_side_open());
        assert!(StreamState::ReservedLocal.local_side_open());
        assert!(!StreamState::ReservedLocal.remote_side_open());
        assert!(StreamState::ReservedRemote.remote_side_open());
        assert!(!StreamState::ReservedRemote.local_side_open());
        assert!(!StreamState::Closed.local_side_open());
        assert!(!StreamState::Closed.remote_side_open());
    }

    #[test]
    fn active_excludes_reserved_and_closed() {
        assert!(StreamState::Open.is_active());
        assert!(StreamState::HalfClosedLocal.is_active());
        assert!(StreamState::HalfClosedRemote.is_active());
        assert!(!StreamState::Idle.is_active());
        assert!(!StreamState::ReservedLocal.is_active());
        assert!(!StreamState::ReservedRemote.is_active());
        assert!(!StreamState::Closed.is_active());
    }
}
