//! Error taxonomy for the connection bookkeeping core.
//!
//! Two families are modeled, matching the two kinds of caller this crate
//! has: a frame-processing loop reacting to a misbehaving peer, and a
//! programmer wiring this crate up incorrectly.

use std::fmt;

use crate::stream_id::StreamId;

/// Top level error returned by every fallible operation in this crate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A violation attributable to the remote peer. The frame-processing
    /// loop is expected to translate this into the matching HTTP/2 error
    /// code and usually a GOAWAY or RST_STREAM.
    Protocol(ProtocolError),
    /// A violation attributable to the caller of this crate (a bug in the
    /// embedding codec, not in the peer).
    User(UserError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Protocol(e) => write!(f, "protocol error: {e}"),
            Error::User(e) => write!(f, "invalid use of connection core: {e}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<ProtocolError> for Error {
    fn from(e: ProtocolError) -> Self {
        Error::Protocol(e)
    }
}

impl From<UserError> for Error {
    fn from(e: UserError) -> Self {
        Error::User(e)
    }
}

/// Peer-attributable violations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// `require_stream` was called for an id with no registered stream.
    StreamNotFound(StreamId),
    /// Stream creation was attempted while the connection is quiescing.
    GoAway,
    /// A stream id does not have the parity this endpoint's role requires.
    WrongParity { id: StreamId, is_server: bool },
    /// A stream id is not strictly greater than previously issued ids.
    NotMonotonic { id: StreamId, next: StreamId },
    /// This endpoint's id counter is exhausted; no further streams can be
    /// created in this direction.
    IdSpaceExhausted,
    /// Creating this stream would exceed the connection's `max_streams`.
    MaxStreamsExceeded { max_streams: u32 },
    /// A push promise was reserved against a stream whose relevant side is
    /// no longer open.
    AssociatedStreamClosed(StreamId),
    /// `open_for_push` was called on a stream that is not `ReservedLocal`
    /// or `ReservedRemote`.
    NotReserved(StreamId),
    /// The opposite endpoint does not permit being pushed to.
    PushNotAllowed,
    /// `reserve_push_stream` was called with a parent id that does not
    /// resolve to a registered stream.
    MissingParent(StreamId),
    /// `verify_state` rejected the stream's current state; carries the
    /// caller-supplied reason.
    UnexpectedState { id: StreamId, reason: &'static str },
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolError::StreamNotFound(id) => write!(f, "unknown stream {id}"),
            ProtocolError::GoAway => write!(f, "connection is going away"),
            ProtocolError::WrongParity { id, is_server } => write!(
                f,
                "stream id {id} is not valid for a {} connection",
                if *is_server { "server" } else { "client" }
            ),
            ProtocolError::NotMonotonic { id, next } => {
                write!(f, "stream id {id} is not >= expected next id {next}")
            }
            ProtocolError::IdSpaceExhausted => write!(f, "stream id space exhausted"),
            ProtocolError::MaxStreamsExceeded { max_streams } => {
                write!(f, "connection already has max_streams={max_streams} streams")
            }
            ProtocolError::AssociatedStreamClosed(id) => {
                write!(f, "associated stream {id} is not open for push")
            }
            ProtocolError::NotReserved(id) => write!(f, "stream {id} is not reserved"),
            ProtocolError::PushNotAllowed => write!(f, "peer does not allow pushes"),
            ProtocolError::MissingParent(id) => write!(f, "push parent stream {id} does not exist"),
            ProtocolError::UnexpectedState { id, reason } => {
                write!(f, "stream {id} failed state check: {reason}")
            }
        }
    }
}

/// Caller/programmer-attributable violations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserError {
    /// Weight outside `[MIN_WEIGHT, MAX_WEIGHT]`.
    InvalidWeight(u16),
    /// A stream was asked to depend on itself.
    SelfDependency(StreamId),
    /// A mutating operation was attempted on the connection stream.
    ConnectionStreamImmutable,
    /// `allow_push_to(true)` was set on a server endpoint.
    ServerCannotBePushed,
}

impl fmt::Display for UserError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserError::InvalidWeight(w) => {
                write!(f, "weight {w} outside of allowed range [1, 256]")
            }
            UserError::SelfDependency(id) => write!(f, "stream {id} cannot depend on itself"),
            UserError::ConnectionStreamImmutable => {
                write!(f, "the connection stream does not support this operation")
            }
            UserError::ServerCannotBePushed => {
                write!(f, "a server endpoint cannot allow being pushed to")
            }
        }
    }
}

/// Error surfaced by a fallible [`Listener`](crate::listener::Listener)
/// callback. Never aborts event delivery; see [`crate::connection::Connection`]'s
/// continue-on-error fan-out policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListenerError(pub String);

impl fmt::Display for ListenerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "listener error: {}", self.0)
    }
}

impl std::error::Error for ListenerError {}
