//! Connection-level bookkeeping for an HTTP/2 endpoint: per-stream state,
//! the priority dependency tree, stream-id allocation, and the listener
//! and removal-policy seams a frame-processing loop hangs off of.
//!
//! This crate does not parse or encode frames, manage flow-control
//! window arithmetic, or perform HPACK; it is the bookkeeping core a
//! codec plugs into. See [`connection::Connection`] for the entry point.

pub mod connection;
pub mod endpoint;
pub mod error;
pub mod listener;
pub mod removal;
pub mod state;
pub mod stream;
pub mod stream_id;

pub use connection::{Connection, ConnectionConfig, EndpointRef, ListenerId, StreamHandle};
pub use endpoint::{Endpoint, Side};
pub use error::{Error, ListenerError, ProtocolError, UserError};
pub use listener::Listener;
pub use removal::{Action, DeferredRemovalPolicy, ImmediateRemovalPolicy, RemovalPolicy};
pub use state::{InitialDisposition, StreamState};
pub use stream::Stream;
pub use stream_id::{StreamId, CONNECTION_STREAM_ID};
