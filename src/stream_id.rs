//! Stream identifiers.
//!
//! Modeled as a dedicated newtype (rather than a bare `u32`) so parity,
//! zero-ness, and ordering checks read as what they are instead of plain
//! integer arithmetic scattered through the crate.

use std::fmt;

/// A 31-bit HTTP/2 stream identifier.
///
/// `StreamId(0)` is reserved for the connection stream, the root of the
/// priority tree. Client-initiated ids are odd, server-initiated ids are
/// even.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StreamId(u32);

/// Upper bound of the 31-bit id space.
const MAX_ID: u32 = (1 << 31) - 1;

/// The single reserved id for the connection (root) stream.
pub const CONNECTION_STREAM_ID: StreamId = StreamId(0);

impl StreamId {
    /// Wraps a raw id. Truncates to 31 bits, matching the wire format's
    /// reserved high bit.
    pub const fn new(id: u32) -> Self {
        StreamId(id & MAX_ID)
    }

    pub const fn as_u32(self) -> u32 {
        self.0
    }

    pub const fn is_connection(self) -> bool {
        self.0 == 0
    }

    pub const fn is_client_initiated(self) -> bool {
        self.0 % 2 == 1
    }

    pub const fn is_server_initiated(self) -> bool {
        self.0 != 0 && self.0 % 2 == 0
    }

    /// `true` when the id has the parity an endpoint with this role would
    /// issue (servers issue even ids, clients odd ids). The connection
    /// stream id never satisfies this.
    pub const fn has_parity_for(self, is_server: bool) -> bool {
        if self.0 == 0 {
            return false;
        }
        is_server == (self.0 % 2 == 0)
    }

    /// Next id two ids away in the same direction, or `None` if that would
    /// overflow the 31-bit id space.
    pub const fn checked_add2(self) -> Option<StreamId> {
        match self.0.checked_add(2) {
            Some(next) if next <= MAX_ID => Some(StreamId(next)),
            _ => None,
        }
    }
}

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for StreamId {
    fn from(id: u32) -> Self {
        StreamId::new(id)
    }
}
