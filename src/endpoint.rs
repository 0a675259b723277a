//! One side (client or server) of a connection: stream-id allocation and
//! per-role settings.
//!
//! `Endpoint` itself only ever stores role-local data: it knows nothing
//! about the connection's stream registry. Operations that also touch the
//! registry (`create_stream`, `reserve_push_stream`) are exposed through
//! [`EndpointRef`](crate::connection::EndpointRef), a short-lived handle
//! borrowing the owning `Connection`.

use crate::error::UserError;
use crate::stream_id::StreamId;

/// Which side of a connection an [`Endpoint`] represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Local,
    Remote,
}

impl Side {
    pub fn opposite(self) -> Side {
        match self {
            Side::Local => Side::Remote,
            Side::Remote => Side::Local,
        }
    }
}

/// The id counter for one direction of stream creation. Tracked
/// separately from `Option<StreamId>` so that exhaustion (the 31-bit id
/// space running out) is a distinct, permanent state rather than
/// something that could be confused with "no id issued yet".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum IdCounter {
    Next(StreamId),
    Exhausted,
}

/// One side of an HTTP/2 connection.
pub struct Endpoint {
    is_server: bool,
    pub(crate) next_id: IdCounter,
    last_stream_created: Option<StreamId>,
    allow_compressed_data: bool,
    push_to_allowed: bool,
}

impl Endpoint {
    /// `allow_compressed_data` is the initial value honored for DATA
    /// frames the peer sends to this endpoint.
    pub(crate) fn new(is_server: bool, allow_compressed_data: bool) -> Self {
        let first_id = if is_server { 2 } else { 1 };
        Endpoint {
            is_server,
            next_id: IdCounter::Next(StreamId::new(first_id)),
            last_stream_created: None,
            allow_compressed_data,
            // Clients allow the server to push to them by default; servers
            // cannot be pushed to at all.
            push_to_allowed: !is_server,
        }
    }

    pub fn is_server(&self) -> bool {
        self.is_server
    }

    /// The next id this endpoint would assign, without advancing the
    /// counter. A fresh client endpoint (counter still at 1) reports `3`,
    /// reserving id `1` for an HTTP/1.1 upgrade stream; this is a one-time
    /// special case, not a general clamp (see crate design notes).
    pub fn next_stream_id(&self) -> Option<StreamId> {
        match self.next_id {
            IdCounter::Next(id) if !self.is_server && id.as_u32() == 1 => Some(StreamId::new(3)),
            IdCounter::Next(id) => Some(id),
            IdCounter::Exhausted => None,
        }
    }

    pub fn last_stream_created(&self) -> Option<StreamId> {
        self.last_stream_created
    }

    pub(crate) fn set_last_stream_created(&mut self, id: StreamId) {
        self.last_stream_created = Some(id);
    }

    pub fn allow_compressed_data(&self) -> bool {
        self.allow_compressed_data
    }

    pub fn set_allow_compressed_data(&mut self, allow: bool) {
        self.allow_compressed_data = allow;
    }

    /// Whether the *opposite* endpoint may push to this one.
    pub fn allow_push_to(&self) -> bool {
        self.push_to_allowed
    }

    /// Setting this `true` on a server endpoint is a programmer error:
    /// servers are never pushed to.
    pub fn set_allow_push_to(&mut self, allow: bool) -> Result<(), UserError> {
        if allow && self.is_server {
            return Err(UserError::ServerCannotBePushed);
        }
        self.push_to_allowed = allow;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_starts_at_one_but_reports_three() {
        let e = Endpoint::new(false, true);
        assert_eq!(e.next_stream_id(), Some(StreamId::new(3)));
    }

    #[test]
    fn server_starts_at_two() {
        let e = Endpoint::new(true, true);
        assert_eq!(e.next_stream_id(), Some(StreamId::new(2)));
    }

    #[test]
    fn default_push_permissions() {
        assert!(Endpoint::new(false, true).allow_push_to());
        assert!(!Endpoint::new(true, true).allow_push_to());
    }

    #[test]
    fn server_cannot_allow_push_to_it() {
        let mut e = Endpoint::new(true, true);
        assert_eq!(e.set_allow_push_to(true), Err(UserError::ServerCannotBePushed));
    }
}
