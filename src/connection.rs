//! The connection: stream registry, root stream, active-stream set,
//! GOAWAY flags, listener fan-out and the removal-policy binding.
//!
//! This is also where the priority-tree mutators live. They need to
//! modify more than one entry of the stream registry at once (a node and
//! its parent, or a node and the sibling it is displacing), which is not
//! expressible as a method that only borrows a single `Stream` — see the
//! crate's design notes on indices-instead-of-pointers.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use indexmap::IndexMap;
use log::{debug, trace, warn};

use crate::endpoint::{Endpoint, IdCounter, Side};
use crate::error::{Error, ListenerError, ProtocolError, UserError};
use crate::listener::Listener;
use crate::removal::{Action, ImmediateRemovalPolicy, RemovalPolicy};
use crate::state::{self, InitialDisposition, StreamState};
use crate::stream::{Stream, MAX_WEIGHT, MIN_WEIGHT};
use crate::stream_id::{StreamId, CONNECTION_STREAM_ID};

/// Construction-time configuration for a [`Connection`].
///
/// There is no file format or environment variable surface for this
/// crate: everything a caller can configure is named here explicitly.
pub struct ConnectionConfig {
    pub is_server: bool,
    pub allow_compressed_data: bool,
    pub max_streams: u32,
    pub removal_policy: Box<dyn RemovalPolicy>,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        ConnectionConfig {
            is_server: false,
            allow_compressed_data: true,
            max_streams: u32::MAX,
            removal_policy: Box::new(ImmediateRemovalPolicy::default()),
        }
    }
}

/// Opaque identifier for a registered [`Listener`], returned by
/// [`Connection::add_listener`] and consumed by
/// [`Connection::remove_listener`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListenerId(u64);

/// The in-memory model of one HTTP/2 connection.
pub struct Connection {
    local: Endpoint,
    remote: Endpoint,
    max_streams: u32,
    streams: IndexMap<StreamId, Stream>,
    active_streams: IndexMap<StreamId, ()>,
    listeners: IndexMap<u64, Box<dyn Listener>>,
    next_listener_id: u64,
    go_away_sent: bool,
    go_away_received: bool,
    removal_policy: Box<dyn RemovalPolicy>,
    removal_queue: Rc<RefCell<VecDeque<StreamId>>>,
}

impl Connection {
    pub fn new(config: ConnectionConfig) -> Self {
        let mut streams = IndexMap::new();
        streams.insert(CONNECTION_STREAM_ID, Stream::new(CONNECTION_STREAM_ID));

        let removal_queue = Rc::new(RefCell::new(VecDeque::new()));
        let mut removal_policy = config.removal_policy;
        removal_policy.set_action(Action::new(removal_queue.clone()));

        Connection {
            local: Endpoint::new(config.is_server, config.allow_compressed_data),
            remote: Endpoint::new(!config.is_server, true),
            max_streams: config.max_streams,
            streams,
            active_streams: IndexMap::new(),
            listeners: IndexMap::new(),
            next_listener_id: 0,
            go_away_sent: false,
            go_away_received: false,
            removal_policy,
            removal_queue,
        }
    }

    // ===== role / identity =====

    pub fn is_server(&self) -> bool {
        self.local.is_server()
    }

    fn endpoint(&self, side: Side) -> &Endpoint {
        match side {
            Side::Local => &self.local,
            Side::Remote => &self.remote,
        }
    }

    fn endpoint_mut(&mut self, side: Side) -> &mut Endpoint {
        match side {
            Side::Local => &mut self.local,
            Side::Remote => &mut self.remote,
        }
    }

    pub fn local_endpoint(&self) -> &Endpoint {
        &self.local
    }

    pub fn remote_endpoint(&self) -> &Endpoint {
        &self.remote
    }

    /// Handle for the local endpoint's id-allocation and creation
    /// operations. Borrows the connection mutably for its lifetime.
    pub fn local(&mut self) -> EndpointRef<'_> {
        EndpointRef { connection: self, side: Side::Local }
    }

    /// Handle for the remote endpoint's id-allocation and creation
    /// operations.
    pub fn remote(&mut self) -> EndpointRef<'_> {
        EndpointRef { connection: self, side: Side::Remote }
    }

    // ===== registry =====

    pub fn stream(&self, id: StreamId) -> Option<&Stream> {
        self.streams.get(&id)
    }

    pub fn require_stream(&self, id: StreamId) -> Result<&Stream, Error> {
        self.stream(id)
            .ok_or_else(|| Error::Protocol(ProtocolError::StreamNotFound(id)))
    }

    /// Borrows a stream mutably through the handle that exposes its
    /// mutating operations (`set_priority`, `close`, ...).
    pub fn stream_mut(&mut self, id: StreamId) -> Option<StreamHandle<'_>> {
        if self.streams.contains_key(&id) {
            Some(StreamHandle { connection: self, id })
        } else {
            None
        }
    }

    pub fn require_stream_mut(&mut self, id: StreamId) -> Result<StreamHandle<'_>, Error> {
        if self.streams.contains_key(&id) {
            Ok(StreamHandle { connection: self, id })
        } else {
            Err(Error::Protocol(ProtocolError::StreamNotFound(id)))
        }
    }

    pub fn connection_stream(&self) -> &Stream {
        &self.streams[&CONNECTION_STREAM_ID]
    }

    pub fn num_streams(&self) -> usize {
        self.streams.len()
    }

    /// Active streams, in activation order.
    pub fn active_streams(&self) -> impl Iterator<Item = StreamId> + '_ {
        self.active_streams.keys().copied()
    }

    pub fn num_active_streams(&self) -> usize {
        self.active_streams.len()
    }

    // ===== GOAWAY =====

    pub fn go_away_sent(&self) -> bool {
        self.go_away_sent
    }

    pub fn go_away_received(&self) -> bool {
        self.go_away_received
    }

    pub fn is_go_away_sent(&self) -> bool {
        self.go_away_sent
    }

    pub fn is_go_away_received(&self) -> bool {
        self.go_away_received
    }

    pub fn is_go_away(&self) -> bool {
        self.go_away_sent || self.go_away_received
    }

    /// Sticky: once set, `go_away_sent` never reverts to `false`.
    pub fn mark_go_away_sent(&mut self) {
        if !self.go_away_sent {
            debug!("GOAWAY sent");
        }
        self.go_away_sent = true;
    }

    /// Sticky: once set, `go_away_received` never reverts to `false`.
    pub fn mark_go_away_received(&mut self) {
        if !self.go_away_received {
            debug!("GOAWAY received");
        }
        self.go_away_received = true;
    }

    // ===== listeners =====

    pub fn add_listener(&mut self, listener: Box<dyn Listener>) -> ListenerId {
        let id = self.next_listener_id;
        self.next_listener_id += 1;
        self.listeners.insert(id, listener);
        ListenerId(id)
    }

    pub fn remove_listener(&mut self, id: ListenerId) {
        self.listeners.shift_remove(&id.0);
    }

    /// Fans an event out to every registered listener, in insertion
    /// order. A failing listener is logged and does not block delivery to
    /// the rest, nor does it unwind the operation that triggered the
    /// event.
    fn notify<F>(&mut self, mut f: F)
    where
        F: FnMut(&mut dyn Listener) -> Result<(), ListenerError>,
    {
        for (idx, listener) in self.listeners.iter_mut() {
            if let Err(e) = f(listener.as_mut()) {
                warn!("listener {idx} failed: {e}");
            }
        }
    }

    // ===== stream creation =====

    /// Implements `Endpoint::create_stream`; see [`EndpointRef::create_stream`].
    fn create_stream(
        &mut self,
        side: Side,
        stream_id: StreamId,
        half_closed: bool,
    ) -> Result<StreamId, Error> {
        if self.is_go_away() {
            return Err(ProtocolError::GoAway.into());
        }

        let is_server = self.endpoint(side).is_server();
        if !stream_id.has_parity_for(is_server) {
            return Err(ProtocolError::WrongParity { id: stream_id, is_server }.into());
        }

        let next = self
            .endpoint(side)
            .next_stream_id()
            .ok_or(ProtocolError::IdSpaceExhausted)?;
        if stream_id < next {
            return Err(ProtocolError::NotMonotonic { id: stream_id, next }.into());
        }

        if self.streams.len() + 1 > self.max_streams as usize {
            return Err(ProtocolError::MaxStreamsExceeded { max_streams: self.max_streams }.into());
        }

        let disposition = match (half_closed, side) {
            (false, _) => InitialDisposition::Open,
            (true, Side::Local) => InitialDisposition::HalfClosedLocal,
            (true, Side::Remote) => InitialDisposition::HalfClosedRemote,
        };
        let initial_state = match disposition {
            InitialDisposition::Open => StreamState::Open,
            InitialDisposition::HalfClosedLocal => StreamState::HalfClosedLocal,
            InitialDisposition::HalfClosedRemote => StreamState::HalfClosedRemote,
        };

        self.advance_counter(side, stream_id);
        self.register_stream(stream_id, initial_state);

        trace!("created stream {stream_id} as {initial_state}");
        Ok(stream_id)
    }

    /// Implements `Endpoint::reserve_push_stream`; see
    /// [`EndpointRef::reserve_push_stream`].
    fn reserve_push_stream(
        &mut self,
        side: Side,
        stream_id: StreamId,
        parent_id: StreamId,
    ) -> Result<StreamId, Error> {
        if self.is_go_away() {
            return Err(ProtocolError::GoAway.into());
        }

        let parent = self
            .stream(parent_id)
            .ok_or(ProtocolError::MissingParent(parent_id))?;
        let parent_open = match side {
            Side::Local => parent.local_side_open(),
            Side::Remote => parent.remote_side_open(),
        };
        if !parent_open {
            return Err(ProtocolError::AssociatedStreamClosed(parent_id).into());
        }

        if !self.endpoint(side.opposite()).allow_push_to() {
            return Err(ProtocolError::PushNotAllowed.into());
        }

        let is_server = self.endpoint(side).is_server();
        if !stream_id.has_parity_for(is_server) {
            return Err(ProtocolError::WrongParity { id: stream_id, is_server }.into());
        }
        let next = self
            .endpoint(side)
            .next_stream_id()
            .ok_or(ProtocolError::IdSpaceExhausted)?;
        if stream_id < next {
            return Err(ProtocolError::NotMonotonic { id: stream_id, next }.into());
        }
        if self.streams.len() + 1 > self.max_streams as usize {
            return Err(ProtocolError::MaxStreamsExceeded { max_streams: self.max_streams }.into());
        }

        let reserved_state = match side {
            Side::Local => StreamState::ReservedLocal,
            Side::Remote => StreamState::ReservedRemote,
        };

        self.advance_counter(side, stream_id);
        self.register_stream(stream_id, reserved_state);

        trace!("reserved stream {stream_id} as {reserved_state}, parent {parent_id}");
        Ok(stream_id)
    }

    fn advance_counter(&mut self, side: Side, stream_id: StreamId) {
        let endpoint = self.endpoint_mut(side);
        endpoint.next_id = match stream_id.checked_add2() {
            Some(next) => IdCounter::Next(next),
            None => IdCounter::Exhausted,
        };
        endpoint.set_last_stream_created(stream_id);
    }

    /// Attaches a freshly allocated stream under the connection stream,
    /// inserts it into the registry, fires `stream_added`, and activates
    /// it if its initial state is one that counts as active.
    fn register_stream(&mut self, id: StreamId, state: StreamState) {
        let mut stream = Stream::new(id);
        stream.state = state;
        self.streams.insert(id, stream);
        self.attach(id, CONNECTION_STREAM_ID, false);

        self.notify(|l| l.stream_added(id));

        if state.is_active() {
            self.activate(id);
        }
    }

    fn activate(&mut self, id: StreamId) {
        self.active_streams.insert(id, ());
        self.notify(|l| l.stream_active(id));
    }

    fn deactivate(&mut self, id: StreamId) {
        if self.active_streams.shift_remove(&id).is_some() {
            self.notify(|l| l.stream_inactive(id));
        }
    }

    // ===== removal =====

    fn drain_removals(&mut self) {
        loop {
            let next = self.removal_queue.borrow_mut().pop_front();
            match next {
                Some(id) => self.remove_stream(id),
                None => break,
            }
        }
    }

    fn remove_stream(&mut self, id: StreamId) {
        if id.is_connection() || !self.streams.contains_key(&id) {
            return;
        }
        self.notify(|l| l.stream_removed(id));
        self.detach_promote(id);
        self.streams.shift_remove(&id);
        trace!("removed stream {id}");
    }

    // ===== priority tree mutators =====

    /// Attaches `child` under `parent`. If `exclusive`, `parent`'s
    /// existing children are first moved to become non-exclusive children
    /// of `child`.
    fn attach(&mut self, child: StreamId, parent: StreamId, exclusive: bool) {
        if exclusive {
            let former_children: Vec<StreamId> = self.streams[&parent]
                .children
                .keys()
                .copied()
                .filter(|&c| c != child)
                .collect();
            for former_child in former_children {
                self.detach_branch(former_child);
                self.attach(former_child, child, false);
            }
        }

        let parent_node = self.streams.get_mut(&parent).expect("parent must exist");
        if parent_node.children.insert(child, ()).is_none() {
            let weight = self.streams[&child].weight as u32;
            self.streams.get_mut(&parent).unwrap().total_child_weights += weight;
        }
        self.streams.get_mut(&child).unwrap().parent = Some(parent);
    }

    /// Detaches `child` from its parent, keeping `child`'s own subtree
    /// intact. Used both by `set_priority` (the subtree must move as a
    /// whole) and as the first step of `detach_promote`.
    fn detach_branch(&mut self, child: StreamId) {
        let parent_id = match self.streams[&child].parent {
            Some(p) => p,
            None => return,
        };
        let weight = self.streams[&child].weight as u32;
        if let Some(parent) = self.streams.get_mut(&parent_id) {
            if parent.children.shift_remove(&child).is_some() {
                parent.total_child_weights = parent.total_child_weights.saturating_sub(weight);
            }
        }
        self.streams.get_mut(&child).unwrap().parent = None;
    }

    /// Dependency-promoting removal: detaches `id` and re-parents its
    /// children to become direct children of `id`'s former parent. Used
    /// only when `id` is being permanently deleted from the tree.
    fn detach_promote(&mut self, id: StreamId) {
        let parent_id = self.streams[&id].parent.unwrap_or(CONNECTION_STREAM_ID);
        let grandchildren: Vec<StreamId> = self.streams[&id].children.keys().copied().collect();

        self.detach_branch(id);

        for grandchild in grandchildren {
            self.detach_branch(grandchild);
            self.attach(grandchild, parent_id, false);
        }
    }

    /// `true` if `node` has `ancestor` somewhere on its parent chain
    /// (excluding `node` itself).
    fn is_ancestor_of(&self, ancestor: StreamId, node: StreamId) -> bool {
        let mut cursor = self.streams.get(&node).and_then(|s| s.parent);
        while let Some(p) = cursor {
            if p == ancestor {
                return true;
            }
            cursor = self.streams.get(&p).and_then(|s| s.parent);
        }
        false
    }

    fn set_priority(
        &mut self,
        id: StreamId,
        new_parent_id: StreamId,
        weight: u16,
        exclusive: bool,
    ) -> Result<(), Error> {
        if id.is_connection() {
            return Err(UserError::ConnectionStreamImmutable.into());
        }
        if !(MIN_WEIGHT..=MAX_WEIGHT).contains(&weight) {
            return Err(UserError::InvalidWeight(weight).into());
        }
        if new_parent_id == id {
            return Err(UserError::SelfDependency(id).into());
        }
        if !self.streams.contains_key(&new_parent_id) {
            return Err(ProtocolError::StreamNotFound(new_parent_id).into());
        }

        let old_parent_id = self.streams[&id].parent.expect("non-root stream has a parent");
        let old_weight = self.streams[&id].weight as u32;
        let new_weight = weight as u32;

        self.streams.get_mut(&id).unwrap().weight = weight;
        if let Some(old_parent) = self.streams.get_mut(&old_parent_id) {
            old_parent.total_child_weights =
                old_parent.total_child_weights + new_weight - old_weight;
        }

        let need_to_restructure = self.is_ancestor_of(id, new_parent_id);

        if new_parent_id == old_parent_id && !exclusive {
            return Ok(());
        }

        self.detach_branch(id);

        if need_to_restructure {
            self.detach_branch(new_parent_id);
            self.attach(new_parent_id, old_parent_id, false);
        }

        self.attach(id, new_parent_id, exclusive);

        if need_to_restructure {
            self.notify(|l| l.stream_priority_subtree_changed(id, new_parent_id));
        } else {
            self.notify(|l| l.stream_priority_changed(id, old_parent_id));
        }

        Ok(())
    }

    // ===== stream state transitions (invoked through `StreamHandle`) =====

    fn open_for_push(&mut self, id: StreamId) -> Result<(), Error> {
        if id.is_connection() {
            return Err(UserError::ConnectionStreamImmutable.into());
        }
        let current = self.streams[&id].state;
        let next = state::open_for_push(current).ok_or(ProtocolError::NotReserved(id))?;
        self.streams.get_mut(&id).unwrap().state = next;
        self.activate(id);
        Ok(())
    }

    fn close_local_side(&mut self, id: StreamId) -> Result<(), Error> {
        if id.is_connection() {
            return Err(UserError::ConnectionStreamImmutable.into());
        }
        let current = self.streams[&id].state;
        let next = state::close_local_side(current).ok_or(ProtocolError::UnexpectedState {
            id,
            reason: "cannot close local side from this state",
        })?;
        self.apply_close_transition(id, current, next);
        Ok(())
    }

    fn close_remote_side(&mut self, id: StreamId) -> Result<(), Error> {
        if id.is_connection() {
            return Err(UserError::ConnectionStreamImmutable.into());
        }
        let current = self.streams[&id].state;
        let next = state::close_remote_side(current).ok_or(ProtocolError::UnexpectedState {
            id,
            reason: "cannot close remote side from this state",
        })?;
        self.apply_close_transition(id, current, next);
        Ok(())
    }

    fn close(&mut self, id: StreamId) -> Result<(), Error> {
        if id.is_connection() {
            return Err(UserError::ConnectionStreamImmutable.into());
        }
        let current = self.streams[&id].state;
        if current.is_closed() {
            return Ok(());
        }
        self.apply_close_transition(id, current, StreamState::Closed);
        Ok(())
    }

    fn apply_close_transition(&mut self, id: StreamId, current: StreamState, next: StreamState) {
        if next == current {
            return; // idempotent half-close on an already half-closed stream
        }

        self.streams.get_mut(&id).unwrap().state = next;

        if current == StreamState::Open && next != StreamState::Closed {
            self.notify(|l| l.stream_half_closed(id));
        }

        if next == StreamState::Closed {
            if current.is_active() {
                self.deactivate(id);
            }
            self.removal_policy.mark_for_removal(id);
            self.drain_removals();
        }
    }
}

/// A handle for one side of a [`Connection`], borrowing it mutably for
/// the handle's lifetime. Exposes the operations the specification
/// attributes to `Endpoint`, which need registry-wide access
/// (`create_stream`, `reserve_push_stream`) alongside the plain
/// role-local accessors forwarded to the underlying [`Endpoint`].
pub struct EndpointRef<'a> {
    connection: &'a mut Connection,
    side: Side,
}

impl<'a> EndpointRef<'a> {
    pub fn is_server(&self) -> bool {
        self.connection.endpoint(self.side).is_server()
    }

    pub fn next_stream_id(&self) -> Option<StreamId> {
        self.connection.endpoint(self.side).next_stream_id()
    }

    pub fn last_stream_created(&self) -> Option<StreamId> {
        self.connection.endpoint(self.side).last_stream_created()
    }

    pub fn allow_compressed_data(&self) -> bool {
        self.connection.endpoint(self.side).allow_compressed_data()
    }

    pub fn set_allow_compressed_data(&mut self, allow: bool) {
        self.connection
            .endpoint_mut(self.side)
            .set_allow_compressed_data(allow);
    }

    pub fn allow_push_to(&self) -> bool {
        self.connection.endpoint(self.side).allow_push_to()
    }

    pub fn set_allow_push_to(&mut self, allow: bool) -> Result<(), Error> {
        self.connection
            .endpoint_mut(self.side)
            .set_allow_push_to(allow)
            .map_err(Error::from)
    }

    pub fn max_streams(&self) -> u32 {
        self.connection.max_streams
    }

    pub fn set_max_streams(&mut self, max_streams: u32) {
        self.connection.max_streams = max_streams;
    }

    pub fn opposite(&mut self) -> EndpointRef<'_> {
        EndpointRef { connection: self.connection, side: self.side.opposite() }
    }

    /// Creates and activates (or half-activates) a new stream owned by
    /// this endpoint. See §4.3 of the crate's design documentation for
    /// the full precondition list.
    pub fn create_stream(&mut self, stream_id: StreamId, half_closed: bool) -> Result<StreamId, Error> {
        self.connection.create_stream(self.side, stream_id, half_closed)
    }

    /// Reserves a push stream associated with `parent`. The new stream is
    /// added to the registry and tree but is not activated until
    /// [`StreamHandle::open_for_push`] is called.
    pub fn reserve_push_stream(
        &mut self,
        stream_id: StreamId,
        parent: StreamId,
    ) -> Result<StreamId, Error> {
        self.connection
            .reserve_push_stream(self.side, stream_id, parent)
    }
}

/// A handle for one [`Stream`], borrowing its owning [`Connection`]
/// mutably. Needed because mutating a stream's priority or state touches
/// more than its own registry entry (its parent, its new parent, the
/// active set, the listener set).
pub struct StreamHandle<'a> {
    connection: &'a mut Connection,
    id: StreamId,
}

impl<'a> StreamHandle<'a> {
    fn stream(&self) -> &Stream {
        &self.connection.streams[&self.id]
    }

    pub fn id(&self) -> StreamId {
        self.id
    }

    pub fn state(&self) -> StreamState {
        self.stream().state()
    }

    pub fn weight(&self) -> u16 {
        self.stream().weight()
    }

    pub fn total_child_weights(&self) -> u32 {
        self.stream().total_child_weights()
    }

    pub fn parent(&self) -> Option<StreamId> {
        self.stream().parent()
    }

    pub fn children(&self) -> Vec<StreamId> {
        self.stream().children().collect()
    }

    pub fn child(&self, id: StreamId) -> Option<StreamId> {
        if self.stream().has_child(id) {
            Some(id)
        } else {
            None
        }
    }

    pub fn has_child(&self, id: StreamId) -> bool {
        self.stream().has_child(id)
    }

    pub fn num_children(&self) -> usize {
        self.stream().num_children()
    }

    pub fn is_leaf(&self) -> bool {
        self.stream().is_leaf()
    }

    pub fn is_root(&self) -> bool {
        self.stream().is_root()
    }

    pub fn is_descendant_of(&self, other: StreamId) -> bool {
        self.connection.is_ancestor_of(other, self.id)
    }

    pub fn local_side_open(&self) -> bool {
        self.stream().local_side_open()
    }

    pub fn remote_side_open(&self) -> bool {
        self.stream().remote_side_open()
    }

    pub fn verify_state(
        &self,
        allowed: &[StreamState],
        reason: &'static str,
    ) -> Result<(), Error> {
        self.stream().verify_state(allowed, reason).map_err(Error::from)
    }

    pub fn inbound_flow(&self) -> Option<&dyn std::any::Any> {
        self.stream().inbound_flow()
    }

    pub fn outbound_flow(&self) -> Option<&dyn std::any::Any> {
        self.stream().outbound_flow()
    }

    pub fn set_inbound_flow(&mut self, slot: Box<dyn std::any::Any>) {
        self.connection
            .streams
            .get_mut(&self.id)
            .unwrap()
            .set_inbound_flow(slot);
    }

    pub fn set_outbound_flow(&mut self, slot: Box<dyn std::any::Any>) {
        self.connection
            .streams
            .get_mut(&self.id)
            .unwrap()
            .set_outbound_flow(slot);
    }

    pub fn set_priority(&mut self, parent: StreamId, weight: u16, exclusive: bool) -> Result<(), Error> {
        self.connection.set_priority(self.id, parent, weight, exclusive)
    }

    pub fn open_for_push(&mut self) -> Result<(), Error> {
        self.connection.open_for_push(self.id)
    }

    pub fn close(&mut self) -> Result<(), Error> {
        self.connection.close(self.id)
    }

    pub fn close_local_side(&mut self) -> Result<(), Error> {
        self.connection.close_local_side(self.id)
    }

    pub fn close_remote_side(&mut self) -> Result<(), Error> {
        self.connection.close_remote_side(self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listener::test_support::{FailingListener, RecordingListener};

    fn new_client() -> Connection {
        Connection::new(ConnectionConfig { is_server: false, ..Default::default() })
    }

    fn new_server() -> Connection {
        Connection::new(ConnectionConfig { is_server: true, ..Default::default() })
    }

    #[test]
    fn connection_stream_is_rooted_and_present() {
        let conn = new_client();
        assert_eq!(conn.connection_stream().id(), CONNECTION_STREAM_ID);
        assert!(conn.stream(CONNECTION_STREAM_ID).is_some());
        assert_eq!(conn.num_active_streams(), 0);
    }

    #[test]
    fn client_creates_half_closes_closes() {
        let mut conn = new_client();
        assert_eq!(conn.local().next_stream_id(), Some(StreamId::new(3)));

        conn.local().create_stream(StreamId::new(3), false).unwrap();
        {
            let s = conn.stream(StreamId::new(3)).unwrap();
            assert_eq!(s.state(), StreamState::Open);
        }
        assert_eq!(conn.num_active_streams(), 1);

        conn.stream_mut(StreamId::new(3)).unwrap().close_local_side().unwrap();
        assert_eq!(conn.stream(StreamId::new(3)).unwrap().state(), StreamState::HalfClosedLocal);

        conn.stream_mut(StreamId::new(3)).unwrap().close_remote_side().unwrap();
        assert!(conn.stream(StreamId::new(3)).is_none());
        assert_eq!(conn.num_active_streams(), 0);
        assert!(conn.stream(CONNECTION_STREAM_ID).is_some());
    }

    #[test]
    fn exclusive_reparenting_moves_siblings() {
        let mut conn = new_client();
        conn.local().create_stream(StreamId::new(3), false).unwrap();
        conn.local().create_stream(StreamId::new(5), false).unwrap();
        conn.local().create_stream(StreamId::new(7), false).unwrap();

        conn.stream_mut(StreamId::new(7))
            .unwrap()
            .set_priority(CONNECTION_STREAM_ID, 16, true)
            .unwrap();

        let root = conn.connection_stream();
        assert_eq!(root.num_children(), 1);
        assert!(root.has_child(StreamId::new(7)));
        assert_eq!(root.total_child_weights(), 16);

        let seven = conn.stream(StreamId::new(7)).unwrap();
        assert_eq!(seven.children().collect::<Vec<_>>(), vec![StreamId::new(3), StreamId::new(5)]);
        assert_eq!(seven.total_child_weights(), 32);
    }

    #[test]
    fn reparent_under_own_descendant_hoists() {
        let mut conn = new_client();
        conn.local().create_stream(StreamId::new(3), false).unwrap();
        conn.stream_mut(StreamId::new(3))
            .unwrap()
            .set_priority(CONNECTION_STREAM_ID, 16, false)
            .unwrap();
        conn.local().create_stream(StreamId::new(5), false).unwrap();
        conn.stream_mut(StreamId::new(5))
            .unwrap()
            .set_priority(StreamId::new(3), 16, false)
            .unwrap();

        let listener = RecordingListener::default();
        let listener_id = conn.add_listener(Box::new(listener));

        conn.stream_mut(StreamId::new(3))
            .unwrap()
            .set_priority(StreamId::new(5), 16, false)
            .unwrap();

        assert_eq!(conn.stream(StreamId::new(5)).unwrap().parent(), Some(CONNECTION_STREAM_ID));
        assert_eq!(conn.stream(StreamId::new(3)).unwrap().parent(), Some(StreamId::new(5)));

        conn.remove_listener(listener_id);
    }

    #[test]
    fn push_promise_from_server() {
        let mut conn = new_server();
        conn.remote().create_stream(StreamId::new(3), false).unwrap();

        conn.local()
            .reserve_push_stream(StreamId::new(2), StreamId::new(3))
            .unwrap();
        assert_eq!(conn.stream(StreamId::new(2)).unwrap().state(), StreamState::ReservedLocal);
        assert_eq!(conn.num_active_streams(), 1); // only stream 3

        conn.stream_mut(StreamId::new(2)).unwrap().open_for_push().unwrap();
        assert_eq!(conn.stream(StreamId::new(2)).unwrap().state(), StreamState::HalfClosedRemote);
        assert_eq!(conn.num_active_streams(), 2);
    }

    #[test]
    fn wrong_parity_rejected() {
        let mut conn = new_client();
        let err = conn.local().create_stream(StreamId::new(4), false).unwrap_err();
        assert!(matches!(err, Error::Protocol(ProtocolError::WrongParity { .. })));
    }

    #[test]
    fn goaway_blocks_creation_but_not_existing_streams() {
        let mut conn = new_client();
        conn.local().create_stream(StreamId::new(3), false).unwrap();
        conn.mark_go_away_received();

        let err = conn.local().create_stream(StreamId::new(5), false).unwrap_err();
        assert!(matches!(err, Error::Protocol(ProtocolError::GoAway)));

        conn.stream_mut(StreamId::new(3)).unwrap().close().unwrap();
        assert!(conn.stream(StreamId::new(3)).is_none());
    }

    #[test]
    fn listener_failure_does_not_block_other_listeners() {
        let mut conn = new_client();
        conn.add_listener(Box::new(FailingListener::default()));
        let recorder_id = {
            let recorder = RecordingListener::default();
            conn.add_listener(Box::new(recorder))
        };
        conn.local().create_stream(StreamId::new(3), false).unwrap();
        conn.remove_listener(recorder_id);
        // No panic, and the create_stream call above completed normally.
        assert!(conn.stream(StreamId::new(3)).is_some());
    }

    #[test]
    fn connection_stream_rejects_mutation() {
        let mut conn = new_client();
        let err = conn
            .stream_mut(CONNECTION_STREAM_ID)
            .unwrap()
            .close()
            .unwrap_err();
        assert!(matches!(err, Error::User(UserError::ConnectionStreamImmutable)));
    }

    #[test]
    fn max_streams_counts_the_connection_stream() {
        let mut conn = Connection::new(ConnectionConfig {
            is_server: false,
            max_streams: 2,
            ..Default::default()
        });
        conn.local().create_stream(StreamId::new(3), false).unwrap();
        let err = conn.local().create_stream(StreamId::new(5), false).unwrap_err();
        assert!(matches!(err, Error::Protocol(ProtocolError::MaxStreamsExceeded { .. })));
    }

    #[test]
    fn weight_delta_preserved_across_reparent() {
        let mut conn = new_client();
        conn.local().create_stream(StreamId::new(3), false).unwrap();
        conn.local().create_stream(StreamId::new(5), false).unwrap();

        conn.stream_mut(StreamId::new(3))
            .unwrap()
            .set_priority(CONNECTION_STREAM_ID, 200, false)
            .unwrap();
        let root_total_before = conn.connection_stream().total_child_weights();

        conn.stream_mut(StreamId::new(3))
            .unwrap()
            .set_priority(StreamId::new(5), 200, false)
            .unwrap();
        let root_total_after = conn.connection_stream().total_child_weights();

        assert_eq!(root_total_after, root_total_before - 200);
    }
}
