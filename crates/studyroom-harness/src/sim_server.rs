//! In-memory room server for simulation.
//!
//! `SimServer` is the authority the clients synchronize against. It applies
//! outbound events to its own room state and queues the resulting broadcasts
//! per connection, where a driver or a [`crate::TestCluster`] picks them up.
//!
//! # Broadcast Rules
//!
//! - `join`: `room_state` to the joiner, then `participants_updated` to the
//!   room (joiner included)
//! - `message`: `new_message` to the room, sender included
//! - `resource_added` / `resource_removed`: the full list in
//!   `resource_updated`
//! - removing the last copy of the selected resource clears the selection
//!   with a `preview_updated` sent before the list update
//! - `resource_selected`: `preview_updated` to the room, for known resources
//!   only
//! - `leave` or disconnect: `participants_updated` to whoever remains
//!
//! Rooms are created on first join and dropped when the last member leaves.
//! Events for a room the connection has not joined are ignored.

#![allow(clippy::disallowed_types, reason = "Synchronous locking operations only")]

use std::{
    collections::{BTreeMap, VecDeque},
    sync::{Arc, Mutex},
};

use studyroom_app::ChannelEvent;
use studyroom_proto::{
    ChatMessage, InboundEvent, OutboundEvent, Participant, ParticipantsUpdate, PreviewUpdate,
    Resource, ResourceUpdate, RoomId, RoomSnapshot,
};

/// Server-side state of one room.
#[derive(Debug, Clone, Default)]
pub struct SimRoom {
    resources: Vec<Resource>,
    selected_resource: Option<Resource>,
    members: Vec<(String, Participant)>,
    messages: Vec<ChatMessage>,
}

impl SimRoom {
    /// Shared resources in insertion order.
    pub fn resources(&self) -> &[Resource] {
        &self.resources
    }

    /// Current selection.
    pub fn selected_resource(&self) -> Option<&Resource> {
        self.selected_resource.as_ref()
    }

    /// Members in join order.
    pub fn participants(&self) -> Vec<Participant> {
        self.members.iter().map(|(_, p)| p.clone()).collect()
    }

    /// Every message posted since the room was created.
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    fn snapshot(&self) -> RoomSnapshot {
        RoomSnapshot {
            resources: self.resources.clone(),
            selected_resource: self.selected_resource.clone(),
            participants: self.participants(),
        }
    }

    fn member_name(&self, connection_id: &str) -> Option<String> {
        self.members.iter().find(|(c, _)| c == connection_id).map(|(_, p)| p.name.clone())
    }
}

#[derive(Default)]
struct SimConnection {
    room: Option<RoomId>,
    inbox: VecDeque<InboundEvent>,
    closed: Option<String>,
}

/// Authoritative in-memory room server.
#[derive(Default)]
pub struct SimServer {
    rooms: BTreeMap<RoomId, SimRoom>,
    connections: BTreeMap<String, SimConnection>,
    next_connection: u64,
    unavailable: Option<String>,
}

impl SimServer {
    /// Create an empty server that accepts connections.
    pub fn new() -> Self {
        Self::default()
    }

    /// Refuse new connections with `reason`, or accept them again on `None`.
    pub fn set_unavailable(&mut self, reason: Option<String>) {
        self.unavailable = reason;
    }

    /// Accept a connection and return its id.
    pub fn connect(&mut self) -> Result<String, String> {
        if let Some(reason) = &self.unavailable {
            return Err(reason.clone());
        }

        self.next_connection += 1;
        let connection_id = format!("sim{:04}", self.next_connection);
        self.connections.insert(connection_id.clone(), SimConnection::default());

        tracing::debug!(%connection_id, "connection accepted");
        Ok(connection_id)
    }

    /// The client closed its connection. Idempotent.
    pub fn disconnect(&mut self, connection_id: &str) {
        if self.connections.contains_key(connection_id) {
            self.remove_member(connection_id);
            self.connections.remove(connection_id);
            tracing::debug!(%connection_id, "connection closed by client");
        }
    }

    /// Drop a connection from the server side.
    ///
    /// Broadcasts already queued are still delivered, then the connection
    /// reports [`ChannelEvent::Closed`] with `reason`.
    pub fn close(&mut self, connection_id: &str, reason: &str) {
        self.remove_member(connection_id);
        if let Some(connection) = self.connections.get_mut(connection_id) {
            connection.closed = Some(reason.to_string());
            tracing::debug!(%connection_id, reason, "connection closed by server");
        }
    }

    /// Apply an event received on `connection_id`.
    pub fn handle(&mut self, connection_id: &str, event: OutboundEvent) {
        let open = self.connections.get(connection_id).is_some_and(|c| c.closed.is_none());
        if !open {
            tracing::warn!(%connection_id, event = event.name(), "event on unknown connection");
            return;
        }

        match event {
            OutboundEvent::Join(payload) => {
                self.join(connection_id, payload.room_id, payload.participant);
            },
            OutboundEvent::Leave(payload) => {
                if self.room_of(connection_id) == Some(&payload.room_id) {
                    self.remove_member(connection_id);
                }
            },
            OutboundEvent::Message(payload) => {
                let Some(room) = self.member_room(connection_id, &payload.room_id) else {
                    return;
                };
                let message = ChatMessage { sender: payload.sender, content: payload.message };
                room.messages.push(message.clone());
                self.broadcast(&payload.room_id, &InboundEvent::NewMessage(message));
            },
            OutboundEvent::ResourceAdded(payload) => {
                let Some(room) = self.member_room(connection_id, &payload.room_id) else {
                    return;
                };
                room.resources.push(payload.resource.clone());
                let update = ResourceUpdate {
                    resources: room.resources.clone(),
                    latest_resource: Some(payload.resource),
                    sender: room.member_name(connection_id),
                };
                self.broadcast(&payload.room_id, &InboundEvent::ResourceUpdated(update));
            },
            OutboundEvent::ResourceRemoved(payload) => {
                self.remove_resource(connection_id, &payload.room_id, &payload.resource);
            },
            OutboundEvent::ResourceSelected(payload) => {
                let Some(room) = self.member_room(connection_id, &payload.room_id) else {
                    return;
                };
                if !room.resources.contains(&payload.resource) {
                    tracing::warn!(name = %payload.resource.name, "selection of unknown resource");
                    return;
                }
                room.selected_resource = Some(payload.resource.clone());
                let update = PreviewUpdate {
                    resource: Some(payload.resource),
                    sender: room.member_name(connection_id),
                };
                self.broadcast(&payload.room_id, &InboundEvent::PreviewUpdated(update));
            },
        }
    }

    /// Next thing the connection observes, if any.
    pub fn recv(&mut self, connection_id: &str) -> Option<ChannelEvent> {
        let connection = self.connections.get_mut(connection_id)?;
        if let Some(event) = connection.inbox.pop_front() {
            return Some(ChannelEvent::Received(event));
        }

        let reason = connection.closed.take()?;
        self.connections.remove(connection_id);
        Some(ChannelEvent::Closed { reason })
    }

    /// True when no connection has anything left to observe.
    pub fn is_quiescent(&self) -> bool {
        self.connections.values().all(|c| c.inbox.is_empty() && c.closed.is_none())
    }

    /// Room by id.
    pub fn room(&self, room_id: &RoomId) -> Option<&SimRoom> {
        self.rooms.get(room_id)
    }

    /// Number of live rooms.
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// Number of open connections.
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    fn join(&mut self, connection_id: &str, room_id: RoomId, participant: Participant) {
        if self.room_of(connection_id).is_some_and(|current| *current != room_id) {
            self.remove_member(connection_id);
        }

        let room = self.rooms.entry(room_id.clone()).or_insert_with(|| {
            tracing::info!(%room_id, "room created");
            SimRoom::default()
        });
        room.members.retain(|(c, _)| c != connection_id);
        room.members.push((connection_id.to_string(), participant));
        let snapshot = room.snapshot();
        let participants = room.participants();

        if let Some(connection) = self.connections.get_mut(connection_id) {
            connection.room = Some(room_id.clone());
            connection.inbox.push_back(InboundEvent::RoomState(snapshot));
        }
        self.broadcast(
            &room_id,
            &InboundEvent::ParticipantsUpdated(ParticipantsUpdate { participants }),
        );
    }

    fn remove_resource(&mut self, connection_id: &str, room_id: &RoomId, resource: &Resource) {
        let Some(room) = self.member_room(connection_id, room_id) else {
            return;
        };
        let Some(index) = room.resources.iter().position(|r| r == resource) else {
            tracing::warn!(name = %resource.name, "removal of unknown resource");
            return;
        };
        room.resources.remove(index);
        let sender = room.member_name(connection_id);

        let deselect = room.selected_resource.as_ref() == Some(resource)
            && !room.resources.contains(resource);
        let update = ResourceUpdate {
            resources: room.resources.clone(),
            latest_resource: None,
            sender: sender.clone(),
        };

        if deselect {
            room.selected_resource = None;
            let preview = PreviewUpdate { resource: None, sender };
            self.broadcast(room_id, &InboundEvent::PreviewUpdated(preview));
        }
        self.broadcast(room_id, &InboundEvent::ResourceUpdated(update));
    }

    fn remove_member(&mut self, connection_id: &str) {
        let Some(room_id) =
            self.connections.get_mut(connection_id).and_then(|c| c.room.take())
        else {
            return;
        };
        let Some(room) = self.rooms.get_mut(&room_id) else {
            return;
        };

        room.members.retain(|(c, _)| c != connection_id);
        if room.members.is_empty() {
            self.rooms.remove(&room_id);
            tracing::info!(%room_id, "room dropped");
            return;
        }

        let participants = room.participants();
        self.broadcast(
            &room_id,
            &InboundEvent::ParticipantsUpdated(ParticipantsUpdate { participants }),
        );
    }

    fn room_of(&self, connection_id: &str) -> Option<&RoomId> {
        self.connections.get(connection_id)?.room.as_ref()
    }

    fn member_room(&mut self, connection_id: &str, room_id: &RoomId) -> Option<&mut SimRoom> {
        if self.room_of(connection_id) != Some(room_id) {
            tracing::warn!(%connection_id, %room_id, "event for a room not joined");
            return None;
        }
        self.rooms.get_mut(room_id)
    }

    fn broadcast(&mut self, room_id: &RoomId, event: &InboundEvent) {
        let Some(room) = self.rooms.get(room_id) else {
            return;
        };
        for (connection_id, _) in &room.members {
            if let Some(connection) = self.connections.get_mut(connection_id) {
                connection.inbox.push_back(event.clone());
            }
        }
    }
}

/// Server handle shared between drivers.
pub type SharedSimServer = Arc<Mutex<SimServer>>;

/// Create a shared server for testing.
pub fn create_shared_server() -> SharedSimServer {
    Arc::new(Mutex::new(SimServer::new()))
}

#[cfg(test)]
mod tests {
    use studyroom_proto::{
        MembershipPayload, MessagePayload, ParticipantId, ResourceKind, ResourcePayload,
    };

    use super::*;

    fn room_id() -> RoomId {
        RoomId::new("lq3x9k2mab12cd34").unwrap()
    }

    fn join(server: &mut SimServer, name: &str) -> String {
        let connection_id = server.connect().unwrap();
        let participant = Participant::new(ParticipantId::new(&connection_id).unwrap(), name);
        server.handle(
            &connection_id,
            OutboundEvent::Join(MembershipPayload { room_id: room_id(), participant }),
        );
        connection_id
    }

    fn drain(server: &mut SimServer, connection_id: &str) -> Vec<InboundEvent> {
        std::iter::from_fn(|| match server.recv(connection_id) {
            Some(ChannelEvent::Received(event)) => Some(event),
            _ => None,
        })
        .collect()
    }

    fn payload(resource: &Resource) -> ResourcePayload {
        ResourcePayload { room_id: room_id(), resource: resource.clone() }
    }

    #[test]
    fn join_sends_snapshot_then_roster() {
        let mut server = SimServer::new();
        let alice = join(&mut server, "Alice");

        let events = drain(&mut server, &alice);
        assert!(matches!(events.as_slice(), [
            InboundEvent::RoomState(_),
            InboundEvent::ParticipantsUpdated(_)
        ]));
        assert_eq!(server.room_count(), 1);
    }

    #[test]
    fn message_reaches_sender_too() {
        let mut server = SimServer::new();
        let alice = join(&mut server, "Alice");
        let bob = join(&mut server, "Bob");
        drain(&mut server, &alice);
        drain(&mut server, &bob);

        server.handle(
            &alice,
            OutboundEvent::Message(MessagePayload {
                room_id: room_id(),
                message: "hi".into(),
                sender: "Alice".into(),
            }),
        );

        for connection in [&alice, &bob] {
            let events = drain(&mut server, connection);
            assert!(matches!(
                events.as_slice(),
                [InboundEvent::NewMessage(m)] if m.content == "hi"
            ));
        }
    }

    #[test]
    fn removing_selected_resource_clears_selection_first() {
        let mut server = SimServer::new();
        let alice = join(&mut server, "Alice");
        let video = Resource::new("Lecture", "https://youtu.be/abc123", ResourceKind::Youtube);

        server.handle(&alice, OutboundEvent::ResourceAdded(payload(&video)));
        server.handle(&alice, OutboundEvent::ResourceSelected(payload(&video)));
        drain(&mut server, &alice);

        server.handle(&alice, OutboundEvent::ResourceRemoved(payload(&video)));
        let events = drain(&mut server, &alice);

        assert!(matches!(events.as_slice(), [
            InboundEvent::PreviewUpdated(PreviewUpdate { resource: None, .. }),
            InboundEvent::ResourceUpdated(update)
        ] if update.resources.is_empty()));
        assert_eq!(server.room(&room_id()).unwrap().selected_resource(), None);
    }

    #[test]
    fn unknown_selection_is_ignored() {
        let mut server = SimServer::new();
        let alice = join(&mut server, "Alice");
        drain(&mut server, &alice);

        let notes = Resource::new("notes.pdf", "uploads/notes.pdf", ResourceKind::Pdf);
        server.handle(&alice, OutboundEvent::ResourceSelected(payload(&notes)));

        assert!(server.is_quiescent());
    }

    #[test]
    fn empty_room_is_dropped() {
        let mut server = SimServer::new();
        let alice = join(&mut server, "Alice");
        let bob = join(&mut server, "Bob");
        drain(&mut server, &bob);

        server.disconnect(&alice);
        let events = drain(&mut server, &bob);
        assert!(matches!(
            events.as_slice(),
            [InboundEvent::ParticipantsUpdated(u)] if u.participants.len() == 1
        ));

        server.disconnect(&bob);
        assert_eq!(server.room_count(), 0);
        assert_eq!(server.connection_count(), 0);
    }

    #[test]
    fn server_close_delivers_queued_events_first() {
        let mut server = SimServer::new();
        let alice = join(&mut server, "Alice");

        server.close(&alice, "kicked");

        assert!(matches!(server.recv(&alice), Some(ChannelEvent::Received(_))));
        assert!(matches!(server.recv(&alice), Some(ChannelEvent::Received(_))));
        assert_eq!(server.recv(&alice), Some(ChannelEvent::Closed { reason: "kicked".into() }));
        assert_eq!(server.recv(&alice), None);
        assert_eq!(server.room_count(), 0);
    }

    #[test]
    fn unavailable_server_refuses() {
        let mut server = SimServer::new();
        server.set_unavailable(Some("connection refused".into()));

        assert_eq!(server.connect(), Err("connection refused".to_string()));
    }
}
