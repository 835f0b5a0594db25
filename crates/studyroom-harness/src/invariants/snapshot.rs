//! Observable state snapshots for invariant checking.
//!
//! Snapshots capture the observable state of the system at a point in time.
//! Invariants operate on snapshots rather than live state to ensure
//! consistent, atomic checks.

use serde::Serialize;
use studyroom_app::{App, ConnectionState};
use studyroom_client::{Client, Environment};
use studyroom_proto::{ChatMessage, ParticipantId, Resource, RoomId};

/// Snapshot of the entire system state.
///
/// Contains observable state from one or more clients for invariant checking.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SystemSnapshot {
    /// Per-client state snapshots.
    pub clients: Vec<ClientSnapshot>,
}

impl SystemSnapshot {
    /// Create an empty snapshot (no clients).
    pub fn empty() -> Self {
        Self::default()
    }

    /// Create a snapshot with a single client.
    pub fn single(client: ClientSnapshot) -> Self {
        Self { clients: vec![client] }
    }

    /// Create a snapshot from multiple clients.
    pub fn from_clients(clients: Vec<ClientSnapshot>) -> Self {
        Self { clients }
    }

    /// Add a client snapshot.
    pub fn add_client(&mut self, client: ClientSnapshot) {
        self.clients.push(client);
    }
}

/// Snapshot of a single client's observable state.
#[derive(Debug, Clone, Serialize)]
pub struct ClientSnapshot {
    /// Client index within the simulation.
    pub id: usize,
    /// Room the client hosts or joins.
    pub room_id: RoomId,
    /// Whether the client currently counts as a room member.
    pub joined: bool,
    /// Shared resource list.
    pub resources: Vec<Resource>,
    /// Selected resource.
    pub selected_resource: Option<Resource>,
    /// Participant ids in server order.
    pub participants: Vec<ParticipantId>,
    /// Chat history in arrival order.
    pub messages: Vec<ChatMessage>,
}

impl ClientSnapshot {
    /// Capture a Sans-IO client.
    pub fn from_client<E: Environment>(id: usize, client: &Client<E>) -> Self {
        let state = client.state();
        Self {
            id,
            room_id: client.session().room_id().clone(),
            joined: client.is_joined(),
            resources: state.resources().to_vec(),
            selected_resource: state.selected_resource().cloned(),
            participants: state.participants().iter().map(|p| p.id.clone()).collect(),
            messages: state.messages().to_vec(),
        }
    }

    /// Capture the view model of an application.
    ///
    /// The view does not track departures, so `joined` only reflects an
    /// open channel with a known participant id.
    pub fn from_app(id: usize, app: &App) -> Self {
        let room = app.room();
        Self {
            id,
            room_id: room.room_id.clone(),
            joined: matches!(app.connection_state(), ConnectionState::Connected { .. })
                && room.participant_id.is_some(),
            resources: room.state.resources().to_vec(),
            selected_resource: room.state.selected_resource().cloned(),
            participants: room.participants.iter().map(|p| p.id.clone()).collect(),
            messages: room.state.messages().to_vec(),
        }
    }
}
