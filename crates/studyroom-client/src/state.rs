//! Shared State Reducer.
//!
//! Local projection of the room, replaced wholesale by server snapshots.
//!
//! # Invariants
//!
//! - State changes only through [`RoomState::apply`] with an inbound event.
//! - Resource and participant lists always equal the latest list the server
//!   sent; nothing is merged or deduplicated locally.
//! - `room_state` replaces resources, selection and participants in one
//!   assignment. Messages are never replaced.
//!
//! There are no sequence numbers on the wire, so a delayed older snapshot
//! overwrites a newer one. The reducer does not try to detect this.

use studyroom_proto::{
    ChatMessage, InboundEvent, Participant, ParticipantId, PreviewUpdate, Resource, ResourceUpdate,
    RoomSnapshot,
};

/// User-facing notification derived from an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// Someone shared a resource.
    ResourceShared {
        /// Who shared it.
        sender: String,
        /// What was shared.
        resource: Resource,
    },
    /// Someone changed the selected resource.
    PreviewChanged {
        /// Who changed it.
        sender: String,
        /// New selection, `None` when cleared.
        resource: Option<Resource>,
    },
    /// A pending upload took too long and was abandoned.
    UploadExpired {
        /// File name.
        name: String,
    },
}

/// Local view of a room's shared state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoomState {
    messages: Vec<ChatMessage>,
    resources: Vec<Resource>,
    selected_resource: Option<Resource>,
    participants: Vec<Participant>,
}

impl RoomState {
    /// Empty state, before any server event.
    pub fn new() -> Self {
        Self::default()
    }

    /// Chat history in arrival order.
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Shared resources, exactly as last sent by the server.
    pub fn resources(&self) -> &[Resource] {
        &self.resources
    }

    /// Resource currently shown to everyone.
    pub fn selected_resource(&self) -> Option<&Resource> {
        self.selected_resource.as_ref()
    }

    /// Participants, exactly as last sent by the server.
    pub fn participants(&self) -> &[Participant] {
        &self.participants
    }

    /// Look up a participant by id.
    pub fn participant(&self, id: &ParticipantId) -> Option<&Participant> {
        self.participants.iter().find(|p| &p.id == id)
    }

    /// Whether the selection is empty or one of the known resources.
    ///
    /// May be transiently false: the server can announce a selection before
    /// the resource list that contains it.
    pub fn is_selection_known(&self) -> bool {
        self.selected_resource.as_ref().is_none_or(|s| self.resources.contains(s))
    }

    /// Apply one inbound event.
    pub fn apply(&mut self, event: &InboundEvent) -> Option<Notice> {
        match event {
            InboundEvent::NewMessage(message) => {
                self.messages.push(message.clone());
                None
            },
            InboundEvent::ResourceUpdated(update) => self.apply_resources(update),
            InboundEvent::PreviewUpdated(update) => self.apply_preview(update),
            InboundEvent::ParticipantsUpdated(update) => {
                self.participants.clone_from(&update.participants);
                None
            },
            InboundEvent::RoomState(snapshot) => {
                self.apply_snapshot(snapshot);
                None
            },
        }
    }

    fn apply_resources(&mut self, update: &ResourceUpdate) -> Option<Notice> {
        self.resources.clone_from(&update.resources);

        match (&update.latest_resource, &update.sender) {
            (Some(resource), Some(sender)) => {
                Some(Notice::ResourceShared { sender: sender.clone(), resource: resource.clone() })
            },
            _ => None,
        }
    }

    fn apply_preview(&mut self, update: &PreviewUpdate) -> Option<Notice> {
        self.selected_resource.clone_from(&update.resource);

        update.sender.as_ref().map(|sender| Notice::PreviewChanged {
            sender: sender.clone(),
            resource: update.resource.clone(),
        })
    }

    fn apply_snapshot(&mut self, snapshot: &RoomSnapshot) {
        let RoomSnapshot { resources, selected_resource, participants } = snapshot.clone();
        (self.resources, self.selected_resource, self.participants) =
            (resources, selected_resource, participants);
    }
}
