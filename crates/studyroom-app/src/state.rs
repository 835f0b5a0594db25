//! Observable application state types.
//!
//! These structures are the view model: what the UI needs to draw the room,
//! the notifications and the assistant panel.

use std::fmt;

use studyroom_client::RoomState;
use studyroom_proto::{Participant, ParticipantId, Resource, RoomId, http::ServiceKind};
use url::Url;

/// The room as the UI shows it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomView {
    /// Room identifier.
    pub room_id: RoomId,
    /// Whether we created the room.
    pub is_host: bool,
    /// Invitation link. `None` when the share base cannot carry a path.
    pub share_link: Option<Url>,
    /// Our participant id. `None` until joined.
    pub participant_id: Option<ParticipantId>,
    /// Latest shared state from the server.
    pub state: RoomState,
    /// Participants with the local mute overlay applied.
    pub participants: Vec<Participant>,
}

impl RoomView {
    /// Empty view of a room.
    pub fn new(room_id: RoomId, is_host: bool, share_link: Option<Url>) -> Self {
        Self {
            room_id,
            is_host,
            share_link,
            participant_id: None,
            state: RoomState::new(),
            participants: Vec::new(),
        }
    }

    /// Resource at a 1-based position.
    pub fn resource_at(&self, index: usize) -> Option<&Resource> {
        index.checked_sub(1).and_then(|i| self.state.resources().get(i))
    }

    /// Participant at a 1-based position.
    pub fn participant_at(&self, index: usize) -> Option<&Participant> {
        index.checked_sub(1).and_then(|i| self.participants.get(i))
    }

    /// Whether a participant is us.
    pub fn is_me(&self, participant: &Participant) -> bool {
        self.participant_id.as_ref() == Some(&participant.id)
    }
}

/// Toast severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastLevel {
    /// Informational.
    Info,
    /// Something failed.
    Error,
}

/// Short-lived notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    /// Severity.
    pub level: ToastLevel,
    /// Text shown to the user.
    pub text: String,
}

impl Toast {
    /// Informational toast.
    pub fn info(text: impl Into<String>) -> Self {
        Self { level: ToastLevel::Info, text: text.into() }
    }

    /// Error toast.
    pub fn error(text: impl Into<String>) -> Self {
        Self { level: ToastLevel::Error, text: text.into() }
    }
}

impl fmt::Display for Toast {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.level {
            ToastLevel::Info => f.write_str(&self.text),
            ToastLevel::Error => write!(f, "Error: {}", self.text),
        }
    }
}

/// One assistant exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssistantEntry {
    /// Service that answered.
    pub kind: ServiceKind,
    /// Question asked, for the chat service.
    pub prompt: Option<String>,
    /// Reply text. For audio, the server path of the generated file.
    pub reply: String,
}
