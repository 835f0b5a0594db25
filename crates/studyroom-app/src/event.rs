//! Events consumed by the App state machine.

use studyroom_client::{ConnectionState, Notice, RoomState};
use studyroom_proto::{Participant, ParticipantId, RoomId, http::ServiceKind};

use crate::KeyInput;

/// Events that drive the App state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    /// Keyboard input.
    Key(KeyInput),

    /// Periodic timer.
    Tick,

    /// Terminal resized (columns, rows).
    Resize(u16, u16),

    /// Channel state changed.
    ConnectionChanged(ConnectionState),

    /// Membership announced for the current connection.
    Joined {
        /// Room joined.
        room_id: RoomId,
        /// Our participant id.
        participant_id: ParticipantId,
    },

    /// Shared room state changed.
    RoomUpdated {
        /// Latest reducer state.
        state: RoomState,
        /// Participants with the local mute overlay applied.
        participants: Vec<Participant>,
    },

    /// Notification derived from a room event.
    Notice(Notice),

    /// A PDF upload was started.
    UploadStarted {
        /// File name.
        name: String,
    },

    /// An assistant service answered.
    ServiceReplied {
        /// Which service.
        kind: ServiceKind,
        /// Question asked, for the chat service.
        prompt: Option<String>,
        /// Reply text or failure reason.
        result: Result<String, String>,
    },

    /// Something failed. Shown to the user, never fatal.
    Error {
        /// Human-readable reason.
        message: String,
    },
}
