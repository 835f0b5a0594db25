//! Actions produced by the App for the runtime to execute.

use std::path::PathBuf;

use studyroom_proto::{ParticipantId, Resource, http::ServiceKind};

/// Instructions from the App state machine to the runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppAction {
    /// Redraw the UI.
    Render,

    /// Exit the application.
    Quit,

    /// Open the room channel, or rejoin over the open one.
    Connect,

    /// Leave the room, keeping the channel open.
    Leave,

    /// Send a chat message.
    SendMessage {
        /// Message text as typed.
        text: String,
    },

    /// Share a link (YouTube video or hosted PDF).
    AddLink {
        /// URL as typed.
        url: String,
    },

    /// Read a local PDF and upload it.
    UploadFile {
        /// Path on the local filesystem.
        path: PathBuf,
    },

    /// Remove a shared resource.
    RemoveResource(Resource),

    /// Select a resource for everyone's preview.
    SelectResource(Resource),

    /// Toggle the local mute flag of a participant.
    ToggleMute {
        /// Participant to toggle.
        participant_id: ParticipantId,
    },

    /// Call an assistant service with the room's resources as sources.
    CallService {
        /// Which service.
        kind: ServiceKind,
        /// Question for the chat service. `None` for the generators.
        message: Option<String>,
    },
}
