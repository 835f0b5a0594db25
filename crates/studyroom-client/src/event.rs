//! Client events and actions.

use studyroom_proto::{InboundEvent, OutboundEvent, ParticipantId, Resource, RoomId};
use url::Url;

use crate::{
    connection::ConnectionState,
    dispatcher::{LocalFile, ResourceInput},
    state::Notice,
};

/// Events the caller feeds into the client.
///
/// The caller is responsible for:
/// - Reporting channel lifecycle (opened, failed, closed)
/// - Delivering decoded inbound events
/// - Driving time forward via ticks
/// - Forwarding user intents
///
/// Generic over `I` (Instant type) so simulation can use virtual time.
#[derive(Debug, Clone)]
pub enum ClientEvent<I = std::time::Instant> {
    /// Open the channel. No-op while connecting or connected.
    Connect,

    /// The channel requested by [`ClientAction::OpenChannel`] is open.
    ChannelOpened {
        /// Identifier the transport assigned to this connection.
        connection_id: String,
    },

    /// The channel could not be established.
    ChannelFailed {
        /// Transport-provided reason.
        reason: String,
    },

    /// An open channel was lost.
    ChannelClosed {
        /// Transport-provided reason.
        reason: String,
    },

    /// Inbound event from the server.
    EventReceived(InboundEvent),

    /// Time tick for upload expiry.
    Tick {
        /// Current time from the environment.
        now: I,
    },

    /// Post a chat message.
    SendMessage {
        /// Text as typed.
        text: String,
    },

    /// Share a URL or upload a PDF.
    AddResource(ResourceInput),

    /// The upload requested by [`ClientAction::Upload`] completed.
    UploadFinished {
        /// Request being completed.
        request_id: u64,
        /// Server-provided file path, or the failure reason.
        outcome: Result<String, String>,
    },

    /// Remove a resource from the room.
    RemoveResource(Resource),

    /// Select a resource for everyone's preview.
    SelectResource(Resource),

    /// Flip the local mute indicator of a participant.
    ToggleMute {
        /// Participant to flip.
        participant_id: ParticipantId,
    },

    /// Announce departure. Best effort.
    Leave,

    /// Leave and close the channel.
    Disconnect,
}

/// Actions the client produces for the caller to execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientAction {
    /// Open the channel to the given server URL.
    OpenChannel {
        /// Channel endpoint.
        url: Url,
    },

    /// Close the channel.
    CloseChannel,

    /// Send an event over the channel.
    Send(OutboundEvent),

    /// Upload a PDF to the backend, then report back with
    /// [`ClientEvent::UploadFinished`].
    Upload {
        /// Correlates the completion.
        request_id: u64,
        /// File to upload.
        file: LocalFile,
    },

    /// Connection state changed.
    ConnectionChanged(ConnectionState),

    /// Membership was announced for the current connection.
    Joined {
        /// Room joined.
        room_id: RoomId,
        /// Our participant id in the room.
        participant_id: ParticipantId,
    },

    /// Shared room state or the local mute overlay changed.
    RoomUpdated,

    /// Something the user should be told about.
    Notify(Notice),
}
