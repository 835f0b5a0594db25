//! Client error types.
//!
//! Validation errors reject a user intent before anything is emitted. Client
//! errors wrap them together with the connection and session preconditions.
//! None of them is fatal: the room connection survives every failed intent.

use studyroom_proto::{ParticipantId, ProtocolError, RoomId};
use thiserror::Error;

/// A user intent was rejected before emission.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Message is empty after trimming whitespace.
    #[error("message is empty")]
    EmptyMessage,

    /// Resource URL is not an absolute http(s) URL with a host.
    #[error("invalid resource url `{url}`: {reason}")]
    InvalidUrl {
        /// Input as given.
        url: String,
        /// Why it was rejected.
        reason: String,
    },

    /// File does not declare the PDF MIME type.
    #[error("`{name}` is not a PDF ({mime_type})")]
    NotPdf {
        /// File name.
        name: String,
        /// Declared MIME type.
        mime_type: String,
    },

    /// File has no content.
    #[error("`{name}` is empty")]
    EmptyFile {
        /// File name.
        name: String,
    },
}

/// Errors returned by [`crate::Client::handle`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// The channel is not open.
    #[error("not connected")]
    NotConnected,

    /// Connected, but membership has not been announced for this connection.
    #[error("not joined to room {room_id}")]
    NotJoined {
        /// Room the intent targeted.
        room_id: RoomId,
    },

    /// Intent failed validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Wire-level failure.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The upload collaborator rejected or failed to store a file.
    #[error("upload of `{name}` failed: {reason}")]
    UploadFailed {
        /// File name.
        name: String,
        /// Reason reported by the collaborator.
        reason: String,
    },

    /// Mute toggled for a participant not in the room.
    #[error("unknown participant {0}")]
    UnknownParticipant(ParticipantId),
}
