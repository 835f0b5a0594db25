//! Protocol errors.

use thiserror::Error;

/// Result alias for protocol operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Errors raised while building, encoding or decoding protocol values.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Encoded event exceeds [`crate::MAX_EVENT_SIZE`].
    #[error("event too large: {size} bytes (max {max})")]
    TooLarge {
        /// Size of the rejected input.
        size: usize,
        /// Configured maximum.
        max: usize,
    },

    /// Input is not a well-formed event for this direction.
    #[error("malformed event: {0}")]
    Malformed(String),

    /// Event could not be serialized.
    #[error("encode failed: {0}")]
    Encode(String),

    /// Room identifier is empty or contains reserved characters.
    #[error("invalid room id: {0:?}")]
    InvalidRoomId(String),

    /// Participant identifier is empty.
    #[error("invalid participant id")]
    InvalidParticipantId,

    /// Input is not a recognizable invitation link.
    #[error("invalid invitation link: {0}")]
    InvalidInvite(String),
}
