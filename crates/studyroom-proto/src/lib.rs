//! Study room wire protocol.
//!
//! Data model and channel events exchanged between a study room client and
//! the synchronization server, plus the shapes of the HTTP collaborators the
//! client consumes.
//!
//! # Wire format
//!
//! Every channel message is a single JSON object of the form
//! `{"event": "<name>", "data": {...}}`. Payload keys are camelCase. The
//! direction is encoded in the type: [`OutboundEvent`] only flows from client
//! to server, [`InboundEvent`] only from server to client.
//!
//! # Components
//!
//! - [`types`]: rooms, participants, resources, chat messages
//! - [`events`]: closed enums of channel events with their payloads
//! - [`invite`]: invitation link construction and parsing
//! - [`http`]: upload and assistant service request/response shapes

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod errors;
pub mod events;
pub mod http;
pub mod invite;
pub mod types;

pub use errors::{ProtocolError, Result};
pub use events::{
    InboundEvent, InboundKind, MessagePayload, MembershipPayload, OutboundEvent,
    ParticipantsUpdate, PreviewUpdate, ResourcePayload, ResourceUpdate, RoomSnapshot,
};
pub use types::{ChatMessage, Participant, ParticipantId, Resource, ResourceKind, RoomId};

/// Largest channel message accepted by the codec, in bytes.
///
/// Checked before any JSON parsing happens.
pub const MAX_EVENT_SIZE: usize = 1024 * 1024;
