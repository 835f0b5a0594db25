//! Channel events and their JSON codec.
//!
//! Both directions are closed enums. Receivers handle every variant through
//! exhaustive `match`; adding an event is a compile error at every handler
//! that forgot it.
//!
//! # Invariants
//!
//! - Each variant maps to exactly one wire name (`event` field).
//! - Every outbound event is scoped to a room and carries its `roomId`.
//! - Inbound resource and participant events carry full replacement lists,
//!   never deltas.

use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::{
    MAX_EVENT_SIZE,
    errors::{ProtocolError, Result},
    types::{ChatMessage, Participant, Resource, RoomId},
};

/// Client to server events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum OutboundEvent {
    /// Announce membership in a room.
    Join(MembershipPayload),
    /// Announce departure. Best effort.
    Leave(MembershipPayload),
    /// Post a chat message.
    Message(MessagePayload),
    /// Share a resource with the room.
    ResourceAdded(ResourcePayload),
    /// Remove a resource from the room.
    ResourceRemoved(ResourcePayload),
    /// Select a resource for everyone's preview.
    ResourceSelected(ResourcePayload),
}

/// Payload of `join` and `leave`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MembershipPayload {
    /// Target room.
    pub room_id: RoomId,
    /// The announcing participant.
    pub participant: Participant,
}

/// Payload of `message`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagePayload {
    /// Target room.
    pub room_id: RoomId,
    /// Message text as typed.
    pub message: String,
    /// Sender display name.
    pub sender: String,
}

/// Payload of `resource_added`, `resource_removed` and `resource_selected`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourcePayload {
    /// Target room.
    pub room_id: RoomId,
    /// The resource the intent applies to.
    pub resource: Resource,
}

impl OutboundEvent {
    /// Wire name of this event.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Join(_) => "join",
            Self::Leave(_) => "leave",
            Self::Message(_) => "message",
            Self::ResourceAdded(_) => "resource_added",
            Self::ResourceRemoved(_) => "resource_removed",
            Self::ResourceSelected(_) => "resource_selected",
        }
    }

    /// Room this event is scoped to.
    pub fn room_id(&self) -> &RoomId {
        match self {
            Self::Join(p) | Self::Leave(p) => &p.room_id,
            Self::Message(p) => &p.room_id,
            Self::ResourceAdded(p) | Self::ResourceRemoved(p) | Self::ResourceSelected(p) => {
                &p.room_id
            },
        }
    }

    /// Encode as a JSON text message.
    pub fn encode(&self) -> Result<String> {
        encode(self)
    }

    /// Decode from a JSON text message.
    pub fn decode(text: &str) -> Result<Self> {
        decode(text)
    }
}

/// Server to client events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum InboundEvent {
    /// A chat message was posted.
    NewMessage(ChatMessage),
    /// Full resource list after an addition or removal.
    ResourceUpdated(ResourceUpdate),
    /// The room's selected resource changed.
    PreviewUpdated(PreviewUpdate),
    /// Full participant list after a join or departure.
    ParticipantsUpdated(ParticipantsUpdate),
    /// Snapshot sent on (re)join.
    RoomState(RoomSnapshot),
}

/// Payload of `resource_updated`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceUpdate {
    /// Complete resource list, replacing the local one.
    pub resources: Vec<Resource>,
    /// Resource that triggered the update, if it was an addition.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latest_resource: Option<Resource>,
    /// Display name of whoever caused the update.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender: Option<String>,
}

/// Payload of `preview_updated`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewUpdate {
    /// New selection. `None` clears the preview.
    #[serde(default)]
    pub resource: Option<Resource>,
    /// Display name of whoever changed the selection.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender: Option<String>,
}

/// Payload of `participants_updated`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantsUpdate {
    /// Complete participant list, replacing the local one.
    pub participants: Vec<Participant>,
}

/// Payload of `room_state`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSnapshot {
    /// Complete resource list.
    pub resources: Vec<Resource>,
    /// Current selection.
    #[serde(default)]
    pub selected_resource: Option<Resource>,
    /// Complete participant list.
    pub participants: Vec<Participant>,
}

/// Discriminant of [`InboundEvent`], used to key typed subscriptions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InboundKind {
    /// `new_message`
    NewMessage,
    /// `resource_updated`
    ResourceUpdated,
    /// `preview_updated`
    PreviewUpdated,
    /// `participants_updated`
    ParticipantsUpdated,
    /// `room_state`
    RoomState,
}

impl InboundKind {
    /// Every inbound kind, in wire order.
    pub const ALL: [Self; 5] = [
        Self::NewMessage,
        Self::ResourceUpdated,
        Self::PreviewUpdated,
        Self::ParticipantsUpdated,
        Self::RoomState,
    ];

    /// Wire name of this kind.
    pub fn name(self) -> &'static str {
        match self {
            Self::NewMessage => "new_message",
            Self::ResourceUpdated => "resource_updated",
            Self::PreviewUpdated => "preview_updated",
            Self::ParticipantsUpdated => "participants_updated",
            Self::RoomState => "room_state",
        }
    }
}

impl InboundEvent {
    /// Discriminant of this event.
    pub fn kind(&self) -> InboundKind {
        match self {
            Self::NewMessage(_) => InboundKind::NewMessage,
            Self::ResourceUpdated(_) => InboundKind::ResourceUpdated,
            Self::PreviewUpdated(_) => InboundKind::PreviewUpdated,
            Self::ParticipantsUpdated(_) => InboundKind::ParticipantsUpdated,
            Self::RoomState(_) => InboundKind::RoomState,
        }
    }

    /// Wire name of this event.
    pub fn name(&self) -> &'static str {
        self.kind().name()
    }

    /// Encode as a JSON text message.
    pub fn encode(&self) -> Result<String> {
        encode(self)
    }

    /// Decode from a JSON text message.
    pub fn decode(text: &str) -> Result<Self> {
        decode(text)
    }
}

fn encode<T: Serialize>(event: &T) -> Result<String> {
    let text = serde_json::to_string(event).map_err(|e| ProtocolError::Encode(e.to_string()))?;
    if text.len() > MAX_EVENT_SIZE {
        return Err(ProtocolError::TooLarge { size: text.len(), max: MAX_EVENT_SIZE });
    }
    Ok(text)
}

fn decode<T: DeserializeOwned>(text: &str) -> Result<T> {
    if text.len() > MAX_EVENT_SIZE {
        return Err(ProtocolError::TooLarge { size: text.len(), max: MAX_EVENT_SIZE });
    }
    serde_json::from_str(text).map_err(|e| ProtocolError::Malformed(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ParticipantId, ResourceKind};

    fn room() -> RoomId {
        RoomId::new("lq3x9k2m").unwrap()
    }

    #[test]
    fn outbound_wire_shape() {
        let event = OutboundEvent::Message(MessagePayload {
            room_id: room(),
            message: "hi all".into(),
            sender: "Alice".into(),
        });

        let json: serde_json::Value = serde_json::from_str(&event.encode().unwrap()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "event": "message",
                "data": {"roomId": "lq3x9k2m", "message": "hi all", "sender": "Alice"}
            })
        );
    }

    #[test]
    fn inbound_decodes_without_optional_fields() {
        let text = r#"{"event":"resource_updated","data":{"resources":[]}}"#;
        let event = InboundEvent::decode(text).unwrap();
        assert_eq!(event, InboundEvent::ResourceUpdated(ResourceUpdate::default()));
    }

    #[test]
    fn preview_with_null_resource_clears() {
        let text = r#"{"event":"preview_updated","data":{"resource":null}}"#;
        let event = InboundEvent::decode(text).unwrap();
        assert_eq!(event, InboundEvent::PreviewUpdated(PreviewUpdate::default()));
    }

    #[test]
    fn unknown_event_name_is_malformed() {
        let text = r#"{"event":"typing","data":{}}"#;
        assert!(matches!(InboundEvent::decode(text), Err(ProtocolError::Malformed(_))));
    }

    #[test]
    fn direction_is_enforced() {
        let join = OutboundEvent::Join(MembershipPayload {
            room_id: room(),
            participant: Participant::new(ParticipantId::new("p1").unwrap(), "Alice"),
        });
        let text = join.encode().unwrap();
        assert!(InboundEvent::decode(&text).is_err());
    }

    #[test]
    fn oversized_input_rejected_before_parse() {
        let text = "x".repeat(MAX_EVENT_SIZE + 1);
        assert!(matches!(InboundEvent::decode(&text), Err(ProtocolError::TooLarge { .. })));
    }

    #[test]
    fn kind_names_match_wire_names() {
        let event = InboundEvent::RoomState(RoomSnapshot {
            resources: vec![Resource::new("a.pdf", "/uploads/a.pdf", ResourceKind::Pdf)],
            selected_resource: None,
            participants: vec![],
        });
        let json: serde_json::Value = serde_json::from_str(&event.encode().unwrap()).unwrap();
        assert_eq!(json["event"], event.name());
        assert_eq!(event.kind(), InboundKind::RoomState);
    }

    #[test]
    fn room_id_accessor_covers_all_outbound() {
        let resource = Resource::new("a.pdf", "/uploads/a.pdf", ResourceKind::Pdf);
        let payload = ResourcePayload { room_id: room(), resource };
        for event in [
            OutboundEvent::ResourceAdded(payload.clone()),
            OutboundEvent::ResourceRemoved(payload.clone()),
            OutboundEvent::ResourceSelected(payload),
        ] {
            assert_eq!(event.room_id(), &room());
        }
    }
}
