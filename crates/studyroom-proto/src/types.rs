//! Room data model.
//!
//! Plain value types shared by both channel directions. Nothing here carries
//! behavior beyond validation of identifiers; the authoritative copies of
//! these values live on the server.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::{ProtocolError, Result};

/// Characters that may not appear in a room id.
///
/// Room ids are embedded in invitation paths and query strings verbatim.
const RESERVED_ROOM_CHARS: &[char] = &['/', '?', '#', '&', '='];

/// Opaque room identifier.
///
/// Either generated by the hosting client or taken from an invitation link.
/// Never empty, never contains whitespace or URL delimiters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RoomId(String);

impl RoomId {
    /// Validate and wrap a room id.
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        let valid = !id.is_empty()
            && !id.chars().any(|c| c.is_whitespace() || RESERVED_ROOM_CHARS.contains(&c));

        if valid { Ok(Self(id)) } else { Err(ProtocolError::InvalidRoomId(id)) }
    }

    /// Room id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for RoomId {
    type Error = ProtocolError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<RoomId> for String {
    fn from(id: RoomId) -> Self {
        id.0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque participant identifier, unique per connection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ParticipantId(String);

impl ParticipantId {
    /// Validate and wrap a participant id.
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        if id.trim().is_empty() { Err(ProtocolError::InvalidParticipantId) } else { Ok(Self(id)) }
    }

    /// Participant id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ParticipantId {
    type Error = ProtocolError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<ParticipantId> for String {
    fn from(id: ParticipantId) -> Self {
        id.0
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A member of a room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    /// Connection-scoped identifier.
    pub id: ParticipantId,
    /// Display name.
    pub name: String,
    /// Whether the participant is shown as muted.
    pub is_muted: bool,
}

impl Participant {
    /// Create an unmuted participant.
    pub fn new(id: ParticipantId, name: impl Into<String>) -> Self {
        Self { id, name: name.into(), is_muted: false }
    }
}

/// Kind of shared resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    /// PDF document, either uploaded or linked.
    Pdf,
    /// YouTube video.
    Youtube,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pdf => f.write_str("pdf"),
            Self::Youtube => f.write_str("youtube"),
        }
    }
}

/// A shareable item in a room.
///
/// Equality is structural. Duplicates (same url) are allowed in a room's
/// resource list.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Resource {
    /// Display name.
    pub name: String,
    /// Location: an absolute URL or a server-provided upload path.
    pub url: String,
    /// Resource kind.
    #[serde(rename = "type")]
    pub kind: ResourceKind,
}

impl Resource {
    /// Create a resource.
    pub fn new(name: impl Into<String>, url: impl Into<String>, kind: ResourceKind) -> Self {
        Self { name: name.into(), url: url.into(), kind }
    }
}

/// A chat message. Append-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Sender display name.
    pub sender: String,
    /// Message text.
    pub content: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn room_id_rejects_reserved_characters() {
        assert!(RoomId::new("abc123").is_ok());
        assert!(RoomId::new("").is_err());
        assert!(RoomId::new("a b").is_err());
        assert!(RoomId::new("a/b").is_err());
        assert!(RoomId::new("a?b").is_err());
        assert!(RoomId::new("a#b").is_err());
    }

    #[test]
    fn room_id_deserialize_validates() {
        let ok: std::result::Result<RoomId, _> = serde_json::from_str("\"lq3x9k2m\"");
        assert!(ok.is_ok());

        let bad: std::result::Result<RoomId, _> = serde_json::from_str("\"../etc\"");
        assert!(bad.is_err());
    }

    #[test]
    fn participant_wire_shape_is_camel_case() {
        let participant = Participant {
            id: ParticipantId::new("p1").unwrap(),
            name: "Alice".into(),
            is_muted: true,
        };
        let json = serde_json::to_value(&participant).unwrap();
        assert_eq!(json, serde_json::json!({"id": "p1", "name": "Alice", "isMuted": true}));
    }

    #[test]
    fn resource_kind_serializes_as_type() {
        let resource = Resource::new("Lecture", "https://youtu.be/abc123", ResourceKind::Youtube);
        let json = serde_json::to_value(&resource).unwrap();
        let expected = serde_json::json!({
            "name": "Lecture",
            "url": "https://youtu.be/abc123",
            "type": "youtube",
        });
        assert_eq!(json, expected);
    }
}
