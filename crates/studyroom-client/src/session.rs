//! Room Session.
//!
//! Holds the room identity and the local participant, and decides when
//! membership is announced. Membership is announced once per connection
//! epoch: a reconnect re-announces, a duplicate connected signal does not.

use studyroom_proto::{MembershipPayload, OutboundEvent, Participant, ParticipantId, RoomId};

use crate::env::Environment;

/// Number of random base36 characters appended to a generated room id.
const ROOM_ID_RANDOM_CHARS: usize = 8;

const BASE36: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Room identity and membership of the local participant.
#[derive(Debug, Clone)]
pub struct RoomSession {
    room_id: RoomId,
    display_name: String,
    hosted: bool,
    explicit_id: Option<ParticipantId>,
    participant: Option<Participant>,
    joined_epoch: Option<u64>,
}

impl RoomSession {
    /// Host a new room with a freshly generated id.
    pub fn host<E: Environment>(
        env: &E,
        display_name: impl Into<String>,
    ) -> studyroom_proto::Result<Self> {
        Ok(Self::new(generate_room_id(env)?, display_name.into(), true))
    }

    /// Join an existing room. The id is used verbatim.
    pub fn join(room_id: RoomId, display_name: impl Into<String>) -> Self {
        Self::new(room_id, display_name.into(), false)
    }

    fn new(room_id: RoomId, display_name: String, hosted: bool) -> Self {
        Self {
            room_id,
            display_name,
            hosted,
            explicit_id: None,
            participant: None,
            joined_epoch: None,
        }
    }

    /// Use a fixed participant id instead of the connection id.
    #[must_use]
    pub fn with_participant_id(mut self, id: ParticipantId) -> Self {
        self.explicit_id = Some(id);
        self
    }

    /// Room this session belongs to.
    pub fn room_id(&self) -> &RoomId {
        &self.room_id
    }

    /// Local display name, used as the sender of messages.
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Whether this session created the room.
    pub fn is_host(&self) -> bool {
        self.hosted
    }

    /// Local participant, once membership has been announced.
    pub fn participant(&self) -> Option<&Participant> {
        self.participant.as_ref()
    }

    /// Whether membership was announced for `epoch`.
    pub fn is_joined_in(&self, epoch: u64) -> bool {
        self.joined_epoch == Some(epoch)
    }

    /// The channel opened for `epoch`.
    ///
    /// Returns the `join` to emit, or `None` when this epoch was already
    /// announced.
    pub fn on_connected(
        &mut self,
        epoch: u64,
        connection_id: &str,
    ) -> studyroom_proto::Result<Option<OutboundEvent>> {
        if self.is_joined_in(epoch) {
            tracing::debug!(epoch, room_id = %self.room_id, "already joined in this epoch");
            return Ok(None);
        }

        let id = match &self.explicit_id {
            Some(id) => id.clone(),
            None => ParticipantId::new(connection_id)?,
        };
        let participant = Participant::new(id, self.display_name.clone());
        self.participant = Some(participant.clone());
        self.joined_epoch = Some(epoch);

        tracing::info!(epoch, room_id = %self.room_id, participant_id = %participant.id, "joining");
        Ok(Some(OutboundEvent::Join(MembershipPayload {
            room_id: self.room_id.clone(),
            participant,
        })))
    }

    /// Announce departure if a join was sent for the current channel.
    pub fn leave(&mut self) -> Option<OutboundEvent> {
        self.joined_epoch.take()?;
        let participant = self.participant.clone()?;

        tracing::info!(room_id = %self.room_id, "leaving");
        Some(OutboundEvent::Leave(MembershipPayload { room_id: self.room_id.clone(), participant }))
    }

    /// The channel is gone; the server has forgotten our membership.
    pub fn connection_lost(&mut self) {
        self.joined_epoch = None;
    }
}

/// Generate a room id: base36 Unix milliseconds followed by random base36
/// characters.
pub fn generate_room_id<E: Environment>(env: &E) -> studyroom_proto::Result<RoomId> {
    let mut id = to_base36(env.unix_millis());

    let mut random = [0u8; ROOM_ID_RANDOM_CHARS];
    env.random_bytes(&mut random);
    id.extend(random.iter().map(|b| BASE36[usize::from(*b) % BASE36.len()] as char));

    RoomId::new(id)
}

fn to_base36(mut value: u64) -> String {
    if value == 0 {
        return "0".to_string();
    }

    let mut digits = Vec::new();
    while value > 0 {
        digits.push(BASE36[(value % 36) as usize]);
        value /= 36;
    }
    digits.iter().rev().map(|d| *d as char).collect()
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use super::*;

    #[derive(Clone)]
    struct TestEnv;

    impl Environment for TestEnv {
        type Instant = Instant;

        fn now(&self) -> Instant {
            Instant::now()
        }

        fn unix_millis(&self) -> u64 {
            1_700_000_000_000
        }

        fn random_bytes(&self, buffer: &mut [u8]) {
            for (i, byte) in buffer.iter_mut().enumerate() {
                *byte = i as u8;
            }
        }
    }

    #[test]
    fn base36_encoding() {
        assert_eq!(to_base36(0), "0");
        assert_eq!(to_base36(35), "z");
        assert_eq!(to_base36(36), "10");
        assert_eq!(to_base36(1_700_000_000_000), "loyw3v28");
    }

    #[test]
    fn hosted_room_id_shape() {
        let session = RoomSession::host(&TestEnv, "Alice").unwrap();
        assert!(session.is_host());
        assert_eq!(session.room_id().as_str(), "loyw3v2801234567");
    }

    #[test]
    fn joining_uses_supplied_id_verbatim() {
        let room_id = RoomId::new("abc123").unwrap();
        let session = RoomSession::join(room_id.clone(), "Bob");
        assert!(!session.is_host());
        assert_eq!(session.room_id(), &room_id);
    }

    #[test]
    fn join_once_per_epoch() {
        let mut session = RoomSession::join(RoomId::new("abc123").unwrap(), "Bob");

        let join = session.on_connected(1, "c1").unwrap();
        assert!(matches!(join, Some(OutboundEvent::Join(_))));
        assert!(session.on_connected(1, "c1").unwrap().is_none());

        session.connection_lost();
        let rejoin = session.on_connected(2, "c2").unwrap();
        let Some(OutboundEvent::Join(payload)) = rejoin else { panic!("expected join") };
        assert_eq!(payload.participant.id.as_str(), "c2");
    }

    #[test]
    fn explicit_participant_id_wins() {
        let mut session = RoomSession::join(RoomId::new("abc123").unwrap(), "Bob")
            .with_participant_id(ParticipantId::new("bob-laptop").unwrap());

        let Some(OutboundEvent::Join(payload)) = session.on_connected(1, "c1").unwrap() else {
            panic!("expected join");
        };
        assert_eq!(payload.participant.id.as_str(), "bob-laptop");
        assert_eq!(payload.participant.name, "Bob");
        assert!(!payload.participant.is_muted);
    }

    #[test]
    fn leave_only_after_join() {
        let mut session = RoomSession::join(RoomId::new("abc123").unwrap(), "Bob");
        assert!(session.leave().is_none());

        session.on_connected(1, "c1").unwrap();
        assert!(matches!(session.leave(), Some(OutboundEvent::Leave(_))));
        assert!(session.leave().is_none());
    }
}
