//! Client state machine.
//!
//! The `Client` composes the connection manager, room session, reducer and
//! dispatcher behind a single `handle(event) -> actions` entry point.

use studyroom_proto::{
    InboundEvent, InboundKind, OutboundEvent, Participant, ParticipantId, Resource, RoomId,
};
use url::Url;

use crate::{
    connection::{ConnectionManager, ConnectionState, Handler, SubscriptionId},
    dispatcher::{Dispatch, Dispatcher, ResourceInput},
    env::Environment,
    error::ClientError,
    event::{ClientAction, ClientEvent},
    session::RoomSession,
    state::RoomState,
};

/// How the client enters a room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoomChoice {
    /// Create a room with a generated id.
    Host,
    /// Join the room with this id.
    Join(RoomId),
}

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Real-time channel endpoint.
    pub server_url: Url,
    /// Display name announced on join and used as message sender.
    pub display_name: String,
    /// Room to host or join.
    pub room: RoomChoice,
    /// Fixed participant id. Defaults to the connection id.
    pub participant_id: Option<ParticipantId>,
}

/// Room synchronization client.
pub struct Client<E: Environment> {
    env: E,
    connection: ConnectionManager,
    session: RoomSession,
    state: RoomState,
    dispatcher: Dispatcher<E::Instant>,
}

impl<E: Environment> Client<E> {
    /// Create a client. Hosting generates the room id from `env`.
    pub fn new(env: E, config: ClientConfig) -> Result<Self, ClientError> {
        let session = match config.room {
            RoomChoice::Host => RoomSession::host(&env, config.display_name)?,
            RoomChoice::Join(room_id) => RoomSession::join(room_id, config.display_name),
        };
        let session = match config.participant_id {
            Some(id) => session.with_participant_id(id),
            None => session,
        };

        tracing::info!(room_id = %session.room_id(), host = session.is_host(), "client created");
        Ok(Self {
            env,
            connection: ConnectionManager::new(config.server_url),
            session,
            state: RoomState::new(),
            dispatcher: Dispatcher::new(),
        })
    }

    /// Shared room state.
    pub fn state(&self) -> &RoomState {
        &self.state
    }

    /// Participants with the local mute overlay applied.
    pub fn participants(&self) -> Vec<Participant> {
        self.dispatcher.participants(&self.state)
    }

    /// Room identity and membership.
    pub fn session(&self) -> &RoomSession {
        &self.session
    }

    /// Channel state.
    pub fn connection_state(&self) -> &ConnectionState {
        self.connection.state()
    }

    /// Whether membership has been announced on the open channel.
    pub fn is_joined(&self) -> bool {
        self.connection.epoch().is_some_and(|epoch| self.session.is_joined_in(epoch))
    }

    /// Uploads awaiting completion.
    pub fn pending_uploads(&self) -> usize {
        self.dispatcher.pending_uploads()
    }

    /// Subscribe to one kind of inbound event.
    pub fn on(&mut self, kind: InboundKind, handler: Handler) -> SubscriptionId {
        self.connection.on(kind, handler)
    }

    /// Remove a subscription.
    pub fn off(&mut self, id: SubscriptionId) -> bool {
        self.connection.off(id)
    }

    /// Process an event and return resulting actions.
    pub fn handle(
        &mut self,
        event: ClientEvent<E::Instant>,
    ) -> Result<Vec<ClientAction>, ClientError> {
        match event {
            ClientEvent::Connect => self.handle_connect(),
            ClientEvent::ChannelOpened { connection_id } => self.handle_opened(connection_id),
            ClientEvent::ChannelFailed { reason } => {
                let actions = self.connection.failed(reason);
                Ok(self.lost_if_changed(actions))
            },
            ClientEvent::ChannelClosed { reason } => {
                let actions = self.connection.closed(reason);
                Ok(self.lost_if_changed(actions))
            },
            ClientEvent::EventReceived(event) => Ok(self.handle_inbound(&event)),
            ClientEvent::Tick { now } => Ok(self.handle_tick(now)),
            ClientEvent::SendMessage { text } => {
                self.require_joined()?;
                let event = self.dispatcher.send_message(&self.session, &text)?;
                self.emit(event)
            },
            ClientEvent::AddResource(input) => self.handle_add_resource(input),
            ClientEvent::UploadFinished { request_id, outcome } => {
                match self.dispatcher.finish_upload(&self.session, request_id, outcome)? {
                    Some(event) => {
                        self.require_joined()?;
                        self.emit(event)
                    },
                    None => Ok(Vec::new()),
                }
            },
            ClientEvent::RemoveResource(resource) => self.handle_remove(resource),
            ClientEvent::SelectResource(resource) => self.handle_select(resource),
            ClientEvent::ToggleMute { participant_id } => {
                self.dispatcher.toggle_mute(&self.state, &participant_id)?;
                Ok(vec![ClientAction::RoomUpdated])
            },
            ClientEvent::Leave => Ok(self.leave()),
            ClientEvent::Disconnect => {
                let mut actions = self.leave();
                actions.extend(self.connection.disconnect());
                self.session.connection_lost();
                Ok(actions)
            },
        }
    }

    /// Open the channel, or rejoin over the open one after a `leave`.
    fn handle_connect(&mut self) -> Result<Vec<ClientAction>, ClientError> {
        let (Some(epoch), Some(connection_id)) =
            (self.connection.epoch(), self.connection.connection_id())
        else {
            return Ok(self.connection.connect());
        };
        let connection_id = connection_id.to_string();
        let mut actions = Vec::new();
        self.join(epoch, &connection_id, &mut actions)?;
        Ok(actions)
    }

    fn handle_opened(&mut self, connection_id: String) -> Result<Vec<ClientAction>, ClientError> {
        let mut actions = self.connection.opened(connection_id.clone());
        if let Some(epoch) = self.connection.epoch() {
            self.join(epoch, &connection_id, &mut actions)?;
        }
        Ok(actions)
    }

    /// Announce membership for `epoch` unless already done.
    fn join(
        &mut self,
        epoch: u64,
        connection_id: &str,
        actions: &mut Vec<ClientAction>,
    ) -> Result<(), ClientError> {
        if let Some(join) = self.session.on_connected(epoch, connection_id)? {
            actions.push(self.connection.emit(join)?);
            if let Some(participant) = self.session.participant() {
                actions.push(ClientAction::Joined {
                    room_id: self.session.room_id().clone(),
                    participant_id: participant.id.clone(),
                });
            }
        }
        Ok(())
    }

    /// Forget the join marker only when the connection actually went down.
    /// A stale failure for an earlier attempt leaves the manager untouched.
    fn lost_if_changed(&mut self, actions: Vec<ClientAction>) -> Vec<ClientAction> {
        if !actions.is_empty() {
            self.session.connection_lost();
        }
        actions
    }

    fn handle_inbound(&mut self, event: &InboundEvent) -> Vec<ClientAction> {
        if !self.connection.is_connected() {
            tracing::warn!(event = event.name(), "inbound event without open channel dropped");
            return Vec::new();
        }

        tracing::debug!(event = event.name(), "received");
        self.connection.deliver(event);

        let notice = self.state.apply(event);
        if matches!(event.kind(), InboundKind::ParticipantsUpdated | InboundKind::RoomState) {
            self.dispatcher.retain_mutes(&self.state);
        }

        let mut actions = vec![ClientAction::RoomUpdated];
        actions.extend(notice.map(ClientAction::Notify));
        actions
    }

    fn handle_tick(&mut self, now: E::Instant) -> Vec<ClientAction> {
        self.dispatcher.expire_uploads(now).into_iter().map(ClientAction::Notify).collect()
    }

    fn handle_add_resource(
        &mut self,
        input: ResourceInput,
    ) -> Result<Vec<ClientAction>, ClientError> {
        self.require_joined()?;
        match self.dispatcher.add_resource(&self.session, input, self.env.now())? {
            Dispatch::Emit(event) => self.emit(event),
            Dispatch::Upload { request_id, file } => {
                Ok(vec![ClientAction::Upload { request_id, file }])
            },
        }
    }

    fn handle_remove(&mut self, resource: Resource) -> Result<Vec<ClientAction>, ClientError> {
        self.require_joined()?;
        let event = self.dispatcher.remove_resource(&self.session, resource);
        self.emit(event)
    }

    fn handle_select(&mut self, resource: Resource) -> Result<Vec<ClientAction>, ClientError> {
        self.require_joined()?;
        let event = self.dispatcher.select_resource(&self.session, resource);
        self.emit(event)
    }

    fn leave(&mut self) -> Vec<ClientAction> {
        if !self.is_joined() {
            return Vec::new();
        }

        self.session
            .leave()
            .and_then(|event| self.connection.emit(event).ok())
            .into_iter()
            .collect()
    }

    fn require_joined(&self) -> Result<(), ClientError> {
        if !self.connection.is_connected() {
            return Err(ClientError::NotConnected);
        }
        if !self.is_joined() {
            return Err(ClientError::NotJoined { room_id: self.session.room_id().clone() });
        }
        Ok(())
    }

    fn emit(&self, event: OutboundEvent) -> Result<Vec<ClientAction>, ClientError> {
        Ok(vec![self.connection.emit(event)?])
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::{
            Arc,
            atomic::{AtomicUsize, Ordering},
        },
        time::Instant,
    };

    use studyroom_proto::{ChatMessage, ParticipantsUpdate};

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
            buffer.fill(7);
        }
    }

    fn config(room: RoomChoice) -> ClientConfig {
        ClientConfig {
            server_url: Url::parse("ws://localhost:5000/ws").unwrap(),
            display_name: "Alice".into(),
            room,
            participant_id: None,
        }
    }

    fn joined_client() -> Client<TestEnv> {
        let mut client = Client::new(TestEnv, config(RoomChoice::Host)).unwrap();
        client.handle(ClientEvent::Connect).unwrap();
        client.handle(ClientEvent::ChannelOpened { connection_id: "c1".into() }).unwrap();
        client
    }

    #[test]
    fn open_channel_announces_membership() {
        let mut client = Client::new(TestEnv, config(RoomChoice::Host)).unwrap();
        client.handle(ClientEvent::Connect).unwrap();

        let actions =
            client.handle(ClientEvent::ChannelOpened { connection_id: "c1".into() }).unwrap();

        assert!(matches!(actions.as_slice(), [
            ClientAction::ConnectionChanged(ConnectionState::Connected { epoch: 1, .. }),
            ClientAction::Send(OutboundEvent::Join(_)),
            ClientAction::Joined { .. }
        ]));
        assert!(client.is_joined());
    }

    #[test]
    fn intents_before_join_are_rejected() {
        let mut client = Client::new(TestEnv, config(RoomChoice::Host)).unwrap();
        let result = client.handle(ClientEvent::SendMessage { text: "hi".into() });
        assert_eq!(result, Err(ClientError::NotConnected));
    }

    #[test]
    fn inbound_updates_state_and_subscribers() {
        let mut client = joined_client();
        let count = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&count);
        client.on(
            InboundKind::NewMessage,
            Box::new(move |_| {
                seen.fetch_add(1, Ordering::SeqCst);
            }),
        );

        let event =
            InboundEvent::NewMessage(ChatMessage { sender: "Bob".into(), content: "hey".into() });
        let actions = client.handle(ClientEvent::EventReceived(event)).unwrap();

        assert_eq!(actions, vec![ClientAction::RoomUpdated]);
        assert_eq!(client.state().messages().len(), 1);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn disconnect_leaves_then_closes() {
        let mut client = joined_client();
        let actions = client.handle(ClientEvent::Disconnect).unwrap();

        assert!(matches!(actions.as_slice(), [
            ClientAction::Send(OutboundEvent::Leave(_)),
            ClientAction::CloseChannel,
            ClientAction::ConnectionChanged(ConnectionState::Disconnected)
        ]));
        assert!(!client.is_joined());
    }

    #[test]
    fn mute_toggle_needs_no_channel() {
        let mut client = joined_client();
        let bob = ParticipantId::new("bob").unwrap();
        client
            .handle(ClientEvent::EventReceived(InboundEvent::ParticipantsUpdated(
                ParticipantsUpdate { participants: vec![Participant::new(bob.clone(), "Bob")] },
            )))
            .unwrap();
        client.handle(ClientEvent::ChannelClosed { reason: "reset".into() }).unwrap();

        let actions = client.handle(ClientEvent::ToggleMute { participant_id: bob }).unwrap();
        assert_eq!(actions, vec![ClientAction::RoomUpdated]);
        assert!(client.participants()[0].is_muted);
        assert!(!client.state().participants()[0].is_muted);
    }
}
