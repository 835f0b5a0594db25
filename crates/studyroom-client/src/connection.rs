//! Connection Manager.
//!
//! Owns the lifecycle of the single channel to the real-time server, the
//! subscriptions to inbound events, and the gate on outbound emission. Pure:
//! it returns actions for the driver and never touches the network.
//!
//! # State Machine
//!
//! ```text
//! ┌──────────────┐ connect ┌────────────┐  opened   ┌───────────┐
//! │ Disconnected │────────>│ Connecting │──────────>│ Connected │
//! └──────────────┘         └────────────┘           └───────────┘
//!        ^                       │ failed                 │ closed
//!        │ disconnect            ↓                        ↓
//!        └─────────────────┌────────┐<───────────────────┘
//!                          │ Failed │
//!                          └────────┘
//! ```
//!
//! `Failed` is terminal until the user asks to connect again. Each transition
//! into `Connected` starts a new connection epoch.

use std::fmt;

use studyroom_proto::{InboundEvent, InboundKind, OutboundEvent};
use url::Url;

use crate::{error::ClientError, event::ClientAction};

/// Channel state as seen by the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    /// No channel, none requested.
    Disconnected,
    /// Channel requested, not yet open.
    Connecting,
    /// Channel open.
    Connected {
        /// Transport-assigned connection identifier.
        connection_id: String,
        /// Connection epoch, starting at 1.
        epoch: u64,
    },
    /// Channel could not be established or was lost. Not retried.
    Failed {
        /// Transport-provided reason.
        reason: String,
    },
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected => f.write_str("disconnected"),
            Self::Connecting => f.write_str("connecting"),
            Self::Connected { .. } => f.write_str("connected"),
            Self::Failed { reason } => write!(f, "connection failed: {reason}"),
        }
    }
}

/// Handle returned by [`ConnectionManager::on`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Callback invoked for each delivered inbound event of a subscribed kind.
pub type Handler = Box<dyn FnMut(&InboundEvent) + Send>;

struct Subscription {
    id: SubscriptionId,
    kind: InboundKind,
    handler: Handler,
}

/// Lifecycle and subscription manager for the room channel.
pub struct ConnectionManager {
    url: Url,
    state: ConnectionState,
    epochs: u64,
    subscriptions: Vec<Subscription>,
    next_subscription: u64,
}

impl ConnectionManager {
    /// Create a manager for the channel at `url`, initially disconnected.
    pub fn new(url: Url) -> Self {
        Self {
            url,
            state: ConnectionState::Disconnected,
            epochs: 0,
            subscriptions: Vec::new(),
            next_subscription: 0,
        }
    }

    /// Channel endpoint.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Current state.
    pub fn state(&self) -> &ConnectionState {
        &self.state
    }

    /// Whether the channel is open.
    pub fn is_connected(&self) -> bool {
        matches!(self.state, ConnectionState::Connected { .. })
    }

    /// Epoch of the open channel. `None` unless connected.
    pub fn epoch(&self) -> Option<u64> {
        match self.state {
            ConnectionState::Connected { epoch, .. } => Some(epoch),
            _ => None,
        }
    }

    /// Identifier of the open channel. `None` unless connected.
    pub fn connection_id(&self) -> Option<&str> {
        match &self.state {
            ConnectionState::Connected { connection_id, .. } => Some(connection_id),
            _ => None,
        }
    }

    /// Request the channel.
    ///
    /// Re-entrant calls while connecting or connected return no actions.
    pub fn connect(&mut self) -> Vec<ClientAction> {
        if matches!(self.state, ConnectionState::Connecting | ConnectionState::Connected { .. }) {
            tracing::debug!(state = %self.state, "connect ignored");
            return Vec::new();
        }

        tracing::info!(url = %self.url, "connecting");
        self.transition(ConnectionState::Connecting);
        vec![
            ClientAction::OpenChannel { url: self.url.clone() },
            ClientAction::ConnectionChanged(self.state.clone()),
        ]
    }

    /// The transport opened the channel.
    ///
    /// An open that arrives after the request was abandoned (user disconnected
    /// meanwhile) is closed again.
    pub fn opened(&mut self, connection_id: String) -> Vec<ClientAction> {
        if self.state != ConnectionState::Connecting {
            tracing::warn!(state = %self.state, %connection_id, "unexpected channel open");
            return vec![ClientAction::CloseChannel];
        }

        self.epochs += 1;
        tracing::info!(%connection_id, epoch = self.epochs, "connected");
        self.transition(ConnectionState::Connected { connection_id, epoch: self.epochs });
        vec![ClientAction::ConnectionChanged(self.state.clone())]
    }

    /// The channel could not be established.
    pub fn failed(&mut self, reason: String) -> Vec<ClientAction> {
        if self.state != ConnectionState::Connecting {
            tracing::debug!(state = %self.state, %reason, "stale connect failure");
            return Vec::new();
        }

        tracing::warn!(%reason, "connection failed");
        self.transition(ConnectionState::Failed { reason });
        vec![ClientAction::ConnectionChanged(self.state.clone())]
    }

    /// An open channel was lost.
    pub fn closed(&mut self, reason: String) -> Vec<ClientAction> {
        if !self.is_connected() {
            tracing::debug!(state = %self.state, %reason, "close for inactive channel");
            return Vec::new();
        }

        tracing::warn!(%reason, "connection lost");
        self.transition(ConnectionState::Failed { reason });
        vec![ClientAction::ConnectionChanged(self.state.clone())]
    }

    /// Close the channel on request.
    pub fn disconnect(&mut self) -> Vec<ClientAction> {
        if !matches!(self.state, ConnectionState::Connecting | ConnectionState::Connected { .. }) {
            return Vec::new();
        }

        tracing::info!("disconnecting");
        self.transition(ConnectionState::Disconnected);
        vec![ClientAction::CloseChannel, ClientAction::ConnectionChanged(self.state.clone())]
    }

    /// Gate an outbound event on the channel being open.
    pub fn emit(&self, event: OutboundEvent) -> Result<ClientAction, ClientError> {
        if !self.is_connected() {
            return Err(ClientError::NotConnected);
        }

        tracing::debug!(event = event.name(), room_id = %event.room_id(), "emit");
        Ok(ClientAction::Send(event))
    }

    /// Subscribe to one kind of inbound event.
    ///
    /// Handlers run synchronously, in registration order, during
    /// [`ConnectionManager::deliver`].
    pub fn on(&mut self, kind: InboundKind, handler: Handler) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.subscriptions.push(Subscription { id, kind, handler });
        id
    }

    /// Remove a subscription. Returns whether it existed.
    pub fn off(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscriptions.len();
        self.subscriptions.retain(|s| s.id != id);
        self.subscriptions.len() != before
    }

    /// Run every handler subscribed to the event's kind.
    pub fn deliver(&mut self, event: &InboundEvent) {
        let kind = event.kind();
        for subscription in self.subscriptions.iter_mut().filter(|s| s.kind == kind) {
            (subscription.handler)(event);
        }
    }

    fn transition(&mut self, next: ConnectionState) {
        tracing::debug!(from = %self.state, to = %next, "connection transition");
        self.state = next;
    }
}

impl fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("url", &self.url.as_str())
            .field("state", &self.state)
            .field("epochs", &self.epochs)
            .field("subscriptions", &self.subscriptions.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use studyroom_proto::{ChatMessage, MessagePayload, RoomId};

    use super::*;

    fn manager() -> ConnectionManager {
        ConnectionManager::new(Url::parse("ws://localhost:5000/ws").unwrap())
    }

    fn message_event() -> OutboundEvent {
        OutboundEvent::Message(MessagePayload {
            room_id: RoomId::new("room1").unwrap(),
            message: "hi".into(),
            sender: "Alice".into(),
        })
    }

    #[test]
    fn connect_is_reentrant() {
        let mut conn = manager();

        let actions = conn.connect();
        assert!(matches!(actions.as_slice(), [
            ClientAction::OpenChannel { .. },
            ClientAction::ConnectionChanged(ConnectionState::Connecting)
        ]));

        assert!(conn.connect().is_empty());
        conn.opened("c1".into());
        assert!(conn.connect().is_empty());
        assert_eq!(conn.epoch(), Some(1));
    }

    #[test]
    fn epochs_increase_per_open() {
        let mut conn = manager();
        conn.connect();
        conn.opened("c1".into());
        conn.closed("reset".into());
        assert_eq!(conn.state(), &ConnectionState::Failed { reason: "reset".into() });

        conn.connect();
        conn.opened("c2".into());
        assert_eq!(conn.epoch(), Some(2));
        assert_eq!(conn.connection_id(), Some("c2"));
    }

    #[test]
    fn failure_is_not_retried() {
        let mut conn = manager();
        conn.connect();
        let actions = conn.failed("refused".into());

        assert_eq!(actions, vec![ClientAction::ConnectionChanged(ConnectionState::Failed {
            reason: "refused".into()
        })]);
        assert!(!actions.iter().any(|a| matches!(a, ClientAction::OpenChannel { .. })));
    }

    #[test]
    fn emit_requires_open_channel() {
        let mut conn = manager();
        assert_eq!(conn.emit(message_event()), Err(ClientError::NotConnected));

        conn.connect();
        assert_eq!(conn.emit(message_event()), Err(ClientError::NotConnected));

        conn.opened("c1".into());
        assert_eq!(conn.emit(message_event()), Ok(ClientAction::Send(message_event())));
    }

    #[test]
    fn late_open_after_disconnect_is_closed() {
        let mut conn = manager();
        conn.connect();
        conn.disconnect();

        assert_eq!(conn.opened("c1".into()), vec![ClientAction::CloseChannel]);
        assert_eq!(conn.state(), &ConnectionState::Disconnected);
    }

    #[test]
    fn subscriptions_are_typed_and_ordered() {
        let mut conn = manager();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let first = Arc::clone(&seen);
        let id = conn.on(
            InboundKind::NewMessage,
            Box::new(move |_| first.lock().unwrap().push("first")),
        );
        let second = Arc::clone(&seen);
        conn.on(InboundKind::NewMessage, Box::new(move |_| second.lock().unwrap().push("second")));
        let other = Arc::clone(&seen);
        conn.on(InboundKind::RoomState, Box::new(move |_| other.lock().unwrap().push("other")));

        let event =
            InboundEvent::NewMessage(ChatMessage { sender: "Bob".into(), content: "yo".into() });
        conn.deliver(&event);
        assert_eq!(*seen.lock().unwrap(), vec!["first", "second"]);

        assert!(conn.off(id));
        assert!(!conn.off(id));
        conn.deliver(&event);
        assert_eq!(*seen.lock().unwrap(), vec!["first", "second", "second"]);
    }
}
