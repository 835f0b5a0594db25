//! Client-to-Application translation layer.
//!
//! The [`Bridge`] wraps the [`studyroom_client::Client`] and adapts it to the
//! application lifecycle.
//!
//! # Responsibilities
//!
//! - Converts [`crate::AppAction`]s into client events.
//! - Accumulates I/O [`Effect`]s for the driver to execute in the next cycle.
//! - Converts client actions and errors back into [`crate::AppEvent`]s.
//!   Errors become toasts, never failures of the loop.
//! - Forwards time ticks generically to support both real time and
//!   deterministic simulation.

use studyroom_client::{
    Client, ClientAction, ClientConfig, ClientError, ClientEvent, Environment, LocalFile,
    ResourceInput,
};
use studyroom_proto::{InboundEvent, OutboundEvent, Resource, RoomId};
use url::Url;

use crate::{AppAction, AppEvent};

/// I/O the driver has to perform on behalf of the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Open the room channel.
    Open {
        /// Channel endpoint.
        url: Url,
    },
    /// Close the room channel.
    Close,
    /// Send an event over the channel.
    Send(OutboundEvent),
    /// Upload a PDF to the backend.
    Upload {
        /// Correlates the completion.
        request_id: u64,
        /// File to upload.
        file: LocalFile,
    },
}

/// Bridge between App and Client logic.
///
/// Generic over Environment to support both production and simulation.
pub struct Bridge<E: Environment> {
    client: Client<E>,
    outgoing: Vec<Effect>,
}

impl<E: Environment> Bridge<E> {
    /// Create a bridge around a new client.
    pub fn new(env: E, config: ClientConfig) -> Result<Self, ClientError> {
        Ok(Self { client: Client::new(env, config)?, outgoing: Vec::new() })
    }

    /// The wrapped client.
    pub fn client(&self) -> &Client<E> {
        &self.client
    }

    /// Room this client hosts or joins.
    pub fn room_id(&self) -> &RoomId {
        self.client.session().room_id()
    }

    /// Shared resources, used as assistant sources.
    pub fn resources(&self) -> &[Resource] {
        self.client.state().resources()
    }

    /// Request the channel.
    pub fn connect(&mut self) -> Vec<AppEvent> {
        self.dispatch(ClientEvent::Connect)
    }

    /// Leave the room and close the channel.
    pub fn disconnect(&mut self) -> Vec<AppEvent> {
        self.dispatch(ClientEvent::Disconnect)
    }

    /// Process an App action and return resulting App events.
    pub fn process_app_action(&mut self, action: AppAction) -> Vec<AppEvent> {
        match action {
            AppAction::SendMessage { text } => self.dispatch(ClientEvent::SendMessage { text }),
            AppAction::AddLink { url } => {
                self.dispatch(ClientEvent::AddResource(ResourceInput::Url(url)))
            },
            AppAction::RemoveResource(resource) => {
                self.dispatch(ClientEvent::RemoveResource(resource))
            },
            AppAction::SelectResource(resource) => {
                self.dispatch(ClientEvent::SelectResource(resource))
            },
            AppAction::ToggleMute { participant_id } => {
                self.dispatch(ClientEvent::ToggleMute { participant_id })
            },
            AppAction::Leave => self.dispatch(ClientEvent::Leave),
            AppAction::Connect => self.connect(),
            AppAction::Render
            | AppAction::Quit
            | AppAction::UploadFile { .. }
            | AppAction::CallService { .. } => vec![],
        }
    }

    /// Share a local file that the driver has read.
    pub fn add_file(&mut self, file: LocalFile) -> Vec<AppEvent> {
        self.dispatch(ClientEvent::AddResource(ResourceInput::File(file)))
    }

    /// The channel opened.
    pub fn channel_opened(&mut self, connection_id: String) -> Vec<AppEvent> {
        self.dispatch(ClientEvent::ChannelOpened { connection_id })
    }

    /// The channel could not be opened.
    pub fn channel_failed(&mut self, reason: String) -> Vec<AppEvent> {
        self.dispatch(ClientEvent::ChannelFailed { reason })
    }

    /// The channel closed underneath us.
    pub fn channel_closed(&mut self, reason: String) -> Vec<AppEvent> {
        self.dispatch(ClientEvent::ChannelClosed { reason })
    }

    /// Handle an event from the server.
    pub fn handle_inbound(&mut self, event: InboundEvent) -> Vec<AppEvent> {
        self.dispatch(ClientEvent::EventReceived(event))
    }

    /// Report an upload outcome.
    pub fn upload_finished(
        &mut self,
        request_id: u64,
        outcome: Result<String, String>,
    ) -> Vec<AppEvent> {
        self.dispatch(ClientEvent::UploadFinished { request_id, outcome })
    }

    /// Process a time tick.
    pub fn handle_tick(&mut self, now: E::Instant) -> Vec<AppEvent> {
        self.dispatch(ClientEvent::Tick { now })
    }

    /// Take pending effects.
    pub fn take_outgoing(&mut self) -> Vec<Effect> {
        std::mem::take(&mut self.outgoing)
    }

    fn dispatch(&mut self, event: ClientEvent<E::Instant>) -> Vec<AppEvent> {
        let result = self.client.handle(event);
        self.handle_client_result(result)
    }

    fn handle_client_result(
        &mut self,
        result: Result<Vec<ClientAction>, ClientError>,
    ) -> Vec<AppEvent> {
        match result {
            Ok(actions) => self.process_client_actions(actions),
            Err(e) => {
                tracing::debug!(error = %e, "client rejected event");
                vec![AppEvent::Error { message: e.to_string() }]
            },
        }
    }

    fn process_client_actions(&mut self, actions: Vec<ClientAction>) -> Vec<AppEvent> {
        let mut events = Vec::new();
        let mut room_updated = false;

        for action in actions {
            match action {
                ClientAction::OpenChannel { url } => self.outgoing.push(Effect::Open { url }),
                ClientAction::CloseChannel => self.outgoing.push(Effect::Close),
                ClientAction::Send(event) => self.outgoing.push(Effect::Send(event)),
                ClientAction::Upload { request_id, file } => {
                    events.push(AppEvent::UploadStarted { name: file.name.clone() });
                    self.outgoing.push(Effect::Upload { request_id, file });
                },
                ClientAction::ConnectionChanged(state) => {
                    events.push(AppEvent::ConnectionChanged(state));
                },
                ClientAction::Joined { room_id, participant_id } => {
                    events.push(AppEvent::Joined { room_id, participant_id });
                },
                ClientAction::RoomUpdated => room_updated = true,
                ClientAction::Notify(notice) => events.push(AppEvent::Notice(notice)),
            }
        }

        if room_updated {
            events.push(AppEvent::RoomUpdated {
                state: self.client.state().clone(),
                participants: self.client.participants(),
            });
        }
        events
    }
}
