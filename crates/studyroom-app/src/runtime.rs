//! Generic runtime for application orchestration.
//!
//! The Runtime drives the application event loop, coordinating between:
//! - [`App`]: UI state machine
//! - [`Bridge`]: Client bridge
//! - [`Driver`]: Platform-specific I/O

use std::{ops::Sub, time::Duration};

use studyroom_client::{ClientConfig, ClientError, Environment};
use studyroom_proto::{
    http::{ServiceKind, ServiceRequest, SourceList},
    invite,
};
use url::Url;

use crate::{App, AppAction, AppEvent, Bridge, ChannelEvent, Driver, Effect, RoomView};

/// Generic runtime that orchestrates App, Bridge, and Driver.
///
/// # Type Parameters
///
/// - `D`: Platform-specific I/O driver
/// - `E`: Environment for time and randomness
pub struct Runtime<D, E>
where
    D: Driver,
    E: Environment,
{
    driver: D,
    app: App,
    bridge: Bridge<E>,
}

impl<D, E> Runtime<D, E>
where
    D: Driver<Instant = E::Instant>,
    E: Environment,
    D::Instant: Sub<Output = Duration>,
{
    /// Create a runtime. `share_base` is where invitation links point.
    pub fn new(
        driver: D,
        env: E,
        config: ClientConfig,
        share_base: &Url,
    ) -> Result<Self, ClientError> {
        let bridge = Bridge::new(env, config)?;
        let room_id = bridge.room_id().clone();
        let share_link = match invite::share_link(share_base, &room_id) {
            Ok(link) => Some(link),
            Err(e) => {
                tracing::warn!(error = %e, "no invite link for this room");
                None
            },
        };
        let is_host = bridge.client().session().is_host();
        let app = App::new(RoomView::new(room_id, is_host, share_link));
        Ok(Self { driver, app, bridge })
    }

    /// Run the main event loop.
    ///
    /// Renders, connects, then cycles until the user quits. On the way out
    /// the room is left and the channel closed, best effort.
    ///
    /// # Errors
    ///
    /// Returns an error if the driver fails to poll input or render.
    pub async fn run(mut self) -> Result<(), D::Error> {
        self.start().await?;

        loop {
            if self.step().await? {
                break;
            }
        }

        self.shutdown().await;
        self.driver.stop();
        Ok(())
    }

    /// Render the first frame and request the channel.
    pub async fn start(&mut self) -> Result<(), D::Error> {
        self.driver.render(&self.app)?;
        let actions = self.app.connect();
        self.process_actions(actions).await?;
        Ok(())
    }

    /// Process one cycle of the event loop.
    ///
    /// Returns `true` if the application should quit.
    pub async fn step(&mut self) -> Result<bool, D::Error> {
        if let Some(event) = self.driver.poll_event().await? {
            let actions = self.app.handle(event);
            if self.process_actions(actions).await? {
                return Ok(true);
            }
        }

        if self.driver.is_connected()
            && let Some(channel_event) = self.driver.recv_event().await
        {
            let events = match channel_event {
                ChannelEvent::Received(event) => self.bridge.handle_inbound(event),
                ChannelEvent::Closed { reason } => {
                    self.driver.close_channel().await;
                    self.bridge.channel_closed(reason)
                },
            };
            if self.process_bridge_events(events).await? {
                return Ok(true);
            }
        }

        let now = self.driver.now();
        let events = self.bridge.handle_tick(now);
        self.process_bridge_events(events).await
    }

    /// Leave the room and close the channel.
    ///
    /// Best effort: failures are logged and the final state is rendered,
    /// but nothing the App asks for afterwards is executed.
    pub async fn shutdown(&mut self) {
        let mut events = self.bridge.disconnect();
        events.extend(self.execute_effects().await);

        let mut render = false;
        for event in events {
            if let AppEvent::Error { message } = &event {
                tracing::warn!(%message, "error while leaving");
            }
            render |= self.app.handle(event).contains(&AppAction::Render);
        }
        if render && let Err(e) = self.driver.render(&self.app) {
            tracing::warn!(error = %e, "final render failed");
        }
        tracing::info!(room_id = %self.bridge.room_id(), "left room");
    }

    /// Process actions returned by the App.
    ///
    /// Returns `true` if should quit.
    async fn process_actions(&mut self, initial_actions: Vec<AppAction>) -> Result<bool, D::Error> {
        let mut pending_actions = initial_actions;

        while !pending_actions.is_empty() {
            let actions = std::mem::take(&mut pending_actions);

            for action in actions {
                let events = match action {
                    AppAction::Render => {
                        self.driver.render(&self.app)?;
                        continue;
                    },
                    AppAction::Quit => return Ok(true),
                    AppAction::UploadFile { path } => match self.driver.read_file(&path).await {
                        Ok(file) => self.bridge.add_file(file),
                        Err(e) => vec![AppEvent::Error {
                            message: format!("cannot read {}: {e}", path.display()),
                        }],
                    },
                    AppAction::CallService { kind, message } => {
                        vec![self.call_service(kind, message).await]
                    },

                    // Client operations go through the bridge
                    AppAction::Connect
                    | AppAction::Leave
                    | AppAction::SendMessage { .. }
                    | AppAction::AddLink { .. }
                    | AppAction::RemoveResource(_)
                    | AppAction::SelectResource(_)
                    | AppAction::ToggleMute { .. } => self.bridge.process_app_action(action),
                };

                for event in events.into_iter().chain(self.execute_effects().await) {
                    pending_actions.extend(self.app.handle(event));
                }
            }
        }
        Ok(false)
    }

    /// Process events from Bridge back to App, then execute resulting effects.
    async fn process_bridge_events(&mut self, events: Vec<AppEvent>) -> Result<bool, D::Error> {
        let mut actions = Vec::new();
        for event in events.into_iter().chain(self.execute_effects().await) {
            actions.extend(self.app.handle(event));
        }
        self.process_actions(actions).await
    }

    /// Execute pending effects until the bridge has none left.
    ///
    /// Effect outcomes are fed back into the client, which may queue more
    /// effects (a join after the channel opens, an emit after an upload).
    async fn execute_effects(&mut self) -> Vec<AppEvent> {
        let mut events = Vec::new();
        loop {
            let effects = self.bridge.take_outgoing();
            if effects.is_empty() {
                return events;
            }
            for effect in effects {
                events.extend(self.execute(effect).await);
            }
        }
    }

    async fn execute(&mut self, effect: Effect) -> Vec<AppEvent> {
        match effect {
            Effect::Open { url } => match self.driver.open_channel(&url).await {
                Ok(connection_id) => {
                    tracing::info!(%url, %connection_id, "channel open");
                    self.bridge.channel_opened(connection_id)
                },
                Err(e) => {
                    tracing::warn!(%url, error = %e, "channel failed");
                    self.bridge.channel_failed(e.to_string())
                },
            },
            Effect::Close => {
                self.driver.close_channel().await;
                Vec::new()
            },
            Effect::Send(event) => {
                let name = event.name();
                match self.driver.send_event(event).await {
                    Ok(()) => Vec::new(),
                    Err(e) => {
                        tracing::warn!(event = name, error = %e, "send failed");
                        self.driver.close_channel().await;
                        self.bridge.channel_closed(e.to_string())
                    },
                }
            },
            Effect::Upload { request_id, file } => {
                let outcome = self.driver.upload_pdf(&file).await.map_err(|e| e.to_string());
                if let Err(reason) = &outcome {
                    tracing::warn!(name = %file.name, %reason, "upload failed");
                }
                self.bridge.upload_finished(request_id, outcome)
            },
        }
    }

    async fn call_service(&mut self, kind: ServiceKind, message: Option<String>) -> AppEvent {
        let request = ServiceRequest {
            message: message.clone(),
            sources: SourceList::from_resources(self.bridge.resources()),
        };
        let result = self.driver.call_service(kind, &request).await.map_err(|e| e.to_string());
        AppEvent::ServiceReplied { kind, prompt: message, result }
    }

    /// Get a reference to the App
    pub fn app(&self) -> &App {
        &self.app
    }

    /// Get a mutable reference to the App
    pub fn app_mut(&mut self) -> &mut App {
        &mut self.app
    }

    /// Get a reference to the Bridge
    pub fn bridge(&self) -> &Bridge<E> {
        &self.bridge
    }

    /// Get a reference to the Driver
    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// Get a mutable reference to the Driver
    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }
}
