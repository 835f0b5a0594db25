//! Application state machine.
//!
//! This module defines the [`App`] state machine, which manages the interactive
//! state of the application completely decoupled from I/O and the channel.
//!
//! This is a pure state machine: it consumes [`crate::AppEvent`] inputs and
//! produces [`crate::AppAction`] instructions for the runtime to execute.
//!
//! # Responsibilities
//!
//! - Owns the input line and turns submitted lines into commands.
//! - Mirrors the shared room state for rendering.
//! - Keeps a short queue of toasts and the assistant transcript.
//! - Tracks connection state; a failed connection stays visible.

use std::collections::VecDeque;

use studyroom_client::Notice;
use studyroom_proto::http::ServiceKind;

use crate::{
    AppAction, AppEvent, AssistantEntry, ConnectionState, InputState, KeyOutcome, RoomView, Toast,
    commands::{self, Command},
};

/// Toasts kept on screen; older ones are dropped first.
pub const MAX_TOASTS: usize = 5;

/// Application state machine.
///
/// Pure state machine that processes events and produces actions.
/// No I/O dependencies - fully testable in simulation.
#[derive(Debug, Clone)]
pub struct App {
    /// Channel state.
    state: ConnectionState,
    /// Room being shown.
    room: RoomView,
    /// Most recent toasts, oldest first.
    toasts: VecDeque<Toast>,
    /// Local study topic. Not shared.
    topic: Option<String>,
    /// Assistant exchanges, oldest first.
    transcript: Vec<AssistantEntry>,
    /// Input line.
    input: InputState,
    /// Terminal dimensions (columns, rows).
    terminal_size: (u16, u16),
}

impl App {
    /// Create an App showing the given room.
    pub fn new(room: RoomView) -> Self {
        Self {
            state: ConnectionState::Disconnected,
            room,
            toasts: VecDeque::new(),
            topic: None,
            transcript: Vec::new(),
            input: InputState::new(),
            terminal_size: (80, 24),
        }
    }

    /// Process an event and return actions.
    pub fn handle(&mut self, event: AppEvent) -> Vec<AppAction> {
        match event {
            AppEvent::Key(key) => match self.input.handle_key(key) {
                KeyOutcome::Edited => vec![AppAction::Render],
                KeyOutcome::Submitted(line) => self.submit(&line),
                KeyOutcome::Quit => self.quit(),
                KeyOutcome::Ignored => vec![],
            },
            AppEvent::Tick => vec![],
            AppEvent::Resize(cols, rows) => {
                self.terminal_size = (cols, rows);
                vec![AppAction::Render]
            },
            AppEvent::ConnectionChanged(state) => {
                if let ConnectionState::Failed { reason } = &state {
                    self.push_toast(Toast::error(format!("Connection failed: {reason}")));
                }
                self.state = state;
                vec![AppAction::Render]
            },
            AppEvent::Joined { room_id, participant_id } => {
                if self.room.participant_id.is_none() {
                    self.push_toast(Toast::info(format!("Joined room {room_id}")));
                }
                self.room.participant_id = Some(participant_id);
                vec![AppAction::Render]
            },
            AppEvent::RoomUpdated { state, participants } => {
                self.room.state = state;
                self.room.participants = participants;
                vec![AppAction::Render]
            },
            AppEvent::Notice(notice) => {
                self.push_toast(notice_toast(&notice));
                vec![AppAction::Render]
            },
            AppEvent::UploadStarted { name } => {
                self.push_toast(Toast::info(format!("Uploading {name}...")));
                vec![AppAction::Render]
            },
            AppEvent::ServiceReplied { kind, prompt, result } => {
                match result {
                    Ok(reply) => self.transcript.push(AssistantEntry { kind, prompt, reply }),
                    Err(reason) => {
                        self.push_toast(Toast::error(format!("{} failed: {reason}", kind.label())));
                    },
                }
                vec![AppAction::Render]
            },
            AppEvent::Error { message } => {
                self.push_toast(Toast::error(message));
                vec![AppAction::Render]
            },
        }
    }

    /// Show a toast, dropping the oldest beyond [`MAX_TOASTS`].
    pub fn push_toast(&mut self, toast: Toast) {
        self.toasts.push_back(toast);
        while self.toasts.len() > MAX_TOASTS {
            self.toasts.pop_front();
        }
    }

    /// Initiate the connection.
    pub fn connect(&mut self) -> Vec<AppAction> {
        self.state = ConnectionState::Connecting;
        vec![AppAction::Connect, AppAction::Render]
    }

    /// Send a chat message.
    pub fn send_message(&self, text: impl Into<String>) -> Vec<AppAction> {
        vec![AppAction::SendMessage { text: text.into() }, AppAction::Render]
    }

    /// Share a link.
    pub fn add_link(&self, url: impl Into<String>) -> Vec<AppAction> {
        vec![AppAction::AddLink { url: url.into() }, AppAction::Render]
    }

    /// Remove the resource at a 1-based position.
    pub fn remove_resource(&mut self, index: usize) -> Vec<AppAction> {
        match self.room.resource_at(index) {
            Some(resource) => vec![AppAction::RemoveResource(resource.clone()), AppAction::Render],
            None => self.status(Toast::error(format!("No resource #{index}"))),
        }
    }

    /// Select the resource at a 1-based position.
    pub fn select_resource(&mut self, index: usize) -> Vec<AppAction> {
        match self.room.resource_at(index) {
            Some(resource) => vec![AppAction::SelectResource(resource.clone()), AppAction::Render],
            None => self.status(Toast::error(format!("No resource #{index}"))),
        }
    }

    /// Toggle the local mute flag of the participant at a 1-based position.
    pub fn toggle_mute(&mut self, index: usize) -> Vec<AppAction> {
        match self.room.participant_at(index) {
            Some(participant) => vec![
                AppAction::ToggleMute { participant_id: participant.id.clone() },
                AppAction::Render,
            ],
            None => self.status(Toast::error(format!("No participant #{index}"))),
        }
    }

    /// Set or clear the local study topic.
    pub fn set_topic(&mut self, topic: Option<String>) -> Vec<AppAction> {
        self.topic = topic;
        vec![AppAction::Render]
    }

    /// Call an assistant service.
    pub fn ask(&mut self, kind: ServiceKind, message: Option<String>) -> Vec<AppAction> {
        self.push_toast(Toast::info(format!("Waiting for {}...", kind.label())));
        vec![AppAction::Render, AppAction::CallService { kind, message }]
    }

    /// Join the room again. The channel is reopened if it is gone.
    pub fn rejoin(&self) -> Vec<AppAction> {
        vec![AppAction::Connect, AppAction::Render]
    }

    /// Leave the room.
    pub fn leave(&self) -> Vec<AppAction> {
        vec![AppAction::Leave, AppAction::Render]
    }

    /// Quit the application.
    pub fn quit(&self) -> Vec<AppAction> {
        vec![AppAction::Quit]
    }

    /// Channel state.
    pub fn connection_state(&self) -> &ConnectionState {
        &self.state
    }

    /// Room being shown.
    pub fn room(&self) -> &RoomView {
        &self.room
    }

    /// Current toasts, oldest first.
    pub fn toasts(&self) -> impl ExactSizeIterator<Item = &Toast> {
        self.toasts.iter()
    }

    /// Most recent toast.
    pub fn latest_toast(&self) -> Option<&Toast> {
        self.toasts.back()
    }

    /// Local study topic.
    pub fn topic(&self) -> Option<&str> {
        self.topic.as_deref()
    }

    /// Assistant exchanges, oldest first.
    pub fn transcript(&self) -> &[AssistantEntry] {
        &self.transcript
    }

    /// Input line.
    pub fn input(&self) -> &InputState {
        &self.input
    }

    /// Terminal dimensions (columns, rows).
    pub fn terminal_size(&self) -> (u16, u16) {
        self.terminal_size
    }

    fn submit(&mut self, line: &str) -> Vec<AppAction> {
        match commands::parse(line) {
            Command::Message { text } => self.send_message(text),
            Command::AddLink { url } => self.add_link(url),
            Command::Upload { path } => vec![AppAction::UploadFile { path }, AppAction::Render],
            Command::Remove { index } => self.remove_resource(index),
            Command::Select { index } => self.select_resource(index),
            Command::Mute { index } => self.toggle_mute(index),
            Command::Topic { text } => self.set_topic(text),
            Command::Link => match self.room.share_link.as_ref() {
                Some(link) => self.status(Toast::info(format!("Invite link: {link}"))),
                None => self.status(Toast::error("No invite link for this room")),
            },
            Command::Ask { question } => self.ask(ServiceKind::Chat, Some(question)),
            Command::Summary => self.ask(ServiceKind::Summary, None),
            Command::Questions => self.ask(ServiceKind::Questions, None),
            Command::Audio => self.ask(ServiceKind::Audio, None),
            Command::Help => self.status(Toast::info(commands::HELP)),
            Command::Join => self.rejoin(),
            Command::Leave => self.leave(),
            Command::Quit => self.quit(),
            Command::Unknown { input } => {
                self.status(Toast::error(format!("Unknown command: {input}")))
            },
            Command::InvalidArgs { command, error } => {
                self.status(Toast::error(format!("/{command}: {error}")))
            },
        }
    }

    fn status(&mut self, toast: Toast) -> Vec<AppAction> {
        self.push_toast(toast);
        vec![AppAction::Render]
    }
}

fn notice_toast(notice: &Notice) -> Toast {
    match notice {
        Notice::ResourceShared { sender, resource } => {
            Toast::info(format!("{sender} shared {} ({})", resource.name, resource.kind))
        },
        Notice::PreviewChanged { sender, resource: Some(resource) } => {
            Toast::info(format!("{sender} is previewing {}", resource.name))
        },
        Notice::PreviewChanged { sender, resource: None } => {
            Toast::info(format!("{sender} cleared the preview"))
        },
        Notice::UploadExpired { name } => Toast::error(format!("Upload of {name} timed out")),
    }
}

#[cfg(test)]
mod tests {
    use studyroom_client::RoomState;
    use studyroom_proto::{
        InboundEvent, Participant, ParticipantId, Resource, ResourceKind, ResourceUpdate, RoomId,
    };
    use url::Url;

    use super::*;
    use crate::{KeyInput, ToastLevel};

    fn app() -> App {
        let room_id = RoomId::new("lq3x9k2mab12cd34").unwrap();
        let link = Url::parse("https://study-room.com/join/lq3x9k2mab12cd34").unwrap();
        App::new(RoomView::new(room_id, true, Some(link)))
    }

    fn with_resources(app: &mut App, resources: Vec<Resource>) {
        let mut state = RoomState::new();
        state.apply(&InboundEvent::ResourceUpdated(ResourceUpdate {
            resources,
            ..ResourceUpdate::default()
        }));
        app.handle(AppEvent::RoomUpdated { state, participants: Vec::new() });
    }

    fn submit(app: &mut App, line: &str) -> Vec<AppAction> {
        for c in line.chars() {
            app.handle(AppEvent::Key(KeyInput::Char(c)));
        }
        app.handle(AppEvent::Key(KeyInput::Enter))
    }

    #[test]
    fn typed_text_becomes_message() {
        let mut app = app();
        let actions = submit(&mut app, "hello there");
        assert_eq!(actions, vec![
            AppAction::SendMessage { text: "hello there".into() },
            AppAction::Render
        ]);
        assert!(app.input().buffer().is_empty());
    }

    #[test]
    fn indices_are_one_based() {
        let mut app = app();
        let first = Resource::new("a.pdf", "uploads/a.pdf", ResourceKind::Pdf);
        let second = Resource::new("video", "https://youtu.be/xyz", ResourceKind::Youtube);
        with_resources(&mut app, vec![first, second.clone()]);

        let actions = submit(&mut app, "/select 2");
        assert_eq!(actions, vec![AppAction::SelectResource(second), AppAction::Render]);

        let actions = submit(&mut app, "/remove 3");
        assert_eq!(actions, vec![AppAction::Render]);
        assert_eq!(app.latest_toast().map(|t| t.level), Some(ToastLevel::Error));
    }

    #[test]
    fn mute_uses_displayed_participants() {
        let mut app = app();
        let bob = Participant::new(ParticipantId::new("p-bob").unwrap(), "Bob");
        app.handle(AppEvent::RoomUpdated {
            state: RoomState::new(),
            participants: vec![bob.clone()],
        });

        let actions = app.toggle_mute(1);
        assert_eq!(actions, vec![
            AppAction::ToggleMute { participant_id: bob.id },
            AppAction::Render
        ]);
    }

    #[test]
    fn toasts_are_capped() {
        let mut app = app();
        for i in 0..8 {
            app.handle(AppEvent::Error { message: format!("failure {i}") });
        }

        assert_eq!(app.toasts().len(), MAX_TOASTS);
        assert_eq!(app.toasts().next().map(|t| t.text.as_str()), Some("failure 3"));
        assert_eq!(app.latest_toast().map(|t| t.text.as_str()), Some("failure 7"));
    }

    #[test]
    fn failure_stays_visible() {
        let mut app = app();
        app.connect();
        app.handle(AppEvent::ConnectionChanged(ConnectionState::Failed {
            reason: "refused".into(),
        }));
        app.handle(AppEvent::Tick);

        assert_eq!(app.connection_state(), &ConnectionState::Failed { reason: "refused".into() });
    }

    #[test]
    fn assistant_reply_recorded() {
        let mut app = app();
        let actions = submit(&mut app, "/ask what is a basis?");
        assert_eq!(actions, vec![AppAction::Render, AppAction::CallService {
            kind: ServiceKind::Chat,
            message: Some("what is a basis?".into())
        }]);

        app.handle(AppEvent::ServiceReplied {
            kind: ServiceKind::Chat,
            prompt: Some("what is a basis?".into()),
            result: Ok("A linearly independent spanning set.".into()),
        });
        assert_eq!(app.transcript().len(), 1);

        app.handle(AppEvent::ServiceReplied {
            kind: ServiceKind::Audio,
            prompt: None,
            result: Err("no sources".into()),
        });
        assert_eq!(app.transcript().len(), 1);
        assert_eq!(app.latest_toast().map(|t| t.text.as_str()), Some("audio failed: no sources"));
    }

    #[test]
    fn topic_is_local() {
        let mut app = app();
        let actions = submit(&mut app, "/topic Eigenvalues");
        assert_eq!(actions, vec![AppAction::Render]);
        assert_eq!(app.topic(), Some("Eigenvalues"));

        submit(&mut app, "/topic");
        assert_eq!(app.topic(), None);
    }

    #[test]
    fn link_shows_invite() {
        let mut app = app();
        submit(&mut app, "/link");
        assert_eq!(
            app.latest_toast().map(|t| t.text.as_str()),
            Some("Invite link: https://study-room.com/join/lq3x9k2mab12cd34")
        );
    }
}
