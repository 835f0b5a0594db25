//! Integration tests for App and Bridge behavior.
//!
//! # Oracle Pattern
//!
//! Tests end with oracle checks that verify:
//! - App view reflects the client's room state
//! - Commands turn into the expected outbound events
//! - Failures surface as toasts and never as emitted events

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use studyroom_app::{
    App, AppAction, AppEvent, Bridge, ConnectionState, Effect, KeyInput, RoomView,
};
use studyroom_client::{ClientConfig, Environment, RoomChoice};
use studyroom_proto::{
    InboundEvent, OutboundEvent, Participant, ParticipantId, ParticipantsUpdate, PreviewUpdate,
    Resource, ResourceKind, ResourceUpdate, RoomId, RoomSnapshot,
};
use url::Url;

#[derive(Clone, Default)]
struct ManualEnv {
    clock: Arc<Mutex<Duration>>,
}

impl Environment for ManualEnv {
    type Instant = Duration;

    fn now(&self) -> Duration {
        *self.clock.lock().unwrap()
    }

    fn unix_millis(&self) -> u64 {
        1_700_000_000_000
    }

    fn random_bytes(&self, buffer: &mut [u8]) {
        buffer.fill(3);
    }
}

fn room_id() -> RoomId {
    RoomId::new("lq3x9k2mab12cd34").unwrap()
}

fn setup(name: &str) -> (App, Bridge<ManualEnv>) {
    let config = ClientConfig {
        server_url: Url::parse("ws://localhost:5000/ws").unwrap(),
        display_name: name.into(),
        room: RoomChoice::Join(room_id()),
        participant_id: None,
    };
    let bridge = Bridge::new(ManualEnv::default(), config).unwrap();
    let app = App::new(RoomView::new(room_id(), false, None));
    (app, bridge)
}

/// Process actions from App through Bridge and update App state.
fn process_actions(app: &mut App, bridge: &mut Bridge<ManualEnv>, actions: Vec<AppAction>) {
    for action in actions {
        for event in bridge.process_app_action(action) {
            let follow_up = app.handle(event);
            process_actions(app, bridge, follow_up);
        }
    }
}

/// Feed bridge events into the App.
fn deliver(app: &mut App, bridge: &mut Bridge<ManualEnv>, events: Vec<AppEvent>) {
    for event in events {
        let actions = app.handle(event);
        process_actions(app, bridge, actions);
    }
}

/// Connect and open the channel, returning the join effects.
fn join(app: &mut App, bridge: &mut Bridge<ManualEnv>, connection_id: &str) -> Vec<Effect> {
    let actions = app.connect();
    process_actions(app, bridge, actions);
    let opened = bridge.take_outgoing();
    assert!(matches!(opened.as_slice(), [Effect::Open { .. }]));

    let events = bridge.channel_opened(connection_id.into());
    deliver(app, bridge, events);
    bridge.take_outgoing()
}

fn type_line(app: &mut App, bridge: &mut Bridge<ManualEnv>, line: &str) {
    for c in line.chars() {
        app.handle(AppEvent::Key(KeyInput::Char(c)));
    }
    let actions = app.handle(AppEvent::Key(KeyInput::Enter));
    process_actions(app, bridge, actions);
}

fn sent(effects: &[Effect]) -> Vec<OutboundEvent> {
    effects
        .iter()
        .filter_map(|e| match e {
            Effect::Send(event) => Some(event.clone()),
            _ => None,
        })
        .collect()
}

fn participant(id: &str, name: &str) -> Participant {
    Participant::new(ParticipantId::new(id).unwrap(), name)
}

#[test]
fn join_flow_populates_room() {
    let (mut app, mut bridge) = setup("Alice");

    let effects = join(&mut app, &mut bridge, "c1");
    assert!(matches!(sent(&effects).as_slice(), [OutboundEvent::Join(_)]));
    assert!(matches!(app.connection_state(), ConnectionState::Connected { epoch: 1, .. }));
    assert_eq!(app.room().participant_id, Some(ParticipantId::new("c1").unwrap()));

    let video = Resource::new("Lecture", "https://youtu.be/abc123", ResourceKind::Youtube);
    let events = bridge.handle_inbound(InboundEvent::RoomState(RoomSnapshot {
        resources: vec![video.clone()],
        selected_resource: Some(video.clone()),
        participants: vec![participant("h1", "Host"), participant("c1", "Alice")],
    }));
    deliver(&mut app, &mut bridge, events);

    // Oracle: the view mirrors the snapshot
    assert_eq!(app.room().state.resources(), std::slice::from_ref(&video));
    assert_eq!(app.room().state.selected_resource(), Some(&video));
    assert_eq!(app.room().participants.len(), 2);
    assert!(app.room().is_me(&app.room().participants[1]));
}

#[test]
fn commands_emit_outbound_events() {
    let (mut app, mut bridge) = setup("Alice");
    join(&mut app, &mut bridge, "c1");

    let notes = Resource::new("notes.pdf", "uploads/notes.pdf", ResourceKind::Pdf);
    let events = bridge.handle_inbound(InboundEvent::ResourceUpdated(ResourceUpdate {
        resources: vec![notes.clone()],
        latest_resource: Some(notes.clone()),
        sender: Some("Host".into()),
    }));
    deliver(&mut app, &mut bridge, events);

    type_line(&mut app, &mut bridge, "hello everyone");
    type_line(&mut app, &mut bridge, "/add https://www.youtube.com/watch?v=xyz789");
    type_line(&mut app, &mut bridge, "/select 1");
    type_line(&mut app, &mut bridge, "/remove 1");

    let events = sent(&bridge.take_outgoing());
    assert_eq!(events.len(), 4);
    assert!(matches!(&events[0], OutboundEvent::Message(m) if m.message == "hello everyone"));
    assert!(matches!(
        &events[1],
        OutboundEvent::ResourceAdded(p) if p.resource.kind == ResourceKind::Youtube
    ));
    assert!(matches!(&events[2], OutboundEvent::ResourceSelected(p) if p.resource == notes));
    assert!(matches!(&events[3], OutboundEvent::ResourceRemoved(p) if p.resource == notes));
}

#[test]
fn notices_become_toasts() {
    let (mut app, mut bridge) = setup("Alice");
    join(&mut app, &mut bridge, "c1");

    let video = Resource::new("Lecture", "https://youtu.be/abc123", ResourceKind::Youtube);
    let events = bridge.handle_inbound(InboundEvent::PreviewUpdated(PreviewUpdate {
        resource: Some(video),
        sender: Some("Bob".into()),
    }));
    deliver(&mut app, &mut bridge, events);

    assert_eq!(app.latest_toast().map(|t| t.text.as_str()), Some("Bob is previewing Lecture"));
}

#[test]
fn failed_connection_is_persistent() {
    let (mut app, mut bridge) = setup("Alice");
    let actions = app.connect();
    process_actions(&mut app, &mut bridge, actions);
    bridge.take_outgoing();

    let events = bridge.channel_failed("connection refused".into());
    deliver(&mut app, &mut bridge, events);

    type_line(&mut app, &mut bridge, "anyone there?");
    let events = bridge.handle_tick(Duration::from_secs(60));
    deliver(&mut app, &mut bridge, events);

    // Oracle: still failed, nothing emitted, the rejection was shown
    assert_eq!(app.connection_state(), &ConnectionState::Failed {
        reason: "connection refused".into()
    });
    assert!(bridge.take_outgoing().is_empty());
    assert_eq!(app.latest_toast().map(|t| t.text.as_str()), Some("not connected"));
}

#[test]
fn invalid_link_is_a_toast_not_an_event() {
    let (mut app, mut bridge) = setup("Alice");
    join(&mut app, &mut bridge, "c1");

    type_line(&mut app, &mut bridge, "/add ftp://example.org/notes.pdf");

    assert!(bridge.take_outgoing().is_empty());
    let toast = app.latest_toast().unwrap();
    assert!(toast.text.starts_with("invalid resource url"), "got {toast:?}");
}

#[test]
fn mute_is_local_and_survives_updates() {
    let (mut app, mut bridge) = setup("Alice");
    join(&mut app, &mut bridge, "c1");

    let roster = vec![participant("c1", "Alice"), participant("p2", "Bob")];
    let events = bridge.handle_inbound(InboundEvent::ParticipantsUpdated(ParticipantsUpdate {
        participants: roster.clone(),
    }));
    deliver(&mut app, &mut bridge, events);

    type_line(&mut app, &mut bridge, "/mute 2");
    assert!(bridge.take_outgoing().is_empty());
    assert!(app.room().participants[1].is_muted);

    // a fresh roster from the server keeps the local overlay
    let update = ParticipantsUpdate { participants: roster };
    let events = bridge.handle_inbound(InboundEvent::ParticipantsUpdated(update));
    deliver(&mut app, &mut bridge, events);
    assert!(app.room().participants[1].is_muted);
    assert!(!bridge.client().state().participants()[1].is_muted);
}

#[test]
fn leave_then_intents_are_rejected() {
    let (mut app, mut bridge) = setup("Alice");
    join(&mut app, &mut bridge, "c1");

    type_line(&mut app, &mut bridge, "/leave");
    assert!(matches!(sent(&bridge.take_outgoing()).as_slice(), [OutboundEvent::Leave(_)]));

    type_line(&mut app, &mut bridge, "still here?");
    assert!(bridge.take_outgoing().is_empty());
    let toast = app.latest_toast().unwrap();
    assert!(toast.text.contains("not joined"), "got {toast:?}");
}

#[test]
fn join_command_rejoins_over_the_open_channel() {
    let (mut app, mut bridge) = setup("Alice");
    join(&mut app, &mut bridge, "c1");
    type_line(&mut app, &mut bridge, "/leave");
    bridge.take_outgoing();

    type_line(&mut app, &mut bridge, "/join");
    let effects = bridge.take_outgoing();
    assert!(!effects.iter().any(|e| matches!(e, Effect::Open { .. })), "got {effects:?}");
    let events = sent(&effects);
    let [OutboundEvent::Join(payload)] = events.as_slice() else {
        panic!("expected a join, got {effects:?}");
    };
    assert_eq!(payload.room_id, room_id());
    assert_eq!(payload.participant.id, ParticipantId::new("c1").unwrap());

    type_line(&mut app, &mut bridge, "back again");
    assert!(matches!(sent(&bridge.take_outgoing()).as_slice(), [OutboundEvent::Message(_)]));
}

#[test]
fn join_command_while_joined_sends_nothing() {
    let (mut app, mut bridge) = setup("Alice");
    join(&mut app, &mut bridge, "c1");

    type_line(&mut app, &mut bridge, "/join");
    assert!(bridge.take_outgoing().is_empty());
    assert!(matches!(app.connection_state(), ConnectionState::Connected { epoch: 1, .. }));
}

#[test]
fn join_command_reopens_a_failed_channel() {
    let (mut app, mut bridge) = setup("Alice");
    let actions = app.connect();
    process_actions(&mut app, &mut bridge, actions);
    bridge.take_outgoing();
    let events = bridge.channel_failed("connection refused".into());
    deliver(&mut app, &mut bridge, events);
    assert!(matches!(app.connection_state(), ConnectionState::Failed { .. }));

    type_line(&mut app, &mut bridge, "/join");
    assert!(matches!(bridge.take_outgoing().as_slice(), [Effect::Open { .. }]));
}
