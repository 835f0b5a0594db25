//! Fuzz target for the room state reducer
//!
//! # Strategy
//!
//! - Small pools of resources and participants so events collide often
//! - Every inbound event kind, in any order, including selections of
//!   resources the room does not hold
//!
//! # Invariants
//!
//! - Resources always equal the latest `resource_updated` or `room_state` list
//! - `room_state` replaces resources, selection and participants together
//! - Messages are append-only; snapshots never touch them

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use studyroom_client::RoomState;
use studyroom_proto::{
    ChatMessage, InboundEvent, Participant, ParticipantId, ParticipantsUpdate, PreviewUpdate,
    Resource, ResourceKind, ResourceUpdate, RoomSnapshot,
};

#[derive(Debug, Clone, Arbitrary)]
enum StateOp {
    Message { sender: u8 },
    Resources { picks: Vec<u8>, latest: Option<u8> },
    Preview { pick: Option<u8> },
    Participants { picks: Vec<u8> },
    Snapshot { resources: Vec<u8>, selected: Option<u8>, participants: Vec<u8> },
}

fn resource(pick: u8) -> Resource {
    let n = pick % 6;
    if n % 2 == 0 {
        Resource::new(format!("video {n}"), format!("https://youtu.be/v{n}"), ResourceKind::Youtube)
    } else {
        Resource::new(format!("doc{n}.pdf"), format!("uploads/doc{n}.pdf"), ResourceKind::Pdf)
    }
}

fn participant(pick: u8) -> Participant {
    let n = pick % 4;
    Participant::new(ParticipantId::new(format!("p{n}")).unwrap(), format!("Student {n}"))
}

fn to_event(op: &StateOp) -> InboundEvent {
    match op {
        StateOp::Message { sender } => InboundEvent::NewMessage(ChatMessage {
            sender: format!("Student {}", sender % 4),
            content: "hi".into(),
        }),
        StateOp::Resources { picks, latest } => InboundEvent::ResourceUpdated(ResourceUpdate {
            resources: picks.iter().copied().map(resource).collect(),
            latest_resource: latest.map(resource),
            sender: None,
        }),
        StateOp::Preview { pick } => InboundEvent::PreviewUpdated(PreviewUpdate {
            resource: pick.map(resource),
            sender: None,
        }),
        StateOp::Participants { picks } => InboundEvent::ParticipantsUpdated(ParticipantsUpdate {
            participants: picks.iter().copied().map(participant).collect(),
        }),
        StateOp::Snapshot { resources, selected, participants } => {
            InboundEvent::RoomState(RoomSnapshot {
                resources: resources.iter().copied().map(resource).collect(),
                selected_resource: selected.map(resource),
                participants: participants.iter().copied().map(participant).collect(),
            })
        },
    }
}

fuzz_target!(|ops: Vec<StateOp>| {
    let mut state = RoomState::new();
    let mut expected_resources: Vec<Resource> = Vec::new();
    let mut message_count = 0usize;

    for op in ops {
        let before = state.messages().to_vec();
        let event = to_event(&op);
        let _ = state.apply(&event);

        match &event {
            InboundEvent::NewMessage(message) => {
                message_count += 1;
                assert_eq!(state.messages().last(), Some(message));
            },
            InboundEvent::ResourceUpdated(update) => {
                expected_resources.clone_from(&update.resources);
            },
            InboundEvent::RoomState(snapshot) => {
                expected_resources.clone_from(&snapshot.resources);
                assert_eq!(state.selected_resource(), snapshot.selected_resource.as_ref());
                assert_eq!(state.participants(), snapshot.participants.as_slice());
            },
            InboundEvent::PreviewUpdated(update) => {
                assert_eq!(state.selected_resource(), update.resource.as_ref());
            },
            InboundEvent::ParticipantsUpdated(update) => {
                assert_eq!(state.participants(), update.participants.as_slice());
            },
        }

        assert_eq!(state.resources(), expected_resources.as_slice());
        assert_eq!(state.messages().len(), message_count);
        assert!(state.messages().starts_with(&before));
    }
});
