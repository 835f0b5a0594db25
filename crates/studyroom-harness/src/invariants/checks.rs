//! Standard invariant checks.
//!
//! These invariants capture behavioral properties that must always hold.
//! They verify WHAT must be true, not specific test scenarios.

use std::collections::BTreeMap;

use studyroom_proto::RoomId;

use super::{ClientSnapshot, Invariant, InvariantResult, SystemSnapshot, Violation};

/// Joined clients grouped by room, in client order.
fn rooms(state: &SystemSnapshot) -> BTreeMap<&RoomId, Vec<&ClientSnapshot>> {
    let mut rooms: BTreeMap<&RoomId, Vec<&ClientSnapshot>> = BTreeMap::new();
    for client in state.clients.iter().filter(|c| c.joined) {
        rooms.entry(&client.room_id).or_default().push(client);
    }
    rooms
}

/// Compare one projection across all members of each room.
fn converges<T, F>(state: &SystemSnapshot, invariant: &'static str, project: F) -> InvariantResult
where
    T: PartialEq + std::fmt::Debug,
    F: Fn(&ClientSnapshot) -> &T,
{
    for (room_id, clients) in rooms(state) {
        let Some((first, rest)) = clients.split_first() else {
            continue;
        };
        for client in rest {
            if project(client) != project(first) {
                return Err(Violation {
                    invariant,
                    message: format!(
                        "room {room_id}: client {} sees {:?}, client {} sees {:?}",
                        first.id,
                        project(first),
                        client.id,
                        project(client)
                    ),
                });
            }
        }
    }
    Ok(())
}

/// The selected resource must be one of the shared resources.
///
/// The server clears a selection before it announces the removal of the
/// resource, so this holds after every delivered event.
pub struct SelectionKnown;

impl Invariant for SelectionKnown {
    fn name(&self) -> &'static str {
        "selection_known"
    }

    fn check(&self, state: &SystemSnapshot) -> InvariantResult {
        for client in &state.clients {
            if let Some(selected) = &client.selected_resource
                && !client.resources.contains(selected)
            {
                return Err(Violation {
                    invariant: self.name(),
                    message: format!(
                        "client {}: selected {:?} not in {} resources",
                        client.id,
                        selected.url,
                        client.resources.len()
                    ),
                });
            }
        }
        Ok(())
    }
}

/// Members of a room agree on the resource list and the selection.
pub struct ResourceConvergence;

impl Invariant for ResourceConvergence {
    fn name(&self) -> &'static str {
        "resource_convergence"
    }

    fn check(&self, state: &SystemSnapshot) -> InvariantResult {
        converges(state, self.name(), |c| &c.resources)?;
        converges(state, self.name(), |c| &c.selected_resource)
    }
}

/// Members of a room agree on who is in it, in the same order.
pub struct ParticipantConvergence;

impl Invariant for ParticipantConvergence {
    fn name(&self) -> &'static str {
        "participant_convergence"
    }

    fn check(&self, state: &SystemSnapshot) -> InvariantResult {
        converges(state, self.name(), |c| &c.participants)
    }
}

/// Chat histories of a room's members differ only in how far back they go.
///
/// Snapshots carry no messages, so a later joiner holds a suffix of an
/// earlier joiner's history. Assumes members stayed joined throughout.
pub struct MessageSuffix;

impl Invariant for MessageSuffix {
    fn name(&self) -> &'static str {
        "message_suffix"
    }

    fn check(&self, state: &SystemSnapshot) -> InvariantResult {
        for (room_id, clients) in rooms(state) {
            let Some(longest) = clients.iter().max_by_key(|c| c.messages.len()) else {
                continue;
            };
            for client in &clients {
                if !longest.messages.ends_with(&client.messages) {
                    return Err(Violation {
                        invariant: self.name(),
                        message: format!(
                            "room {room_id}: client {} history ({} messages) is not a suffix of \
                             client {} history ({} messages)",
                            client.id,
                            client.messages.len(),
                            longest.id,
                            longest.messages.len()
                        ),
                    });
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use studyroom_proto::{ChatMessage, ParticipantId, Resource, ResourceKind};

    use super::*;

    fn client(id: usize) -> ClientSnapshot {
        ClientSnapshot {
            id,
            room_id: RoomId::new("lq3x9k2mab12cd34").unwrap(),
            joined: true,
            resources: Vec::new(),
            selected_resource: None,
            participants: Vec::new(),
            messages: Vec::new(),
        }
    }

    fn message(content: &str) -> ChatMessage {
        ChatMessage { sender: "Alice".into(), content: content.into() }
    }

    fn video() -> Resource {
        Resource::new("Lecture", "https://youtu.be/abc123", ResourceKind::Youtube)
    }

    #[test]
    fn selection_outside_resources_violates() {
        let mut alice = client(0);
        alice.selected_resource = Some(video());

        let result = SelectionKnown.check(&SystemSnapshot::single(alice.clone()));
        assert!(result.is_err());

        alice.resources.push(video());
        assert!(SelectionKnown.check(&SystemSnapshot::single(alice)).is_ok());
    }

    #[test]
    fn diverged_resources_violate() {
        let alice = client(0);
        let mut bob = client(1);
        bob.resources.push(video());

        let snapshot = SystemSnapshot::from_clients(vec![alice, bob]);
        let violation = ResourceConvergence.check(&snapshot).unwrap_err();
        assert_eq!(violation.invariant, "resource_convergence");
    }

    #[test]
    fn departed_clients_are_not_compared() {
        let alice = client(0);
        let mut bob = client(1);
        bob.joined = false;
        bob.participants.push(ParticipantId::new("sim0002").unwrap());

        let snapshot = SystemSnapshot::from_clients(vec![alice, bob]);
        assert!(ParticipantConvergence.check(&snapshot).is_ok());
    }

    #[test]
    fn late_joiner_holds_a_suffix() {
        let mut alice = client(0);
        alice.messages = vec![message("one"), message("two")];
        let mut bob = client(1);
        bob.messages = vec![message("two")];

        let snapshot = SystemSnapshot::from_clients(vec![alice.clone(), bob.clone()]);
        assert!(MessageSuffix.check(&snapshot).is_ok());

        bob.messages = vec![message("one")];
        let snapshot = SystemSnapshot::from_clients(vec![alice, bob]);
        assert!(MessageSuffix.check(&snapshot).is_err());
    }
}
