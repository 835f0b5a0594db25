//! Fuzz target for multi-client convergence
//!
//! Drives a simulated room with fuzzer-chosen operations and delivery
//! interleavings, then drains the network and checks the standard
//! invariants.
//!
//! # Invariants
//!
//! - Selection always names a resource the client holds
//! - Once quiescent, members agree on resources, selection and roster
//! - Chat histories differ only by join time

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use studyroom_client::{ClientEvent, ResourceInput};
use studyroom_harness::{ClientSnapshot, InvariantRegistry, TestCluster};

const CLIENTS: usize = 3;

#[derive(Debug, Clone, Arbitrary)]
enum ClusterOp {
    Message { client: u8 },
    AddLink { client: u8, video: u8 },
    Remove { client: u8, index: u8 },
    Select { client: u8, index: u8 },
    Deliver { client: u8 },
    DeliverAll,
}

fn client(pick: u8) -> usize {
    usize::from(pick) % CLIENTS
}

fn apply(cluster: &mut TestCluster, op: ClusterOp) {
    let event = match op {
        ClusterOp::Message { client: c } => {
            Some((client(c), ClientEvent::SendMessage { text: format!("from {c}") }))
        },
        ClusterOp::AddLink { client: c, video } => {
            let url = format!("https://youtu.be/video{}", video % 4);
            Some((client(c), ClientEvent::AddResource(ResourceInput::Url(url))))
        },
        ClusterOp::Remove { client: c, index } => {
            let idx = client(c);
            let resources = cluster.client(idx).state().resources();
            resources
                .get(usize::from(index) % resources.len().max(1))
                .cloned()
                .map(|resource| (idx, ClientEvent::RemoveResource(resource)))
        },
        ClusterOp::Select { client: c, index } => {
            let idx = client(c);
            let resources = cluster.client(idx).state().resources();
            resources
                .get(usize::from(index) % resources.len().max(1))
                .cloned()
                .map(|resource| (idx, ClientEvent::SelectResource(resource)))
        },
        ClusterOp::Deliver { client: c } => {
            cluster.deliver_one(client(c)).unwrap();
            None
        },
        ClusterOp::DeliverAll => {
            cluster.deliver_all().unwrap();
            None
        },
    };

    if let Some((idx, event)) = event {
        cluster.handle(idx, event).unwrap();
    }
}

fuzz_target!(|input: (u64, Vec<ClusterOp>)| {
    let (seed, ops) = input;
    let mut cluster = TestCluster::new(seed, CLIENTS).unwrap();
    for idx in 0..CLIENTS {
        cluster.connect(idx).unwrap();
    }
    cluster.deliver_all().unwrap();

    for op in ops {
        apply(&mut cluster, op);

        for (idx, client) in cluster.clients().iter().enumerate() {
            let snapshot = ClientSnapshot::from_client(idx, client);
            if let Some(selected) = &snapshot.selected_resource {
                assert!(snapshot.resources.contains(selected), "client {idx} selection unknown");
            }
        }
    }

    cluster.deliver_all().unwrap();
    InvariantRegistry::standard().assert_all(&cluster.snapshot(), "after fuzzed session");
});
