//! Deterministic simulation harness for study room clients.
//!
//! In-memory implementations of the server, the driver and the environment
//! for deterministic, reproducible testing of the client and the runtime.
//!
//! # Components
//!
//! - [`SimEnv`]: seeded ChaCha RNG and a virtual clock
//! - [`SimServer`]: authoritative in-memory room server with the broadcast
//!   rules clients rely on
//! - [`SimDriver`]: [`studyroom_app::Driver`] over a shared [`SimServer`],
//!   with scripted files, uploads and assistant replies
//! - [`TestCluster`]: several Sans-IO clients pumped against one server
//!
//! # Invariant Testing
//!
//! The `invariants` module checks behavioral properties over snapshots of
//! client state. Use [`InvariantRegistry::standard()`] once the network is
//! quiescent to verify that every client of a room converged.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cluster;
pub mod invariants;
pub mod sim_driver;
pub mod sim_env;
pub mod sim_server;

pub use cluster::TestCluster;
pub use invariants::{
    ClientSnapshot, Invariant, InvariantRegistry, InvariantResult, MessageSuffix,
    ParticipantConvergence, ResourceConvergence, SelectionKnown, SystemSnapshot, Violation,
};
pub use sim_driver::{SimDriver, SimDriverError};
pub use sim_env::SimEnv;
pub use sim_server::{SharedSimServer, SimRoom, SimServer, create_shared_server};
