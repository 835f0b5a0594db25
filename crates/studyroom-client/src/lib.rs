//! Client
//!
//! Action-based room synchronization client. Keeps a local projection of a
//! study room consistent with the server's broadcasts and turns user intents
//! into validated outbound events.
//!
//! # Architecture
//!
//! The client is Sans-IO. It receives events ([`ClientEvent`]), processes
//! them through pure state machine logic, and returns actions
//! ([`ClientAction`]) for the caller to execute. Time and randomness come
//! from an [`Environment`], so the same logic runs against real sockets and
//! inside the deterministic simulation.
//!
//! # Components
//!
//! - [`ConnectionManager`]: channel lifecycle, typed subscriptions, emission
//!   gate
//! - [`RoomSession`]: room identity and once-per-connection membership
//! - [`RoomState`]: reducer over inbound events
//! - [`Dispatcher`]: intent validation, uploads, local mute overlay
//! - [`Client`]: composes the above behind `handle(event) -> actions`
//!
//! # Transport (optional)
//!
//! With the `transport` feature enabled, this crate also provides:
//! - [`transport::connect`]: WebSocket channel to the server
//! - [`backend::Backend`]: HTTP uploads and assistant services
//! - [`SystemEnv`]: system clock and OS randomness

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod client;
pub mod connection;
pub mod dispatcher;
mod env;
mod error;
mod event;
pub mod session;
pub mod state;

#[cfg(feature = "transport")]
pub mod backend;
#[cfg(feature = "transport")]
mod system_env;
#[cfg(feature = "transport")]
pub mod transport;

pub use client::{Client, ClientConfig, RoomChoice};
pub use connection::{ConnectionManager, ConnectionState, Handler, SubscriptionId};
pub use dispatcher::{Dispatch, Dispatcher, LocalFile, ResourceInput};
pub use env::Environment;
pub use error::{ClientError, ValidationError};
pub use event::{ClientAction, ClientEvent};
pub use session::RoomSession;
pub use state::{Notice, RoomState};
#[cfg(feature = "transport")]
pub use system_env::SystemEnv;
