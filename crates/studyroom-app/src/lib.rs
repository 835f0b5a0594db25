//! Application layer for study rooms
//!
//! Pure state machines and a generic runtime for UI and client orchestration,
//! so the simulation harness drives the same code that runs in the terminal.
//!
//! # Components
//!
//! - [`App`]: UI state machine (input line, commands, toasts, assistant)
//! - [`Bridge`]: Client bridge (translates App actions to client events and
//!   collects I/O effects)
//! - [`Driver`]: Trait for platform-specific I/O abstraction
//! - [`Runtime`]: Generic orchestration loop using Driver

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod action;
mod app;
mod bridge;
pub mod commands;
mod driver;
mod event;
mod input;
mod runtime;
mod state;

pub use action::AppAction;
pub use app::{App, MAX_TOASTS};
pub use bridge::{Bridge, Effect};
pub use driver::{ChannelEvent, Driver};
pub use event::AppEvent;
pub use input::{InputState, KeyInput, KeyOutcome};
pub use runtime::Runtime;
pub use state::{AssistantEntry, RoomView, Toast, ToastLevel};
pub use studyroom_client::ConnectionState;
