//! Terminal front-end for study rooms
//!
//! Wires the [`studyroom_app::Runtime`] to a real terminal (crossterm input,
//! ratatui rendering), the WebSocket channel and the HTTP backend.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod terminal;
pub mod ui;

pub use terminal::{TerminalDriver, TerminalError};
