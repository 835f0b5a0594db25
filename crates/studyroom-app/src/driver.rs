//! Driver trait for abstracting I/O operations.
//!
//! The [`Driver`] trait decouples the application runtime from specific I/O
//! implementations. Each frontend implements the trait to provide
//! platform-specific I/O, while the generic [`crate::Runtime`] handles all
//! orchestration.

use std::{future::Future, ops::Sub, path::Path, time::Duration};

use studyroom_client::LocalFile;
use studyroom_proto::{
    InboundEvent, OutboundEvent,
    http::{ServiceKind, ServiceRequest},
};
use url::Url;

use crate::{App, AppEvent};

/// What the room channel delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    /// A decoded server event.
    Received(InboundEvent),
    /// The channel closed.
    Closed {
        /// Close reason reported by the transport.
        reason: String,
    },
}

/// Abstracts I/O operations for the application runtime.
///
/// Implementations provide platform-specific I/O while the generic
/// [`Runtime`](crate::Runtime) handles orchestration logic. This ensures
/// the same orchestration code runs in the terminal and in simulation.
///
/// # Implementations
///
/// - **TUI**: crossterm for terminal events, WebSocket channel, HTTP backend
/// - **Simulation**: in-memory server, scripted backend, virtual time
///
/// # Errors
///
/// Only [`poll_event`](Driver::poll_event) and [`render`](Driver::render)
/// failures end the loop. Channel, file and backend failures are reported
/// to the user and the loop carries on.
pub trait Driver: Send {
    /// Platform-specific error type.
    type Error: std::error::Error + Send + 'static;

    /// Time instant type. Enables virtual time in simulation.
    type Instant: Copy + Ord + Send + Sync + Sub<Output = Duration>;

    /// Poll for the next input event.
    ///
    /// Returns `None` if no events are ready.
    fn poll_event(&mut self) -> impl Future<Output = Result<Option<AppEvent>, Self::Error>> + Send;

    /// Open the room channel. Returns the transport-assigned connection id.
    fn open_channel(
        &mut self,
        url: &Url,
    ) -> impl Future<Output = Result<String, Self::Error>> + Send;

    /// Close the room channel, if open.
    ///
    /// Events already handed to [`send_event`](Driver::send_event) are
    /// flushed before the channel goes away, within a bounded wait.
    fn close_channel(&mut self) -> impl Future<Output = ()> + Send;

    /// Check if the channel is open.
    fn is_connected(&self) -> bool;

    /// Send an event over the channel.
    fn send_event(
        &mut self,
        event: OutboundEvent,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Next channel event, without waiting. `None` if nothing is queued.
    fn recv_event(&mut self) -> impl Future<Output = Option<ChannelEvent>> + Send;

    /// Read a local file for upload.
    fn read_file(
        &mut self,
        path: &Path,
    ) -> impl Future<Output = Result<LocalFile, Self::Error>> + Send;

    /// Upload a PDF. Returns the server path of the stored file.
    fn upload_pdf(
        &mut self,
        file: &LocalFile,
    ) -> impl Future<Output = Result<String, Self::Error>> + Send;

    /// Call an assistant service. Returns the reply text.
    fn call_service(
        &mut self,
        kind: ServiceKind,
        request: &ServiceRequest,
    ) -> impl Future<Output = Result<String, Self::Error>> + Send;

    /// Current time instant.
    fn now(&self) -> Self::Instant;

    /// Render the application state.
    fn render(&mut self, app: &App) -> Result<(), Self::Error>;

    /// Release resources before exit.
    fn stop(&mut self);
}
