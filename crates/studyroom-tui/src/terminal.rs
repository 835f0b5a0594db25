//! Terminal driver for the TUI.
//!
//! Implements the [`Driver`] trait for terminal I/O using crossterm for
//! keyboard events and ratatui for rendering. The room channel is a
//! WebSocket; uploads and assistant calls go to the HTTP backend.

use std::{
    io::{self, Stdout, stdout},
    path::Path,
    time::{Duration, Instant},
};

use crossterm::{
    ExecutableCommand,
    event::{Event, EventStream, KeyCode, KeyEventKind},
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use futures::StreamExt;
use ratatui::{Terminal, backend::CrosstermBackend};
use studyroom_app::{App, AppEvent, ChannelEvent, Driver, KeyInput};
use studyroom_client::{
    LocalFile,
    backend::{Backend, BackendError},
    transport::{self, ChannelHandle, ChannelMessage, TransportError},
};
use studyroom_proto::{
    OutboundEvent,
    http::{PDF_MIME, ServiceKind, ServiceRequest},
};
use thiserror::Error;
use tokio::sync::mpsc::error::TryRecvError;
use url::Url;

use crate::ui;

/// How long to wait for a key before emitting a tick.
const TICK_INTERVAL: Duration = Duration::from_millis(100);

/// Declared type for files that are not PDFs. Rejected before upload.
const FALLBACK_MIME: &str = "application/octet-stream";

/// Terminal driver errors.
#[derive(Debug, Error)]
pub enum TerminalError {
    /// I/O error from terminal operations.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Transport error.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Backend call failed.
    #[error("{0}")]
    Backend(#[from] BackendError),

    /// No open channel, or its task is gone.
    #[error("channel closed")]
    ChannelClosed,

    /// A local file could not be read.
    #[error("{path}: {source}")]
    File {
        /// Path as given by the user.
        path: String,
        /// Underlying error.
        source: io::Error,
    },
}

/// Terminal driver implementing the [`Driver`] trait.
///
/// Handles terminal I/O (crossterm), rendering (ratatui), the WebSocket
/// channel and the HTTP backend.
pub struct TerminalDriver {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    event_stream: EventStream,
    connection: Option<ChannelHandle>,
    backend: Backend,
}

impl TerminalDriver {
    /// Take over the terminal. It is restored on drop.
    pub fn new(backend: Backend) -> Result<Self, TerminalError> {
        enable_raw_mode()?;
        stdout().execute(EnterAlternateScreen)?;

        let terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

        Ok(Self { terminal, event_stream: EventStream::new(), connection: None, backend })
    }

    /// Convert crossterm `KeyCode` to `KeyInput`.
    fn convert_key(code: KeyCode) -> Option<KeyInput> {
        match code {
            KeyCode::Char(c) => Some(KeyInput::Char(c)),
            KeyCode::Enter => Some(KeyInput::Enter),
            KeyCode::Backspace => Some(KeyInput::Backspace),
            KeyCode::Delete => Some(KeyInput::Delete),
            KeyCode::Tab => Some(KeyInput::Tab),
            KeyCode::Esc => Some(KeyInput::Esc),
            KeyCode::Left => Some(KeyInput::Left),
            KeyCode::Right => Some(KeyInput::Right),
            KeyCode::Up => Some(KeyInput::Up),
            KeyCode::Down => Some(KeyInput::Down),
            KeyCode::Home => Some(KeyInput::Home),
            KeyCode::End => Some(KeyInput::End),
            _ => None,
        }
    }
}

/// Identifier for a freshly opened channel.
///
/// The WebSocket server does not announce one, so it is drawn locally.
fn new_connection_id() -> String {
    format!("ws-{:016x}", rand::random::<u64>())
}

/// File name shown for an uploaded path.
fn file_name(path: &Path) -> String {
    path.file_name().map_or_else(
        || path.display().to_string(),
        |name| name.to_string_lossy().into_owned(),
    )
}

/// MIME type declared for a local file, from its extension.
fn mime_type(path: &Path) -> &'static str {
    let is_pdf = path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));
    if is_pdf { PDF_MIME } else { FALLBACK_MIME }
}

/// Read a file picked by the user.
async fn read_local_file(path: &Path) -> Result<LocalFile, TerminalError> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|source| TerminalError::File { path: path.display().to_string(), source })?;

    Ok(LocalFile { name: file_name(path), mime_type: mime_type(path).into(), bytes })
}

impl Driver for TerminalDriver {
    type Error = TerminalError;
    type Instant = Instant;

    async fn poll_event(&mut self) -> Result<Option<AppEvent>, Self::Error> {
        tokio::select! {
            biased;

            // Terminal events
            maybe_event = self.event_stream.next() => {
                match maybe_event {
                    Some(Ok(Event::Key(key_event))) if key_event.kind == KeyEventKind::Press => {
                        Ok(Self::convert_key(key_event.code).map(AppEvent::Key))
                    },
                    Some(Ok(Event::Resize(cols, rows))) => Ok(Some(AppEvent::Resize(cols, rows))),
                    Some(Err(e)) => Err(TerminalError::Io(e)),
                    _ => Ok(None),
                }
            }

            // Tick timeout
            () = tokio::time::sleep(TICK_INTERVAL) => Ok(Some(AppEvent::Tick)),
        }
    }

    async fn open_channel(&mut self, url: &Url) -> Result<String, Self::Error> {
        let handle = transport::connect(url).await?;
        let connection_id = new_connection_id();
        tracing::info!(%url, %connection_id, "channel open");
        self.connection = Some(handle);
        Ok(connection_id)
    }

    async fn close_channel(&mut self) {
        if let Some(connection) = self.connection.take() {
            connection.close().await;
            tracing::info!("channel closed");
        }
    }

    fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    async fn send_event(&mut self, event: OutboundEvent) -> Result<(), Self::Error> {
        let Some(connection) = &self.connection else {
            return Err(TerminalError::ChannelClosed);
        };
        let to_server = connection.sender()?;
        tracing::debug!(event = event.name(), "emit");
        to_server.send(event).await.map_err(|_| TerminalError::ChannelClosed)
    }

    async fn recv_event(&mut self) -> Option<ChannelEvent> {
        let connection = self.connection.as_mut()?;
        match connection.from_server.try_recv() {
            Ok(ChannelMessage::Event(event)) => Some(ChannelEvent::Received(event)),
            Ok(ChannelMessage::Closed { reason }) => {
                self.connection = None;
                Some(ChannelEvent::Closed { reason })
            },
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                self.connection = None;
                Some(ChannelEvent::Closed { reason: "channel task ended".into() })
            },
        }
    }

    async fn read_file(&mut self, path: &Path) -> Result<LocalFile, Self::Error> {
        read_local_file(path).await
    }

    async fn upload_pdf(&mut self, file: &LocalFile) -> Result<String, Self::Error> {
        Ok(self.backend.upload_pdf(file).await?)
    }

    async fn call_service(
        &mut self,
        kind: ServiceKind,
        request: &ServiceRequest,
    ) -> Result<String, Self::Error> {
        Ok(self.backend.call(kind, request).await?)
    }

    fn now(&self) -> Self::Instant {
        Instant::now()
    }

    fn render(&mut self, app: &App) -> Result<(), Self::Error> {
        self.terminal.draw(|frame| ui::render(frame, app))?;
        Ok(())
    }

    /// Drops a channel that is still open without flushing it.
    fn stop(&mut self) {
        self.connection = None;
    }
}

impl Drop for TerminalDriver {
    fn drop(&mut self) {
        self.stop();
        let _ = disable_raw_mode();
        let _ = stdout().execute(LeaveAlternateScreen);
    }
}
