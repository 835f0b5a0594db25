//! WebSocket channel to the real-time server.
//!
//! Provides [`ChannelHandle`], a pair of mpsc queues bridged to a WebSocket
//! by a background task. This is a thin layer that only moves JSON text;
//! protocol logic remains in the Sans-IO [`Client`](crate::Client).

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use studyroom_proto::{InboundEvent, OutboundEvent};
use thiserror::Error;
use tokio::{sync::mpsc, task::JoinHandle};
use tokio_tungstenite::tungstenite::{self, Message};
use url::Url;

/// Queue depth in both directions.
const CHANNEL_CAPACITY: usize = 64;

/// How long [`ChannelHandle::close`] waits for queued events to go out.
pub const CLOSE_TIMEOUT: Duration = Duration::from_secs(2);

/// Transport errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The WebSocket could not be opened.
    #[error("connection failed: {0}")]
    Connection(String),

    /// The channel task is gone.
    #[error("channel closed")]
    Closed,
}

impl From<tungstenite::Error> for TransportError {
    fn from(e: tungstenite::Error) -> Self {
        Self::Connection(e.to_string())
    }
}

/// What the background task delivers from the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelMessage {
    /// A decoded inbound event.
    Event(InboundEvent),
    /// The socket closed. Nothing follows.
    Closed {
        /// Close reason, or the error that ended the socket.
        reason: String,
    },
}

/// Handle to an open channel.
///
/// Dropping the handle aborts the task at once. [`close`](Self::close)
/// flushes queued events and sends a close frame first.
pub struct ChannelHandle {
    to_server: Option<mpsc::Sender<OutboundEvent>>,
    /// Events and the final close notice from the server.
    pub from_server: mpsc::Receiver<ChannelMessage>,
    task: Option<JoinHandle<()>>,
}

impl ChannelHandle {
    /// Sender for queueing events, for callers that must not hold the
    /// handle across an await.
    pub fn sender(&self) -> Result<mpsc::Sender<OutboundEvent>, TransportError> {
        self.to_server.clone().ok_or(TransportError::Closed)
    }

    /// Queue an event for sending.
    pub async fn send(&self, event: OutboundEvent) -> Result<(), TransportError> {
        let Some(to_server) = &self.to_server else {
            return Err(TransportError::Closed);
        };
        to_server.send(event).await.map_err(|_| TransportError::Closed)
    }

    /// Close the channel gracefully.
    ///
    /// Ends the outgoing queue so the task sends what is already queued,
    /// then a close frame. The task is aborted if it has not finished
    /// within [`CLOSE_TIMEOUT`].
    pub async fn close(mut self) {
        self.from_server.close();
        self.to_server = None;

        let Some(mut task) = self.task.take() else {
            return;
        };
        if tokio::time::timeout(CLOSE_TIMEOUT, &mut task).await.is_err() {
            tracing::warn!(timeout = ?CLOSE_TIMEOUT, "channel close timed out");
            task.abort();
        }
    }
}

impl Drop for ChannelHandle {
    fn drop(&mut self) {
        if let Some(task) = &self.task {
            task.abort();
        }
    }
}

/// Open a WebSocket channel to `url`.
pub async fn connect(url: &Url) -> Result<ChannelHandle, TransportError> {
    if !matches!(url.scheme(), "ws" | "wss") {
        return Err(TransportError::Connection(format!("unsupported scheme `{}`", url.scheme())));
    }

    let (socket, _response) = tokio_tungstenite::connect_async(url.as_str()).await?;
    tracing::info!(%url, "websocket open");

    let (to_server_tx, to_server_rx) = mpsc::channel::<OutboundEvent>(CHANNEL_CAPACITY);
    let (from_server_tx, from_server_rx) = mpsc::channel::<ChannelMessage>(CHANNEL_CAPACITY);

    let task = tokio::spawn(run_channel(socket, to_server_rx, from_server_tx));

    Ok(ChannelHandle {
        to_server: Some(to_server_tx),
        from_server: from_server_rx,
        task: Some(task),
    })
}

type Socket =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

/// Bridge the queues and the socket until either side closes.
///
/// Outgoing events are polled first, so everything queued before the
/// queue ends is written ahead of the close frame.
async fn run_channel(
    socket: Socket,
    mut to_server: mpsc::Receiver<OutboundEvent>,
    from_server: mpsc::Sender<ChannelMessage>,
) {
    let (mut sink, mut stream) = socket.split();

    let reason = loop {
        tokio::select! {
            biased;

            outgoing = to_server.recv() => {
                let Some(event) = outgoing else {
                    if sink.send(Message::Close(None)).await.is_ok() {
                        // Wait for the server to answer the close.
                        while let Some(Ok(message)) = stream.next().await {
                            if message.is_close() {
                                break;
                            }
                        }
                    }
                    break "client closed".to_string();
                };
                match event.encode() {
                    Ok(text) => {
                        if let Err(e) = sink.send(Message::Text(text.into())).await {
                            break e.to_string();
                        }
                    },
                    Err(e) => {
                        tracing::warn!(event = event.name(), error = %e, "unencodable event");
                    },
                }
            },
            incoming = stream.next() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => match InboundEvent::decode(text.as_str()) {
                        Ok(event) => {
                            if from_server.send(ChannelMessage::Event(event)).await.is_err() {
                                break "receiver dropped".to_string();
                            }
                        },
                        Err(e) => tracing::warn!(error = %e, "dropping malformed event"),
                    },
                    Some(Ok(Message::Close(frame))) => break close_reason(frame),
                    Some(Ok(_)) => {},
                    Some(Err(e)) => break e.to_string(),
                    None => break "stream ended".to_string(),
                }
            },
        }
    };

    tracing::info!(%reason, "websocket closed");
    let _ = from_server.send(ChannelMessage::Closed { reason }).await;
}

fn close_reason(frame: Option<tungstenite::protocol::CloseFrame>) -> String {
    frame.map_or_else(|| "closed by server".to_string(), |f| f.reason.to_string())
}
