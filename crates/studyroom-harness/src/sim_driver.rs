//! Simulation driver implementing the Driver trait.
//!
//! `SimDriver` provides the same interface as the terminal driver but for
//! deterministic testing. It implements [`Driver`] so the same
//! [`studyroom_app::Runtime`] orchestration code runs in both production and
//! simulation. The channel goes to a [`SharedSimServer`]; files, uploads and
//! assistant replies are scripted by the test.

#![allow(clippy::disallowed_types, reason = "Synchronous locking operations only")]

use std::{
    collections::{HashMap, VecDeque},
    path::{Path, PathBuf},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use studyroom_app::{App, AppEvent, ChannelEvent, Driver};
use studyroom_client::{Environment, LocalFile};
use studyroom_proto::{
    OutboundEvent,
    http::{ServiceKind, ServiceRequest},
};
use url::Url;

use crate::{
    SimEnv,
    invariants::{ClientSnapshot, InvariantRegistry, SystemSnapshot},
    sim_server::{SharedSimServer, SimServer},
};

/// Error type for simulation driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimDriverError(pub String);

impl std::fmt::Display for SimDriverError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SimDriverError: {}", self.0)
    }
}

impl std::error::Error for SimDriverError {}

/// Shared state for injection and inspection.
///
/// This allows injection from outside async contexts, and from tests that
/// only hold the driver through a [`studyroom_app::Runtime`].
#[derive(Default)]
struct SharedState {
    pending_events: VecDeque<AppEvent>,
    files: HashMap<PathBuf, LocalFile>,
    upload_replies: VecDeque<Result<String, String>>,
    service_replies: VecDeque<Result<String, String>>,
    sent: Vec<OutboundEvent>,
    uploads: Vec<LocalFile>,
    service_calls: Vec<(ServiceKind, ServiceRequest)>,
    renders: usize,
    stopped: bool,
}

/// Simulation driver for deterministic testing.
pub struct SimDriver {
    server: SharedSimServer,
    env: SimEnv,
    connection_id: Option<String>,
    state: Arc<Mutex<SharedState>>,
    invariants: Option<InvariantRegistry>,
}

impl SimDriver {
    /// Create a driver connected to `server`, reading time from `env`.
    pub fn new(server: SharedSimServer, env: SimEnv) -> Self {
        Self {
            server,
            env,
            connection_id: None,
            state: Arc::new(Mutex::new(SharedState::default())),
            invariants: None,
        }
    }

    /// Check invariants against the App on every render.
    ///
    /// A violation fails the render, which ends the runtime loop.
    #[must_use]
    pub fn with_invariants(mut self, registry: InvariantRegistry) -> Self {
        self.invariants = Some(registry);
        self
    }

    /// Inject an `AppEvent` for processing.
    pub fn inject_event(&self, event: AppEvent) {
        self.lock().pending_events.push_back(event);
    }

    /// Inject a tick event.
    pub fn inject_tick(&self) {
        self.inject_event(AppEvent::Tick);
    }

    /// Make `file` readable at `path`.
    pub fn add_file(&self, path: impl Into<PathBuf>, file: LocalFile) {
        self.lock().files.insert(path.into(), file);
    }

    /// Script the outcome of the next upload. Unscripted uploads succeed.
    pub fn script_upload(&self, outcome: Result<String, String>) {
        self.lock().upload_replies.push_back(outcome);
    }

    /// Script the outcome of the next service call.
    pub fn script_service(&self, outcome: Result<String, String>) {
        self.lock().service_replies.push_back(outcome);
    }

    /// Check if there are pending input events.
    pub fn has_pending(&self) -> bool {
        !self.lock().pending_events.is_empty()
    }

    /// Events sent over the channel so far.
    pub fn sent(&self) -> Vec<OutboundEvent> {
        self.lock().sent.clone()
    }

    /// Files uploaded so far.
    pub fn uploads(&self) -> Vec<LocalFile> {
        self.lock().uploads.clone()
    }

    /// Service calls made so far.
    pub fn service_calls(&self) -> Vec<(ServiceKind, ServiceRequest)> {
        self.lock().service_calls.clone()
    }

    /// Number of frames rendered.
    pub fn renders(&self) -> usize {
        self.lock().renders
    }

    /// Whether the runtime released the driver.
    pub fn is_stopped(&self) -> bool {
        self.lock().stopped
    }

    /// Server-assigned id of the open channel.
    pub fn connection_id(&self) -> Option<&str> {
        self.connection_id.as_deref()
    }

    /// The virtual clock this driver reports.
    pub fn env(&self) -> &SimEnv {
        &self.env
    }

    /// Check invariants against App state.
    pub fn check_invariants(&self, app: &App, context: &str) {
        if let Some(ref registry) = self.invariants {
            let snapshot = SystemSnapshot::single(ClientSnapshot::from_app(0, app));
            registry.assert_all(&snapshot, context);
        }
    }

    fn lock(&self) -> MutexGuard<'_, SharedState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn with_server<T>(&self, f: impl FnOnce(&mut SimServer) -> T) -> T {
        let mut server = self.server.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut server)
    }

    /// Sends are delivered synchronously, so there is nothing to flush.
    fn drop_channel(&mut self) {
        if let Some(connection_id) = self.connection_id.take() {
            self.with_server(|server| server.disconnect(&connection_id));
        }
    }
}

impl Driver for SimDriver {
    type Error = SimDriverError;
    type Instant = Duration;

    async fn poll_event(&mut self) -> Result<Option<AppEvent>, Self::Error> {
        Ok(self.lock().pending_events.pop_front())
    }

    async fn open_channel(&mut self, url: &Url) -> Result<String, Self::Error> {
        let connection_id = self.with_server(SimServer::connect).map_err(SimDriverError)?;
        tracing::debug!(%url, %connection_id, "simulated channel open");
        self.connection_id = Some(connection_id.clone());
        Ok(connection_id)
    }

    async fn close_channel(&mut self) {
        self.drop_channel();
    }

    fn is_connected(&self) -> bool {
        self.connection_id.is_some()
    }

    async fn send_event(&mut self, event: OutboundEvent) -> Result<(), Self::Error> {
        let Some(connection_id) = self.connection_id.clone() else {
            return Err(SimDriverError("channel closed".into()));
        };
        self.lock().sent.push(event.clone());
        self.with_server(|server| server.handle(&connection_id, event));
        Ok(())
    }

    async fn recv_event(&mut self) -> Option<ChannelEvent> {
        let connection_id = self.connection_id.clone()?;
        self.with_server(|server| server.recv(&connection_id))
    }

    async fn read_file(&mut self, path: &Path) -> Result<LocalFile, Self::Error> {
        self.lock()
            .files
            .get(path)
            .cloned()
            .ok_or_else(|| SimDriverError(format!("no such file: {}", path.display())))
    }

    async fn upload_pdf(&mut self, file: &LocalFile) -> Result<String, Self::Error> {
        let mut state = self.lock();
        state.uploads.push(file.clone());
        state
            .upload_replies
            .pop_front()
            .unwrap_or_else(|| Ok(format!("uploads/{}", file.name)))
            .map_err(SimDriverError)
    }

    async fn call_service(
        &mut self,
        kind: ServiceKind,
        request: &ServiceRequest,
    ) -> Result<String, Self::Error> {
        let mut state = self.lock();
        state.service_calls.push((kind, request.clone()));
        state
            .service_replies
            .pop_front()
            .unwrap_or_else(|| Ok(format!("{} reply", kind.label())))
            .map_err(SimDriverError)
    }

    fn now(&self) -> Self::Instant {
        self.env.now()
    }

    fn render(&mut self, app: &App) -> Result<(), Self::Error> {
        self.lock().renders += 1;
        if let Some(registry) = &self.invariants {
            let snapshot = SystemSnapshot::single(ClientSnapshot::from_app(0, app));
            if let Err(violations) = registry.check_all(&snapshot) {
                let messages: Vec<_> = violations.iter().map(ToString::to_string).collect();
                return Err(SimDriverError(messages.join("; ")));
            }
        }
        Ok(())
    }

    fn stop(&mut self) {
        self.drop_channel();
        self.lock().stopped = true;
    }
}

#[cfg(test)]
mod tests {
    use studyroom_app::KeyInput;

    use super::*;
    use crate::create_shared_server;

    fn driver() -> SimDriver {
        SimDriver::new(create_shared_server(), SimEnv::new())
    }

    fn channel_url() -> Url {
        Url::parse("ws://sim.local/ws").unwrap()
    }

    #[test]
    fn inject_event_queues_event() {
        let driver = driver();
        driver.inject_event(AppEvent::Key(KeyInput::Char('a')));

        assert!(driver.has_pending());
    }

    #[tokio::test]
    async fn poll_event_drains_in_order() {
        let mut driver = driver();
        driver.inject_tick();
        driver.inject_event(AppEvent::Resize(80, 24));

        assert_eq!(driver.poll_event().await.unwrap(), Some(AppEvent::Tick));
        assert_eq!(driver.poll_event().await.unwrap(), Some(AppEvent::Resize(80, 24)));
        assert_eq!(driver.poll_event().await.unwrap(), None);
    }

    #[tokio::test]
    async fn send_requires_open_channel() {
        let mut driver = driver();
        let event = OutboundEvent::Leave(studyroom_proto::MembershipPayload {
            room_id: studyroom_proto::RoomId::new("lq3x9k2mab12cd34").unwrap(),
            participant: studyroom_proto::Participant::new(
                studyroom_proto::ParticipantId::new("sim0001").unwrap(),
                "Alice",
            ),
        });

        assert!(driver.send_event(event.clone()).await.is_err());

        driver.open_channel(&channel_url()).await.unwrap();
        driver.send_event(event).await.unwrap();
        assert_eq!(driver.sent().len(), 1);
    }

    #[tokio::test]
    async fn refused_channel_reports_reason() {
        let server = create_shared_server();
        server.lock().unwrap().set_unavailable(Some("connection refused".into()));
        let mut driver = SimDriver::new(server, SimEnv::new());

        let error = driver.open_channel(&channel_url()).await.unwrap_err();
        assert_eq!(error.to_string(), "SimDriverError: connection refused");
        assert!(!driver.is_connected());
    }

    #[tokio::test]
    async fn scripted_upload_overrides_default() {
        let mut driver = driver();
        let file = LocalFile {
            name: "notes.pdf".into(),
            mime_type: "application/pdf".into(),
            bytes: b"%PDF".to_vec(),
        };
        driver.script_upload(Err("storage full".into()));

        assert!(driver.upload_pdf(&file).await.is_err());
        assert_eq!(driver.upload_pdf(&file).await.unwrap(), "uploads/notes.pdf");
        assert_eq!(driver.uploads().len(), 2);
    }
}
