//! Outbound Action Dispatcher.
//!
//! Validates user intents and turns them into outbound events. The
//! dispatcher never touches [`RoomState`]: the room only changes when the
//! server broadcasts the result.
//!
//! PDF files take a detour through the upload collaborator. The dispatcher
//! parks the file under a request id, the caller uploads it, and only the
//! server-provided path is shared. Failed or expired uploads leave no trace.

use std::{
    collections::{HashMap, HashSet},
    fmt,
    ops::Sub,
    time::Duration,
};

use studyroom_proto::{
    MessagePayload, OutboundEvent, Participant, ParticipantId, Resource, ResourceKind,
    ResourcePayload, http::PDF_MIME,
};
use url::Url;

use crate::{
    error::{ClientError, ValidationError},
    session::RoomSession,
    state::{Notice, RoomState},
};

/// Pending uploads older than this are abandoned.
pub const UPLOAD_TIMEOUT: Duration = Duration::from_secs(120);

/// Name given to a linked PDF whose URL has no usable path segment.
pub const DEFAULT_PDF_NAME: &str = "New PDF";

/// Domains (and their subdomains) classified as YouTube.
const YOUTUBE_DOMAINS: &[&str] = &["youtube.com", "youtu.be", "youtube-nocookie.com"];

/// What the user asked to share.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceInput {
    /// A link, classified by host.
    Url(String),
    /// A local file, uploaded before sharing.
    File(LocalFile),
}

/// A file picked by the user.
#[derive(Clone, PartialEq, Eq)]
pub struct LocalFile {
    /// File name, used as the resource name.
    pub name: String,
    /// Declared MIME type.
    pub mime_type: String,
    /// File content.
    pub bytes: Vec<u8>,
}

impl fmt::Debug for LocalFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalFile")
            .field("name", &self.name)
            .field("mime_type", &self.mime_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Result of dispatching an add-resource intent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// Emit this event now.
    Emit(OutboundEvent),
    /// Upload the file first.
    Upload {
        /// Correlates the completion.
        request_id: u64,
        /// File to upload.
        file: LocalFile,
    },
}

#[derive(Debug)]
struct PendingUpload<I> {
    name: String,
    started: I,
}

/// Validation, upload bookkeeping and the local mute overlay.
#[derive(Debug)]
pub struct Dispatcher<I> {
    pending_uploads: HashMap<u64, PendingUpload<I>>,
    next_request_id: u64,
    mute_overlay: HashSet<ParticipantId>,
}

impl<I> Default for Dispatcher<I> {
    fn default() -> Self {
        Self { pending_uploads: HashMap::new(), next_request_id: 1, mute_overlay: HashSet::new() }
    }
}

impl<I> Dispatcher<I>
where
    I: Copy + Ord + Sub<Output = Duration>,
{
    /// Create a dispatcher with nothing pending.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a chat message.
    ///
    /// Rejects text that is empty after trimming; otherwise the text is sent
    /// exactly as typed.
    pub fn send_message(
        &self,
        session: &RoomSession,
        text: &str,
    ) -> Result<OutboundEvent, ValidationError> {
        validate_message(text)?;
        Ok(OutboundEvent::Message(MessagePayload {
            room_id: session.room_id().clone(),
            message: text.to_string(),
            sender: session.display_name().to_string(),
        }))
    }

    /// Validate a resource and decide whether it can be emitted directly.
    pub fn add_resource(
        &mut self,
        session: &RoomSession,
        input: ResourceInput,
        now: I,
    ) -> Result<Dispatch, ValidationError> {
        match input {
            ResourceInput::Url(raw) => {
                let resource = classify_url(&raw)?;
                Ok(Dispatch::Emit(resource_added(session, resource)))
            },
            ResourceInput::File(file) => {
                validate_pdf_file(&file)?;

                let request_id = self.next_request_id;
                self.next_request_id += 1;
                self.pending_uploads
                    .insert(request_id, PendingUpload { name: file.name.clone(), started: now });

                tracing::debug!(request_id, name = %file.name, "upload queued");
                Ok(Dispatch::Upload { request_id, file })
            },
        }
    }

    /// Complete an upload.
    ///
    /// Returns the `resource_added` to emit, `None` for an unknown or expired
    /// request, or the upload failure.
    pub fn finish_upload(
        &mut self,
        session: &RoomSession,
        request_id: u64,
        outcome: Result<String, String>,
    ) -> Result<Option<OutboundEvent>, ClientError> {
        let Some(pending) = self.pending_uploads.remove(&request_id) else {
            tracing::warn!(request_id, "completion for unknown upload ignored");
            return Ok(None);
        };

        match outcome {
            Ok(file_path) => {
                tracing::debug!(request_id, %file_path, "upload stored");
                let resource = Resource::new(pending.name, file_path, ResourceKind::Pdf);
                Ok(Some(resource_added(session, resource)))
            },
            Err(reason) => {
                tracing::warn!(request_id, name = %pending.name, %reason, "upload failed");
                Err(ClientError::UploadFailed { name: pending.name, reason })
            },
        }
    }

    /// Abandon uploads pending for longer than [`UPLOAD_TIMEOUT`].
    ///
    /// A `now` earlier than an upload's start never expires it.
    pub fn expire_uploads(&mut self, now: I) -> Vec<Notice> {
        let expired: Vec<u64> = self
            .pending_uploads
            .iter()
            .filter(|(_, pending)| now > pending.started && now - pending.started > UPLOAD_TIMEOUT)
            .map(|(id, _)| *id)
            .collect();

        expired
            .into_iter()
            .filter_map(|id| self.pending_uploads.remove(&id))
            .map(|pending| {
                tracing::warn!(name = %pending.name, "upload timed out");
                Notice::UploadExpired { name: pending.name }
            })
            .collect()
    }

    /// Number of uploads awaiting completion.
    pub fn pending_uploads(&self) -> usize {
        self.pending_uploads.len()
    }

    /// Build a `resource_removed`. Not checked against the local list.
    pub fn remove_resource(&self, session: &RoomSession, resource: Resource) -> OutboundEvent {
        OutboundEvent::ResourceRemoved(ResourcePayload {
            room_id: session.room_id().clone(),
            resource,
        })
    }

    /// Build a `resource_selected`. Not checked against the local list.
    pub fn select_resource(&self, session: &RoomSession, resource: Resource) -> OutboundEvent {
        OutboundEvent::ResourceSelected(ResourcePayload {
            room_id: session.room_id().clone(),
            resource,
        })
    }

    /// Flip the displayed mute state of a participant.
    ///
    /// Returns the new displayed state.
    pub fn toggle_mute(
        &mut self,
        state: &RoomState,
        id: &ParticipantId,
    ) -> Result<bool, ClientError> {
        let participant =
            state.participant(id).ok_or_else(|| ClientError::UnknownParticipant(id.clone()))?;

        if !self.mute_overlay.remove(id) {
            self.mute_overlay.insert(id.clone());
        }
        Ok(self.displayed_mute(participant))
    }

    /// Drop overlay entries for participants who left.
    pub fn retain_mutes(&mut self, state: &RoomState) {
        self.mute_overlay.retain(|id| state.participant(id).is_some());
    }

    /// Participants with the local overlay applied.
    pub fn participants(&self, state: &RoomState) -> Vec<Participant> {
        state
            .participants()
            .iter()
            .map(|p| Participant { is_muted: self.displayed_mute(p), ..p.clone() })
            .collect()
    }

    fn displayed_mute(&self, participant: &Participant) -> bool {
        participant.is_muted ^ self.mute_overlay.contains(&participant.id)
    }
}

fn resource_added(session: &RoomSession, resource: Resource) -> OutboundEvent {
    OutboundEvent::ResourceAdded(ResourcePayload { room_id: session.room_id().clone(), resource })
}

/// Reject messages that are empty after trimming.
pub fn validate_message(text: &str) -> Result<(), ValidationError> {
    if text.trim().is_empty() { Err(ValidationError::EmptyMessage) } else { Ok(()) }
}

/// Require the PDF MIME type and non-empty content.
pub fn validate_pdf_file(file: &LocalFile) -> Result<(), ValidationError> {
    if file.mime_type != PDF_MIME {
        return Err(ValidationError::NotPdf {
            name: file.name.clone(),
            mime_type: file.mime_type.clone(),
        });
    }
    if file.bytes.is_empty() {
        return Err(ValidationError::EmptyFile { name: file.name.clone() });
    }
    Ok(())
}

/// Validate a link and build the resource it shares.
///
/// The link is kept as given (trimmed). YouTube hosts produce a `youtube`
/// resource named after the video id; anything else is treated as a PDF
/// named after its last path segment.
pub fn classify_url(raw: &str) -> Result<Resource, ValidationError> {
    let raw = raw.trim();
    let invalid = |reason: &str| ValidationError::InvalidUrl {
        url: raw.to_string(),
        reason: reason.to_string(),
    };

    let url = Url::parse(raw).map_err(|e| invalid(&e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid("only http and https links can be shared"));
    }
    let host = url.host_str().filter(|h| !h.is_empty()).ok_or_else(|| invalid("missing host"))?;

    if is_youtube_host(host) {
        let name = youtube_video_id(&url)
            .map_or_else(|| raw.to_string(), |id| format!("YouTube video {id}"));
        return Ok(Resource::new(name, raw, ResourceKind::Youtube));
    }

    let name = url
        .path_segments()
        .and_then(|mut segments| segments.rfind(|s| !s.is_empty()))
        .map_or_else(|| DEFAULT_PDF_NAME.to_string(), str::to_string);
    Ok(Resource::new(name, raw, ResourceKind::Pdf))
}

/// Whether `host` is a YouTube domain or a subdomain of one.
pub fn is_youtube_host(host: &str) -> bool {
    let host = host.trim_end_matches('.').to_ascii_lowercase();
    YOUTUBE_DOMAINS.iter().any(|domain| {
        host == *domain || host.strip_suffix(domain).is_some_and(|prefix| prefix.ends_with('.'))
    })
}

/// Extract the video id from a YouTube link.
///
/// Recognizes `?v=<id>`, `youtu.be/<id>`, `/embed/<id>` and `/shorts/<id>`.
pub fn youtube_video_id(url: &Url) -> Option<String> {
    if let Some((_, id)) = url.query_pairs().find(|(key, value)| key == "v" && !value.is_empty()) {
        return Some(id.into_owned());
    }

    let segments: Vec<&str> = url.path_segments()?.filter(|s| !s.is_empty()).collect();
    let short_link = url.host_str().is_some_and(|h| h.trim_end_matches('.').ends_with("youtu.be"));

    match segments.as_slice() {
        [id, ..] if short_link => Some((*id).to_string()),
        ["embed" | "shorts", id, ..] => Some((*id).to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use studyroom_proto::{InboundEvent, ParticipantsUpdate, RoomId};

    use super::*;

    fn session() -> RoomSession {
        RoomSession::join(RoomId::new("room1").unwrap(), "Alice")
    }

    fn pdf_file(name: &str, mime_type: &str, bytes: &[u8]) -> LocalFile {
        LocalFile { name: name.into(), mime_type: mime_type.into(), bytes: bytes.to_vec() }
    }

    #[test]
    fn blank_messages_rejected() {
        let dispatcher = Dispatcher::<Instant>::new();
        for text in ["", "   ", "\n\t"] {
            assert_eq!(
                dispatcher.send_message(&session(), text),
                Err(ValidationError::EmptyMessage)
            );
        }
    }

    #[test]
    fn message_text_is_sent_as_typed() {
        let dispatcher = Dispatcher::<Instant>::new();
        let event = dispatcher.send_message(&session(), "  hi there ").unwrap();
        let OutboundEvent::Message(payload) = event else { panic!("expected message") };
        assert_eq!(payload.message, "  hi there ");
        assert_eq!(payload.sender, "Alice");
    }

    #[test]
    fn youtube_links_classified() {
        let cases = [
            ("https://youtu.be/abc123", "YouTube video abc123"),
            ("https://www.youtube.com/watch?v=dQw4w9WgXcQ&t=10", "YouTube video dQw4w9WgXcQ"),
            ("https://m.youtube.com/embed/xyz", "YouTube video xyz"),
            ("https://youtube.com/shorts/s1", "YouTube video s1"),
            ("https://www.youtube-nocookie.com/embed/n0", "YouTube video n0"),
        ];
        for (url, name) in cases {
            let resource = classify_url(url).unwrap();
            assert_eq!(resource.kind, ResourceKind::Youtube, "{url}");
            assert_eq!(resource.name, name, "{url}");
            assert_eq!(resource.url, url);
        }
    }

    #[test]
    fn youtube_without_id_falls_back_to_url() {
        let resource = classify_url("https://www.youtube.com/feed/library").unwrap();
        assert_eq!(resource.kind, ResourceKind::Youtube);
        assert_eq!(resource.name, "https://www.youtube.com/feed/library");
    }

    #[test]
    fn lookalike_hosts_are_not_youtube() {
        assert!(!is_youtube_host("notyoutube.com"));
        assert!(!is_youtube_host("youtube.com.evil.org"));
        assert!(is_youtube_host("WWW.YouTube.com"));
        assert!(is_youtube_host("youtu.be."));
    }

    #[test]
    fn other_links_are_pdfs() {
        let resource = classify_url("https://example.org/papers/attention.pdf").unwrap();
        assert_eq!(resource.kind, ResourceKind::Pdf);
        assert_eq!(resource.name, "attention.pdf");

        let resource = classify_url("https://example.org/notes/").unwrap();
        assert_eq!(resource.name, "notes");

        let resource = classify_url("https://example.org").unwrap();
        assert_eq!(resource.name, DEFAULT_PDF_NAME);
    }

    #[test]
    fn malformed_links_rejected() {
        for url in ["not-a-url", "ftp://example.org/a.pdf", "mailto:a@b.c", "https://"] {
            assert!(
                matches!(classify_url(url), Err(ValidationError::InvalidUrl { .. })),
                "{url}"
            );
        }
    }

    #[test]
    fn file_validation() {
        assert!(validate_pdf_file(&pdf_file("a.pdf", PDF_MIME, b"%PDF")).is_ok());
        assert!(matches!(
            validate_pdf_file(&pdf_file("a.png", "image/png", b"png")),
            Err(ValidationError::NotPdf { .. })
        ));
        assert!(matches!(
            validate_pdf_file(&pdf_file("a.pdf", PDF_MIME, b"")),
            Err(ValidationError::EmptyFile { .. })
        ));
    }

    #[test]
    fn non_pdf_never_uploads() {
        let mut dispatcher = Dispatcher::new();
        let file = pdf_file("photo.jpg", "image/jpeg", b"jpeg");
        let result = dispatcher.add_resource(&session(), ResourceInput::File(file), Instant::now());
        assert!(result.is_err());
        assert_eq!(dispatcher.pending_uploads(), 0);
    }

    #[test]
    fn upload_success_shares_server_path() {
        let mut dispatcher = Dispatcher::new();
        let file = pdf_file("notes.pdf", PDF_MIME, b"%PDF");
        let Dispatch::Upload { request_id, .. } =
            dispatcher.add_resource(&session(), ResourceInput::File(file), Instant::now()).unwrap()
        else {
            panic!("expected upload");
        };

        let event = dispatcher
            .finish_upload(&session(), request_id, Ok("uploads/notes.pdf".into()))
            .unwrap();
        let Some(OutboundEvent::ResourceAdded(payload)) = event else { panic!("expected add") };
        assert_eq!(
            payload.resource,
            Resource::new("notes.pdf", "uploads/notes.pdf", ResourceKind::Pdf)
        );
        assert_eq!(dispatcher.pending_uploads(), 0);
    }

    #[test]
    fn upload_failure_adds_nothing() {
        let mut dispatcher = Dispatcher::new();
        let file = pdf_file("notes.pdf", PDF_MIME, b"%PDF");
        let Ok(Dispatch::Upload { request_id, .. }) =
            dispatcher.add_resource(&session(), ResourceInput::File(file), Instant::now())
        else {
            panic!("expected upload");
        };

        let result = dispatcher.finish_upload(&session(), request_id, Err("disk full".into()));
        assert_eq!(
            result,
            Err(ClientError::UploadFailed { name: "notes.pdf".into(), reason: "disk full".into() })
        );

        // late duplicate completion is ignored
        let again = dispatcher.finish_upload(&session(), request_id, Ok("x.pdf".into()));
        assert_eq!(again, Ok(None));
    }

    #[test]
    fn stale_uploads_expire() {
        let mut dispatcher = Dispatcher::new();
        let start = Instant::now();
        let file = pdf_file("slow.pdf", PDF_MIME, b"%PDF");
        dispatcher.add_resource(&session(), ResourceInput::File(file), start).unwrap();

        assert!(dispatcher.expire_uploads(start + Duration::from_secs(60)).is_empty());
        let notices = dispatcher.expire_uploads(start + UPLOAD_TIMEOUT + Duration::from_secs(1));
        assert_eq!(notices, vec![Notice::UploadExpired { name: "slow.pdf".into() }]);
        assert_eq!(dispatcher.pending_uploads(), 0);
    }

    #[test]
    fn lagging_clock_does_not_expire_uploads() {
        let mut dispatcher = Dispatcher::<Duration>::new();
        let start = Duration::from_secs(10);
        let file = pdf_file("slow.pdf", PDF_MIME, b"%PDF");
        dispatcher.add_resource(&session(), ResourceInput::File(file), start).unwrap();

        assert!(dispatcher.expire_uploads(Duration::from_secs(3)).is_empty());
        assert_eq!(dispatcher.pending_uploads(), 1);

        let notices = dispatcher.expire_uploads(start + UPLOAD_TIMEOUT + Duration::from_secs(1));
        assert_eq!(notices.len(), 1);
    }

    #[test]
    fn mute_is_a_local_overlay() {
        let mut dispatcher = Dispatcher::<Instant>::new();
        let mut state = RoomState::new();
        let bob = ParticipantId::new("bob").unwrap();
        state.apply(&InboundEvent::ParticipantsUpdated(ParticipantsUpdate {
            participants: vec![Participant::new(bob.clone(), "Bob")],
        }));

        assert_eq!(dispatcher.toggle_mute(&state, &bob), Ok(true));
        assert!(dispatcher.participants(&state)[0].is_muted);
        assert!(!state.participants()[0].is_muted);

        assert_eq!(dispatcher.toggle_mute(&state, &bob), Ok(false));

        let ghost = ParticipantId::new("ghost").unwrap();
        assert_eq!(
            dispatcher.toggle_mute(&state, &ghost),
            Err(ClientError::UnknownParticipant(ghost))
        );
    }

    #[test]
    fn overlay_dropped_when_participant_leaves() {
        let mut dispatcher = Dispatcher::<Instant>::new();
        let mut state = RoomState::new();
        let bob = ParticipantId::new("bob").unwrap();
        let roster = |participants| {
            InboundEvent::ParticipantsUpdated(ParticipantsUpdate { participants })
        };

        state.apply(&roster(vec![Participant::new(bob.clone(), "Bob")]));
        dispatcher.toggle_mute(&state, &bob).unwrap();

        state.apply(&roster(vec![]));
        dispatcher.retain_mutes(&state);
        state.apply(&roster(vec![Participant::new(bob, "Bob")]));
        assert!(!dispatcher.participants(&state)[0].is_muted);
    }
}
