//! Invitation links.
//!
//! A room is shared as `<base>/join/<roomId>`. Opening that link redirects to
//! the room view with the id carried as a query parameter
//! (`/study-room?roomId=<roomId>`). Both shapes, and a bare room id, are
//! accepted by [`parse_invite`].

use url::Url;

use crate::{
    errors::{ProtocolError, Result},
    types::RoomId,
};

/// Path segment that precedes the room id in an invitation link.
pub const JOIN_SEGMENT: &str = "join";

/// Path of the room view an invitation redirects to.
pub const ROOM_VIEW_PATH: &str = "/study-room";

/// Query parameter carrying the room id on the room view.
pub const ROOM_ID_PARAM: &str = "roomId";

/// Base used to resolve path-only invitations.
const RELATIVE_BASE: &str = "http://localhost/";

/// Invitation path for a room: `/join/<roomId>`.
pub fn invite_path(room_id: &RoomId) -> String {
    format!("/{JOIN_SEGMENT}/{room_id}")
}

/// Redirect target for an invitation: `/study-room?roomId=<roomId>`.
pub fn room_view_path(room_id: &RoomId) -> String {
    format!("{ROOM_VIEW_PATH}?{ROOM_ID_PARAM}={room_id}")
}

/// Absolute share link for a room under the given public base URL.
///
/// Any path on `base` is kept, so `https://host/app` yields
/// `https://host/app/join/<roomId>`.
pub fn share_link(base: &Url, room_id: &RoomId) -> Result<Url> {
    let mut link = base.clone();
    link.set_query(None);
    link.set_fragment(None);
    link.path_segments_mut()
        .map_err(|()| ProtocolError::InvalidInvite(format!("{base} cannot be a base URL")))?
        .pop_if_empty()
        .push(JOIN_SEGMENT)
        .push(room_id.as_str());
    Ok(link)
}

/// Extract the room id from an invitation.
///
/// Accepts an absolute share link, a `/join/<roomId>` path, a
/// `/study-room?roomId=<roomId>` redirect target, or a bare room id.
pub fn parse_invite(input: &str) -> Result<RoomId> {
    let input = input.trim();
    if input.is_empty() {
        return Err(ProtocolError::InvalidInvite("empty".into()));
    }

    let url = if input.starts_with("http://") || input.starts_with("https://") {
        Url::parse(input).map_err(|e| ProtocolError::InvalidInvite(e.to_string()))?
    } else if input.starts_with('/') {
        Url::parse(RELATIVE_BASE)
            .and_then(|base| base.join(input))
            .map_err(|e| ProtocolError::InvalidInvite(e.to_string()))?
    } else {
        return RoomId::new(input);
    };

    room_id_from_url(&url)
}

fn room_id_from_url(url: &Url) -> Result<RoomId> {
    if let Some((_, id)) = url.query_pairs().find(|(key, _)| key == ROOM_ID_PARAM) {
        return RoomId::new(id.into_owned());
    }

    let segments: Vec<&str> =
        url.path_segments().map(|s| s.filter(|seg| !seg.is_empty()).collect()).unwrap_or_default();

    segments
        .windows(2)
        .rev()
        .find(|pair| pair[0] == JOIN_SEGMENT)
        .map_or_else(
            || Err(ProtocolError::InvalidInvite(format!("no room id in {url}"))),
            |pair| RoomId::new(pair[1]),
        )
}
