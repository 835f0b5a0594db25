//! Study room terminal client entry point.

use std::{fs::OpenOptions, path::PathBuf, sync::Mutex};

use clap::Parser;
use studyroom_app::Runtime;
use studyroom_client::{ClientConfig, RoomChoice, SystemEnv, backend::Backend};
use studyroom_proto::{ParticipantId, ProtocolError, RoomId, invite};
use studyroom_tui::TerminalDriver;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};
use url::Url;

/// Study room terminal client
#[derive(Parser, Debug)]
#[command(name = "studyroom")]
#[command(about = "Share resources, chat and study together from the terminal")]
#[command(version)]
struct Args {
    /// Real-time server WebSocket URL
    #[arg(long, env = "STUDYROOM_SERVER", default_value = "ws://localhost:3001/ws")]
    server: Url,

    /// HTTP backend base URL for uploads and the assistant
    #[arg(long, env = "STUDYROOM_API", default_value = "http://localhost:8000")]
    api: Url,

    /// Display name shown to the room
    #[arg(short, long, env = "STUDYROOM_NAME", default_value = "Student")]
    name: String,

    /// Join an existing room by id
    ///
    /// Without `--room` or `--invite` a new room is created and hosted.
    #[arg(long, env = "STUDYROOM_ROOM", value_parser = invite::parse_invite)]
    room: Option<RoomId>,

    /// Join through an invitation link
    #[arg(
        long,
        env = "STUDYROOM_INVITE",
        conflicts_with = "room",
        value_parser = invite::parse_invite
    )]
    invite: Option<RoomId>,

    /// Fixed participant id instead of the connection id
    #[arg(long, env = "STUDYROOM_PARTICIPANT_ID", value_parser = parse_participant_id)]
    participant_id: Option<ParticipantId>,

    /// Public base URL that invitation links point to
    #[arg(long, env = "STUDYROOM_SHARE_BASE", default_value = "http://localhost:3000")]
    share_base: Url,

    /// Log file; the terminal itself is taken by the UI
    #[arg(long, env = "STUDYROOM_LOG_FILE", default_value = "studyroom.log")]
    log_file: PathBuf,

    /// Log filter, in `RUST_LOG` syntax. `RUST_LOG` wins when set
    #[arg(long, env = "STUDYROOM_LOG_LEVEL", default_value = "info")]
    log_level: String,
}

fn parse_participant_id(id: &str) -> Result<ParticipantId, ProtocolError> {
    ParticipantId::new(id)
}

impl Args {
    fn client_config(&self) -> ClientConfig {
        let room = match self.room.as_ref().or(self.invite.as_ref()) {
            Some(room_id) => RoomChoice::Join(room_id.clone()),
            None => RoomChoice::Host,
        };

        ClientConfig {
            server_url: self.server.clone(),
            display_name: self.name.clone(),
            room,
            participant_id: self.participant_id.clone(),
        }
    }
}

fn init_logging(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let file = OpenOptions::new().create(true).append(true).open(&args.log_file)?;
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&args.log_level)?,
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(Mutex::new(file)).with_ansi(false))
        .with(filter)
        .try_init()?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    init_logging(&args)?;

    let config = args.client_config();
    tracing::info!(
        server = %config.server_url,
        api = %args.api,
        name = %config.display_name,
        "starting"
    );

    let backend = Backend::new(args.api.clone())?;
    let driver = TerminalDriver::new(backend)?;
    let runtime = Runtime::new(driver, SystemEnv::new(), config, &args.share_base)?;

    Ok(runtime.run().await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_room_hosts() {
        let args = Args::try_parse_from(["studyroom", "--name", "Alice"]).unwrap();

        let config = args.client_config();
        assert_eq!(config.room, RoomChoice::Host);
        assert_eq!(config.display_name, "Alice");
    }

    #[test]
    fn invite_link_joins_its_room() {
        let args = Args::try_parse_from([
            "studyroom",
            "--invite",
            "https://studyroom.example/join/lq3x9k2mab12cd34",
        ])
        .unwrap();

        let expected = RoomId::new("lq3x9k2mab12cd34").unwrap();
        assert_eq!(args.client_config().room, RoomChoice::Join(expected));
    }

    #[test]
    fn room_and_invite_conflict() {
        let result = Args::try_parse_from([
            "studyroom",
            "--room",
            "abc",
            "--invite",
            "https://studyroom.example/join/def",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn blank_participant_id_is_rejected() {
        assert!(Args::try_parse_from(["studyroom", "--participant-id", " "]).is_err());
    }
}
