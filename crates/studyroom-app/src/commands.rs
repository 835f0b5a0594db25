//! Command parsing for the input line.
//!
//! Lines starting with `/` are commands; anything else is a chat message.
//! Positional arguments are 1-based, matching the numbering the UI shows.

use std::path::PathBuf;

/// Parsed command from user input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Send a chat message.
    Message {
        /// Text exactly as typed.
        text: String,
    },

    /// Share a YouTube video or a hosted PDF by URL.
    AddLink {
        /// URL to share.
        url: String,
    },

    /// Upload a local PDF and share it.
    Upload {
        /// Local file path.
        path: PathBuf,
    },

    /// Remove the n-th resource.
    Remove {
        /// 1-based resource position.
        index: usize,
    },

    /// Select the n-th resource for everyone's preview.
    Select {
        /// 1-based resource position.
        index: usize,
    },

    /// Toggle the local mute flag of the n-th participant.
    Mute {
        /// 1-based participant position.
        index: usize,
    },

    /// Set or clear the local study topic.
    Topic {
        /// New topic. `None` clears it.
        text: Option<String>,
    },

    /// Show the invitation link.
    Link,

    /// Ask the assistant a question about the room's resources.
    Ask {
        /// The question.
        question: String,
    },

    /// Generate a summary of the room's resources.
    Summary,

    /// Generate practice questions from the room's resources.
    Questions,

    /// Generate an audio overview of the room's resources.
    Audio,

    /// List the commands.
    Help,

    /// Rejoin the room after leaving, or reconnect after a failure.
    Join,

    /// Leave the room.
    Leave,

    /// Quit the application.
    Quit,

    /// Unknown command.
    Unknown {
        /// The original input.
        input: String,
    },

    /// Command with missing or invalid arguments.
    InvalidArgs {
        /// Command name.
        command: String,
        /// Error message.
        error: String,
    },
}

/// One-line summary of every command, for `/help`.
pub const HELP: &str = "/add <url>  /upload <path>  /remove <n>  /select <n>  /mute <n>  \
                        /topic [text]  /link  /ask <question>  /summary  /questions  /audio  \
                        /join  /leave  /quit";

/// Parse a line of user input.
///
/// Messages are returned untrimmed; whether they are blank is for the
/// client to decide.
pub fn parse(input: &str) -> Command {
    let trimmed = input.trim();
    let Some(rest) = trimmed.strip_prefix('/') else {
        return Command::Message { text: input.to_string() };
    };

    let (name, args) = match rest.split_once(char::is_whitespace) {
        Some((name, args)) => (name, args.trim()),
        None => (rest, ""),
    };

    let parsed = match name {
        "add" => required(name, args, "<url>").map(|url| Command::AddLink { url: url.into() }),
        "upload" => {
            required(name, args, "<path>").map(|path| Command::Upload { path: path.into() })
        },
        "remove" => index(name, args).map(|index| Command::Remove { index }),
        "select" => index(name, args).map(|index| Command::Select { index }),
        "mute" => index(name, args).map(|index| Command::Mute { index }),
        "topic" => {
            let text = (!args.is_empty()).then(|| args.to_string());
            Ok(Command::Topic { text })
        },
        "link" | "invite" => Ok(Command::Link),
        "ask" => {
            required(name, args, "<question>").map(|q| Command::Ask { question: q.into() })
        },
        "summary" => Ok(Command::Summary),
        "questions" => Ok(Command::Questions),
        "audio" => Ok(Command::Audio),
        "help" | "?" => Ok(Command::Help),
        "join" => Ok(Command::Join),
        "leave" => Ok(Command::Leave),
        "quit" | "q" => Ok(Command::Quit),
        _ => Ok(Command::Unknown { input: trimmed.to_string() }),
    };

    parsed.unwrap_or_else(|invalid| invalid)
}

fn required<'a>(command: &str, args: &'a str, usage: &str) -> Result<&'a str, Command> {
    if args.is_empty() {
        return Err(Command::InvalidArgs {
            command: command.into(),
            error: format!("Usage: /{command} {usage}"),
        });
    }
    Ok(args)
}

fn index(command: &str, args: &str) -> Result<usize, Command> {
    let raw = required(command, args, "<n>")?;
    match raw.parse::<usize>() {
        Ok(0) => Err(Command::InvalidArgs {
            command: command.into(),
            error: "Numbering starts at 1".into(),
        }),
        Ok(index) => Ok(index),
        Err(_) => {
            Err(Command::InvalidArgs { command: command.into(), error: "Invalid number".into() })
        },
    }
}
