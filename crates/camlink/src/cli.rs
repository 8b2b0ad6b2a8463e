//! Command-line parsing.

use std::path::PathBuf;

pub const USAGE: &str = "\
usage: camlink sender [FILE]
       camlink receiver [DIR]
       camlink --version

FILE defaults to CAMLINK_INPUT_FILE, DIR to CAMLINK_OUTPUT_DIR or the
current directory. Screens and cameras are emulated through the spool
directory (CAMLINK_SPOOL_DIR).";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Sender,
    Receiver,
}

impl Role {
    /// Subdirectory of the spool this role displays into.
    pub fn screen_name(self) -> &'static str {
        match self {
            Self::Sender => "sender",
            Self::Receiver => "receiver",
        }
    }

    pub fn peer(self) -> Self {
        match self {
            Self::Sender => Self::Receiver,
            Self::Receiver => Self::Sender,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Run { role: Role, path: Option<PathBuf> },
    Version,
    Help,
}

#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct UsageError(String);

/// Parse arguments (program name already stripped). Arguments after the
/// optional path are ignored.
pub fn parse<I>(args: I) -> Result<Command, UsageError>
where
    I: IntoIterator<Item = String>,
{
    let mut args = args.into_iter();
    let Some(first) = args.next() else {
        return Err(UsageError("missing role".into()));
    };

    let role = match first.as_str() {
        "sender" => Role::Sender,
        "receiver" => Role::Receiver,
        "--version" | "-V" => return Ok(Command::Version),
        "--help" | "-h" => return Ok(Command::Help),
        other => return Err(UsageError(format!("unknown role '{other}'"))),
    };

    Ok(Command::Run {
        role,
        path: args.next().map(PathBuf::from),
    })
}
