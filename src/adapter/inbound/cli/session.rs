//! Commands accepted on stdin by `kpool run`.

use std::fmt;

/// One line of the interactive session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCommand {
    List,
    Create {
        name: Option<String>,
        workers: Option<u32>,
        registry: bool,
    },
    Destroy(String),
    Activate(String),
    Recycle,
    Registry,
    Help,
    Quit,
}

/// Parse error for session lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionParseError {
    UnknownCommand(String),
    MissingArgument(&'static str),
    UnexpectedArgument(String),
    InvalidNumber(String),
}

impl fmt::Display for SessionParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownCommand(cmd) => write!(f, "unknown command `{cmd}`"),
            Self::MissingArgument(name) => write!(f, "missing argument `{name}`"),
            Self::UnexpectedArgument(arg) => write!(f, "unexpected argument `{arg}`"),
            Self::InvalidNumber(value) => write!(f, "invalid number `{value}`"),
        }
    }
}

impl std::error::Error for SessionParseError {}

/// Help text listing every session command.
#[must_use]
pub fn session_help() -> &'static str {
    "list                                     show clusters\n\
     create [NAME] [--workers N] [--no-registry]  create and activate a cluster\n\
     destroy NAME                             destroy a cluster\n\
     activate NAME                            make a standby cluster active\n\
     recycle                                  swap in a standby, rebuild the active one\n\
     registry                                 show the shared registry\n\
     help                                     show this help\n\
     quit                                     shut down"
}

/// Parse a session line. Blank lines yield `Ok(None)`.
pub fn parse_line(line: &str) -> Result<Option<SessionCommand>, SessionParseError> {
    let mut parts = line.split_whitespace();
    let Some(command) = parts.next() else {
        return Ok(None);
    };

    let command = match command.to_ascii_lowercase().as_str() {
        "list" | "ls" => SessionCommand::List,
        "create" | "new" => parse_create(&mut parts)?,
        "destroy" | "rm" => SessionCommand::Destroy(required(&mut parts, "name")?),
        "activate" | "use" => SessionCommand::Activate(required(&mut parts, "name")?),
        "recycle" => SessionCommand::Recycle,
        "registry" => SessionCommand::Registry,
        "help" | "?" => SessionCommand::Help,
        "quit" | "exit" => SessionCommand::Quit,
        other => return Err(SessionParseError::UnknownCommand(other.to_string())),
    };

    if let Some(extra) = parts.next() {
        return Err(SessionParseError::UnexpectedArgument(extra.to_string()));
    }
    Ok(Some(command))
}

fn required<'a>(
    parts: &mut impl Iterator<Item = &'a str>,
    name: &'static str,
) -> Result<String, SessionParseError> {
    parts
        .next()
        .map(ToOwned::to_owned)
        .ok_or(SessionParseError::MissingArgument(name))
}

fn parse_create<'a>(
    parts: &mut impl Iterator<Item = &'a str>,
) -> Result<SessionCommand, SessionParseError> {
    let mut name = None;
    let mut workers = None;
    let mut registry = true;

    while let Some(part) = parts.next() {
        match part {
            "--no-registry" => registry = false,
            "--workers" | "-w" => {
                let value = parts
                    .next()
                    .ok_or(SessionParseError::MissingArgument("workers"))?;
                workers = Some(
                    value
                        .parse()
                        .map_err(|_| SessionParseError::InvalidNumber(value.to_string()))?,
                );
            }
            flag if flag.starts_with('-') => {
                return Err(SessionParseError::UnexpectedArgument(flag.to_string()));
            }
            value if name.is_none() => name = Some(value.to_string()),
            value => return Err(SessionParseError::UnexpectedArgument(value.to_string())),
        }
    }

    Ok(SessionCommand::Create {
        name,
        workers,
        registry,
    })
}
