use std::fmt;

use thiserror::Error;

/// Name the command is registered under.
pub const COMMAND_NAME: &str = "bodytype";

pub const USAGE: &str = "Use: /bodytype on|off|toggle|status|apply";

/// Mode argument of the `/bodytype <mode>` variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    On,
    Off,
    Toggle,
    Status,
    Apply,
}

impl Mode {
    pub fn as_str(self) -> &'static str {
        match self {
            Mode::On => "on",
            Mode::Off => "off",
            Mode::Toggle => "toggle",
            Mode::Status => "status",
            Mode::Apply => "apply",
        }
    }

    /// Whether running this mode pushes the visual change onto the entity.
    pub fn applies_override(self) -> bool {
        !matches!(self, Mode::Status)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parsed form of a `/bodytype` invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyTypeCommand {
    /// Bare `/bodytype`: open the toggle page.
    OpenPage,
    Mode(Mode),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandParseError {
    #[error("empty command")]
    Empty,
    #[error("unknown command: {0}")]
    UnknownCommand(String),
    #[error("unknown mode '{0}'. {}", USAGE)]
    UnknownMode(String),
    #[error("unexpected argument '{0}'. {}", USAGE)]
    UnexpectedArgument(String),
}

/// Parse a chat line such as `/bodytype toggle`.
///
/// The leading slash is optional and the verb and mode are matched
/// case-insensitively.
pub fn parse_bodytype_command(input: &str) -> Result<BodyTypeCommand, CommandParseError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(CommandParseError::Empty);
    }

    let mut parts = trimmed.split_whitespace();
    let verb = parts
        .next()
        .map(|v| v.trim_start_matches('/').to_ascii_lowercase())
        .ok_or(CommandParseError::Empty)?;

    if verb != COMMAND_NAME {
        return Err(CommandParseError::UnknownCommand(verb));
    }

    let command = match parts.next() {
        None => BodyTypeCommand::OpenPage,
        Some(token) => BodyTypeCommand::Mode(parse_mode(Some(token))?),
    };

    if let Some(extra) = parts.next() {
        return Err(CommandParseError::UnexpectedArgument(extra.to_string()));
    }

    Ok(command)
}

/// Parse the mode argument. A missing mode reads as [`Mode::Status`].
pub fn parse_mode(token: Option<&str>) -> Result<Mode, CommandParseError> {
    let Some(token) = token else {
        return Ok(Mode::Status);
    };
    match token.to_ascii_lowercase().as_str() {
        "on" => Ok(Mode::On),
        "off" => Ok(Mode::Off),
        "toggle" => Ok(Mode::Toggle),
        "status" => Ok(Mode::Status),
        "apply" => Ok(Mode::Apply),
        other => Err(CommandParseError::UnknownMode(other.to_string())),
    }
}
