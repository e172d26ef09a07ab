//! Line commands understood by the prompt.
use std::str::FromStr;

use thiserror::Error;

use wizard_core::{
    CLASSIC_MODE_ID, ClassicModeConfig, FirstPlayer, HumanOpponentKind, Intent, ModeConfig,
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    Start,
    Intent(Intent),
    Mode(ModeConfig),
    Bot(String),
    Human(HumanOpponentKind),
    Target(String),
    Matchmake,
    Reset,
    Status,
    Dismiss,
    Help,
    Quit,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("unknown command `{0}` (try `help`)")]
    Unknown(String),

    #[error("`{command}` expects {expected}")]
    MissingArgument {
        command: &'static str,
        expected: &'static str,
    },

    #[error("unknown mode `{0}`; available: classic")]
    UnknownMode(String),

    #[error("invalid turn limit `{0}`")]
    InvalidTurnLimit(String),

    #[error("unknown human opponent kind `{0}`; use local, invite, or matchmaking")]
    UnknownHumanKind(String),
}

pub const HELP: &str = "\
commands:
  start                          open the wizard
  continue | back | launch       move through the wizard
  cancel                         close the wizard
  mode classic [secs]            pick the classic mode, optional turn limit
  bot <difficulty>               play against a bot
  human local|invite|matchmaking play against a human
  target <player>                player to invite
  matchmake                      request matchmaking
  reset                          reset the session
  status                         show wizard state
  dismiss                        dismiss the current error
  quit                           exit";

impl FromStr for Command {
    type Err = ParseError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let Some(head) = words.next() else {
            return Ok(Command::Help);
        };

        let command = match head.to_ascii_lowercase().as_str() {
            "start" => Command::Start,
            "continue" | "next" => Command::Intent(Intent::Continue),
            "back" => Command::Intent(Intent::Back),
            "launch" => Command::Intent(Intent::Start),
            "cancel" => Command::Intent(Intent::Cancel),
            "mode" => parse_mode(words.next(), words.next())?,
            "bot" => Command::Bot(required(words.next(), "bot", "a difficulty id")?),
            "human" => Command::Human(parse_human_kind(words.next())?),
            "target" => Command::Target(required(words.next(), "target", "a player id")?),
            "matchmake" => Command::Matchmake,
            "reset" => Command::Reset,
            "status" => Command::Status,
            "dismiss" => Command::Dismiss,
            "help" | "?" => Command::Help,
            "quit" | "exit" => Command::Quit,
            other => return Err(ParseError::Unknown(other.to_owned())),
        };
        Ok(command)
    }
}

fn required(
    word: Option<&str>,
    command: &'static str,
    expected: &'static str,
) -> Result<String, ParseError> {
    word.map(str::to_owned)
        .ok_or(ParseError::MissingArgument { command, expected })
}

fn parse_mode(mode: Option<&str>, limit: Option<&str>) -> Result<Command, ParseError> {
    let mode = mode.ok_or(ParseError::MissingArgument {
        command: "mode",
        expected: "a mode id",
    })?;
    if !mode.eq_ignore_ascii_case(CLASSIC_MODE_ID) {
        return Err(ParseError::UnknownMode(mode.to_owned()));
    }

    let turn_time_limit_secs = limit
        .map(|limit| {
            limit
                .parse::<u32>()
                .map_err(|_| ParseError::InvalidTurnLimit(limit.to_owned()))
        })
        .transpose()?;

    Ok(Command::Mode(ModeConfig::Classic(ClassicModeConfig::new(
        turn_time_limit_secs,
        FirstPlayer::Host,
    ))))
}

fn parse_human_kind(kind: Option<&str>) -> Result<HumanOpponentKind, ParseError> {
    match kind.map(str::to_ascii_lowercase).as_deref() {
        Some("local") => Ok(HumanOpponentKind::Local),
        Some("invite") => Ok(HumanOpponentKind::DirectInvite),
        Some("matchmaking") => Ok(HumanOpponentKind::Matchmaking),
        Some(other) => Err(ParseError::UnknownHumanKind(other.to_owned())),
        None => Err(ParseError::MissingArgument {
            command: "human",
            expected: "local, invite, or matchmaking",
        }),
    }
}
