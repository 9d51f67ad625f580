// src/commands.rs
//
// The closed command vocabulary. Chat votes only ever carry a `Movement`;
// `pause` / `resume` arrive through the direct-command path and never enter
// the vote pool.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::Error;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, Eq, PartialEq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Movement {
    Sit,
    Stand,
    Forward,
    Backward,
    StrafeLeft,
    StrafeRight,
    TurnLeft,
    TurnRight,
}

impl Movement {
    pub const ALL: [Movement; 8] = [
        Movement::Sit,
        Movement::Stand,
        Movement::Forward,
        Movement::Backward,
        Movement::StrafeLeft,
        Movement::StrafeRight,
        Movement::TurnLeft,
        Movement::TurnRight,
    ];

    /// The chat verb for this movement. Also the total order used to break
    /// tally ties, so it must stay stable.
    pub fn as_str(&self) -> &'static str {
        match self {
            Movement::Sit => "sit",
            Movement::Stand => "stand",
            Movement::Forward => "forward",
            Movement::Backward => "backward",
            Movement::StrafeLeft => "strafe_left",
            Movement::StrafeRight => "strafe_right",
            Movement::TurnLeft => "turn_left",
            Movement::TurnRight => "turn_right",
        }
    }
}

impl fmt::Display for Movement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Movement {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sit" => Ok(Movement::Sit),
            "stand" => Ok(Movement::Stand),
            "forward" => Ok(Movement::Forward),
            "backward" => Ok(Movement::Backward),
            "strafe_left" => Ok(Movement::StrafeLeft),
            "strafe_right" => Ok(Movement::StrafeRight),
            "turn_left" => Ok(Movement::TurnLeft),
            "turn_right" => Ok(Movement::TurnRight),
            _ => Err(Error::UnknownCommand(s.to_string())),
        }
    }
}

/// A direct command: either a movement verb or one of the two gate verbs.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Command {
    Move(Movement),
    Pause,
    Resume,
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Move(m) => write!(f, "{}", m),
            Command::Pause => write!(f, "pause"),
            Command::Resume => write!(f, "resume"),
        }
    }
}

impl FromStr for Command {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pause" => Ok(Command::Pause),
            "resume" => Ok(Command::Resume),
            other => other.parse::<Movement>().map(Command::Move),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_verb_round_trips() {
        for m in Movement::ALL {
            assert_eq!(m.as_str().parse::<Movement>().unwrap(), m);
        }
    }

    #[test]
    fn unknown_text_is_rejected() {
        assert!("dance".parse::<Movement>().is_err());
        assert!("".parse::<Command>().is_err());
    }

    #[test]
    fn gate_verbs_are_not_movements() {
        assert!("pause".parse::<Movement>().is_err());
        assert_eq!("pause".parse::<Command>().unwrap(), Command::Pause);
        assert_eq!("resume".parse::<Command>().unwrap(), Command::Resume);
    }
}
