//! Lifecycle states and the transition table of a hosted application
//!
//! The table here is pure; the effectful side (acquiring and releasing
//! resources, notifying the host) lives in [`crate::runtime`].

use serde::{Deserialize, Serialize};

use crate::error::HostingError;

/// Lifecycle state of a hosted application as reported to the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum State {
    /// Initial state, no work in progress
    #[default]
    #[serde(rename = "IDLE")]
    Idle,
    /// Working on data supplied by the host
    #[serde(rename = "INPROGRESS")]
    InProgress,
    /// Work paused, reclaimable resources released
    #[serde(rename = "SUSPENDED")]
    Suspended,
    /// Terminal state
    #[serde(rename = "EXIT")]
    Exit,
}

/// Lifecycle command delivered asynchronously by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Command {
    Start,
    Resume,
    Suspend,
    Cancel,
    Exit,
}

/// What the state machine currently holds on behalf of the application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Resources {
    /// Nothing held
    #[default]
    Released,
    /// Working resources acquired
    Held,
    /// Reclaimable resources released, the rest kept for resume
    Suspended,
}

impl State {
    pub const ALL: [State; 4] = [State::Idle, State::InProgress, State::Suspended, State::Exit];

    /// Apply a command, returning the next state or `None` when the command
    /// is not defined in this state.
    pub fn on(self, command: Command) -> Option<State> {
        match (self, command) {
            (State::Exit, _) => None,
            (_, Command::Exit) => Some(State::Exit),
            (State::Idle, Command::Start) => Some(State::InProgress),
            (State::Suspended, Command::Resume) => Some(State::InProgress),
            (State::InProgress, Command::Suspend) => Some(State::Suspended),
            // cancel is unconditional outside EXIT; from IDLE it only releases
            (_, Command::Cancel) => Some(State::Idle),
            _ => None,
        }
    }

    /// Like [`State::on`] but reports undefined commands as an error
    pub fn try_on(self, command: Command) -> Result<State, HostingError> {
        self.on(command)
            .ok_or(HostingError::InvalidTransition { state: self, command })
    }

    /// Whether no transition leaves this state
    pub fn is_terminal(self) -> bool {
        matches!(self, State::Exit)
    }

    /// PS3.19 wire token for this state
    pub fn as_str(self) -> &'static str {
        match self {
            State::Idle => "IDLE",
            State::InProgress => "INPROGRESS",
            State::Suspended => "SUSPENDED",
            State::Exit => "EXIT",
        }
    }
}

impl Command {
    pub const ALL: [Command; 5] = [
        Command::Start,
        Command::Resume,
        Command::Suspend,
        Command::Cancel,
        Command::Exit,
    ];
}

impl std::fmt::Display for State {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for State {
    type Err = HostingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().replace('_', "").as_str() {
            "IDLE" => Ok(State::Idle),
            "INPROGRESS" => Ok(State::InProgress),
            "SUSPENDED" => Ok(State::Suspended),
            "EXIT" => Ok(State::Exit),
            _ => Err(HostingError::config(format!("Invalid state: {}", s))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lifecycle_table() {
        assert_eq!(State::Idle.on(Command::Start), Some(State::InProgress));
        assert_eq!(State::InProgress.on(Command::Suspend), Some(State::Suspended));
        assert_eq!(State::Suspended.on(Command::Resume), Some(State::InProgress));
        assert_eq!(State::InProgress.on(Command::Cancel), Some(State::Idle));
        assert_eq!(State::Suspended.on(Command::Cancel), Some(State::Idle));
        assert_eq!(State::Idle.on(Command::Exit), Some(State::Exit));
    }

    #[test]
    fn test_undefined_commands() {
        assert_eq!(State::InProgress.on(Command::Resume), None);
        assert_eq!(State::InProgress.on(Command::Start), None);
        assert_eq!(State::Idle.on(Command::Suspend), None);
        assert_eq!(State::Suspended.on(Command::Start), None);
        assert!(State::Idle.try_on(Command::Resume).is_err());
    }

    #[test]
    fn test_exit_is_absorbing() {
        for command in Command::ALL {
            assert_eq!(State::Exit.on(command), None);
        }
    }

    #[test]
    fn test_cancel_from_any_live_state_reaches_idle() {
        for state in [State::Idle, State::InProgress, State::Suspended] {
            assert_eq!(state.on(Command::Cancel), Some(State::Idle));
        }
    }

    #[test]
    fn test_every_sequence_stays_in_one_state() {
        // all command sequences up to length 5, undefined commands ignored
        fn walk(state: State, depth: usize) {
            assert!(State::ALL.contains(&state));
            if depth == 0 {
                return;
            }
            for command in Command::ALL {
                let next = state.on(command).unwrap_or(state);
                if state == State::Exit {
                    assert_eq!(next, State::Exit);
                }
                walk(next, depth - 1);
            }
        }
        walk(State::Idle, 5);
    }

    #[test]
    fn test_wire_tokens() {
        assert_eq!(serde_json::to_string(&State::InProgress).unwrap(), "\"INPROGRESS\"");
        assert_eq!("in_progress".parse::<State>().unwrap(), State::InProgress);
        assert_eq!("EXIT".parse::<State>().unwrap(), State::Exit);
        assert!("RUNNING".parse::<State>().is_err());
    }
}
