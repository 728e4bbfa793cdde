//! Console input.
//!
//! Each line typed on stdin maps to one [`Command`].

use ping_shared::game::InputHandle;

pub const HELP: &[&str] = &[
    "<Enter> | go   start the speed test",
    "r | again      play another round",
    "reset          clear the local ranking",
    "help           show this list",
    "q | quit       exit",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Activate,
    Replay,
    ClearRanking,
    Help,
    Quit,
}

/// Parses one console line. Unknown input yields `None`.
pub fn parse_command(line: &str) -> Option<Command> {
    match line.trim().to_ascii_lowercase().as_str() {
        "" | "go" | "start" => Some(Command::Activate),
        "r" | "again" | "replay" => Some(Command::Replay),
        "reset" => Some(Command::ClearRanking),
        "help" | "?" => Some(Command::Help),
        "q" | "quit" | "exit" => Some(Command::Quit),
        _ => None,
    }
}

impl Command {
    /// Forwards the command to the controller. Returns `false` if the
    /// controller is gone or the command ends the session.
    pub fn dispatch(self, input: &InputHandle) -> bool {
        match self {
            Command::Activate => input.activate(),
            Command::Replay => input.replay(),
            Command::ClearRanking => input.clear_ranking(),
            Command::Help => true,
            Command::Quit => {
                input.shutdown();
                false
            }
        }
    }
}
