// This file is part of tournament-daemon.
//
// tournament-daemon is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// tournament-daemon is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

use std::{
    fmt,
    sync::mpsc::{self, Receiver, Sender},
};

use chrono::{DateTime, FixedOffset};

use crate::{
    error::DaemonError,
    tournament::{RoundLength, Tournament},
};

pub type Reply = Result<Answer, DaemonError>;

/// Everything the worker knows how to do.
#[derive(Clone, Debug)]
pub enum Command {
    /// Read the status file into memory.
    Load,
    Initialize {
        name: String,
        start: DateTime<FixedOffset>,
        round_length: RoundLength,
        max_players: u32,
    },
    Save,
    Name,
    RoundLabel,
    Status,
    /// What the event watcher needs to decide whether to start the
    /// tournament.
    Schedule,
    SetWinner(String),
    /// `generation` is `None` when a caller asks for the start, and the
    /// generation the watcher saw otherwise, so a stale request can't start
    /// a newer tournament.
    StartTournament {
        generation: Option<u64>,
    },
    End,
    /// Stop the worker after everything queued before it.
    Shutdown,
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Load => write!(f, "load"),
            Self::Initialize {
                name,
                start,
                round_length,
                max_players,
            } => write!(
                f,
                "initialize {name} {} {round_length} {max_players}",
                start.format("%Y-%m-%dT%H:%M%:z")
            ),
            Self::Save => write!(f, "save"),
            Self::Name => write!(f, "name"),
            Self::RoundLabel => write!(f, "round_label"),
            Self::Status => write!(f, "status"),
            Self::Schedule => write!(f, "schedule"),
            Self::SetWinner(winner) => write!(f, "set_winner {winner}"),
            Self::StartTournament {
                generation: Some(generation),
            } => write!(f, "start_tournament {generation}"),
            Self::StartTournament { generation: None } => write!(f, "start_tournament"),
            Self::End => write!(f, "end"),
            Self::Shutdown => write!(f, "shutdown"),
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Answer {
    Done,
    Name(Option<String>),
    Label(String),
    Status(Option<Tournament>),
    Schedule(Option<Schedule>),
    Started(bool),
}

/// A snapshot of when the current tournament begins.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Schedule {
    /// Changes every time a tournament is created or loaded.
    pub generation: u64,
    pub start: DateTime<FixedOffset>,
    pub started: bool,
}

/// A command plus where to send its result, if anyone is waiting.
#[derive(Debug)]
pub struct Task {
    pub command: Command,
    pub reply: Option<Sender<Reply>>,
}

impl Task {
    #[must_use]
    pub fn new(command: Command) -> Self {
        Self {
            command,
            reply: None,
        }
    }

    #[must_use]
    pub fn with_reply(command: Command) -> (Self, Receiver<Reply>) {
        let (tx, rx) = mpsc::channel();

        (
            Self {
                command,
                reply: Some(tx),
            },
            rx,
        )
    }
}
