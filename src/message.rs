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

use std::{borrow::Cow, str::FromStr};

use chrono::NaiveDateTime;

use crate::{daemon::Daemon, tournament::RoundLength};

pub const COMMANDS: [&str; 10] = [
    "end",
    "list_commands",
    "name",
    "new",
    "quit",
    "round",
    "save",
    "start",
    "status",
    "winner",
];

const START_FORMAT: &str = "%Y-%m-%dT%H:%M";

/// One line of the text protocol.
///
/// ```sh
/// <- new 2024-06-01T18:00 3 32 Summer Cup
/// -> =
/// <- round
/// -> = Prepping for the Summer Cup Tournament
/// ```
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Message {
    Empty,
    End,
    ListCommands,
    Name,
    New {
        start: NaiveDateTime,
        round_length: RoundLength,
        max_players: u32,
        name: String,
    },
    Quit,
    Round,
    Save,
    Start,
    Status,
    Winner(String),
}

impl FromStr for Message {
    type Err = anyhow::Error;

    fn from_str(message: &str) -> anyhow::Result<Self> {
        let mut message = Cow::from(message);
        if let Some(comment_offset) = message.find('#') {
            message.to_mut().replace_range(comment_offset.., "");
        }

        let words: Vec<&str> = message.split_ascii_whitespace().collect();
        let Some((command, args)) = words.split_first() else {
            return Ok(Self::Empty);
        };

        match *command {
            "end" => Ok(Self::End),
            "list_commands" => Ok(Self::ListCommands),
            "name" => Ok(Self::Name),
            "new" => {
                let err_msg = "expected: 'new YYYY-MM-DDTHH:MM ROUND_DAYS MAX_PLAYERS NAME'";

                let [start, round_length, max_players, name @ ..] = args else {
                    return Err(anyhow::Error::msg(err_msg));
                };

                if name.is_empty() {
                    return Err(anyhow::Error::msg(err_msg));
                }

                let start = NaiveDateTime::parse_from_str(start, START_FORMAT)
                    .map_err(|error| anyhow::Error::msg(format!("new: start '{start}': {error}")))?;
                let max_players = max_players.parse::<u32>().map_err(|error| {
                    anyhow::Error::msg(format!("new: max players '{max_players}': {error}"))
                })?;

                Ok(Self::New {
                    start,
                    round_length: round_length.parse()?,
                    max_players,
                    name: name.join(" "),
                })
            }
            "quit" => Ok(Self::Quit),
            "round" => Ok(Self::Round),
            "save" => Ok(Self::Save),
            "start" => Ok(Self::Start),
            "status" => Ok(Self::Status),
            "winner" => Ok(Self::Winner(args.join(" "))),
            command => Err(anyhow::Error::msg(format!("unknown command: {command}"))),
        }
    }
}

/// Runs one message against the daemon. `Ok(None)` means there is nothing
/// to print.
///
/// # Errors
///
/// If the daemon refuses the request.
pub fn update(daemon: &Daemon, message: Message) -> anyhow::Result<Option<String>> {
    match message {
        Message::Empty | Message::Quit => Ok(None),
        Message::End => {
            daemon.end()?;
            Ok(Some(String::new()))
        }
        Message::ListCommands => Ok(Some(COMMANDS.join(" "))),
        Message::Name => Ok(Some(daemon.name()?.unwrap_or_else(|| "_".to_string()))),
        Message::New {
            start,
            round_length,
            max_players,
            name,
        } => {
            let start = daemon.local_datetime(&start)?;
            daemon.initialize(&name, start, round_length.days(), max_players)?;
            Ok(Some(String::new()))
        }
        Message::Round => Ok(Some(daemon.round_label()?)),
        Message::Save => {
            daemon.save()?;
            Ok(Some(String::new()))
        }
        Message::Start => Ok(Some(daemon.start_tournament()?.to_string())),
        Message::Status => Ok(Some(ron::ser::to_string(&daemon.status()?)?)),
        Message::Winner(winner) => {
            daemon.set_winner(&winner)?;
            Ok(Some(String::new()))
        }
    }
}

/// Parses and runs one line, the way the binary drives the daemon.
///
/// # Errors
///
/// If the line is not a valid message or the daemon refuses it.
pub fn read_line(daemon: &Daemon, buffer: &str) -> anyhow::Result<Option<String>> {
    update(daemon, Message::from_str(buffer)?)
}
