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

use std::{fmt, str::FromStr};

use chrono::{DateTime, FixedOffset, TimeDelta, Utc};
use serde::Serialize;

use crate::error::DaemonError;

pub const NO_TOURNAMENT: &str = "No tournament currently running";

/// The length of one round in whole days, never zero.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct RoundLength(u32);

impl RoundLength {
    /// # Errors
    ///
    /// If `days` is zero.
    pub fn from_days(days: u32) -> Result<Self, DaemonError> {
        if days == 0 {
            Err(DaemonError::InvalidRecord(
                "a round has to last at least one day".to_string(),
            ))
        } else {
            Ok(Self(days))
        }
    }

    #[must_use]
    pub fn days(self) -> u32 {
        self.0
    }

    #[must_use]
    pub fn duration(self) -> TimeDelta {
        TimeDelta::days(i64::from(self.0))
    }
}

impl fmt::Display for RoundLength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RoundLength {
    type Err = anyhow::Error;

    fn from_str(string: &str) -> anyhow::Result<Self> {
        let days = string
            .parse::<u32>()
            .map_err(|error| anyhow::Error::msg(format!("round length '{string}': {error}")))?;

        Ok(Self::from_days(days)?)
    }
}

/// The round in progress at `now`.
///
/// Round 0 is the preparation before `start`, after that a new round begins
/// every `round_length`.
#[must_use]
pub fn round(now: DateTime<Utc>, start: DateTime<FixedOffset>, round_length: RoundLength) -> u64 {
    let start = start.with_timezone(&Utc);
    if now < start {
        return 0;
    }

    let elapsed = now.signed_duration_since(start).num_seconds();
    let length = round_length.duration().num_seconds();

    u64::try_from(elapsed / length).unwrap_or_default() + 1
}

/// The one tournament the daemon runs.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct Tournament {
    name: String,
    start: DateTime<FixedOffset>,
    round_length: RoundLength,
    max_players: u32,
    started: bool,
    winner: Option<String>,
}

impl Tournament {
    /// A scheduled tournament. `max_players` of 0 means there is no limit.
    ///
    /// # Errors
    ///
    /// If the name is empty or contains a line break.
    pub fn new(
        name: &str,
        start: DateTime<FixedOffset>,
        round_length: RoundLength,
        max_players: u32,
    ) -> Result<Self, DaemonError> {
        let name = name.trim();

        if name.is_empty() {
            return Err(DaemonError::InvalidRecord(
                "the tournament needs a name".to_string(),
            ));
        }

        one_line("the tournament name", name)?;

        Ok(Self {
            name: name.to_string(),
            start,
            round_length,
            max_players,
            started: false,
            winner: None,
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The name as people read it, e.g. "Summer Cup Tournament".
    #[must_use]
    pub fn display_name(&self) -> String {
        format!("{} Tournament", self.name)
    }

    #[must_use]
    pub fn start(&self) -> DateTime<FixedOffset> {
        self.start
    }

    #[must_use]
    pub fn round_length(&self) -> RoundLength {
        self.round_length
    }

    /// 0 means there is no limit.
    #[must_use]
    pub fn max_players(&self) -> u32 {
        self.max_players
    }

    #[must_use]
    pub fn winner(&self) -> Option<&str> {
        self.winner.as_deref()
    }

    /// An empty `winner` clears it.
    ///
    /// # Errors
    ///
    /// If the winner contains a line break.
    pub fn set_winner(&mut self, winner: &str) -> Result<(), DaemonError> {
        let winner = winner.trim();
        one_line("the winner", winner)?;

        self.winner = if winner.is_empty() {
            None
        } else {
            Some(winner.to_string())
        };

        Ok(())
    }

    #[must_use]
    pub fn started(&self) -> bool {
        self.started
    }

    #[must_use]
    pub fn has_started_by(&self, now: DateTime<Utc>) -> bool {
        now >= self.start.with_timezone(&Utc)
    }

    /// Returns whether this call was the one that started the tournament.
    pub fn mark_started(&mut self) -> bool {
        if self.started {
            false
        } else {
            self.started = true;
            true
        }
    }

    #[must_use]
    pub fn round(&self, now: DateTime<Utc>) -> u64 {
        round(now, self.start, self.round_length)
    }

    #[must_use]
    pub fn round_label(&self, now: DateTime<Utc>) -> String {
        match self.round(now) {
            0 => format!("Prepping for the {}", self.display_name()),
            round => format!("Round {round} of the {}", self.display_name()),
        }
    }
}

/// Every field is one line of the status file.
fn one_line(what: &str, value: &str) -> Result<(), DaemonError> {
    if value.contains(['\n', '\r']) {
        return Err(DaemonError::InvalidRecord(format!(
            "{what} has to fit on one line"
        )));
    }

    Ok(())
}

impl fmt::Display for Tournament {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = if self.started { "started" } else { "scheduled" };

        write!(
            f,
            "{} {} {} {} {state}",
            self.display_name(),
            self.start.format("%Y-%m-%dT%H:%M%:z"),
            self.round_length,
            self.max_players,
        )?;

        if let Some(winner) = &self.winner {
            write!(f, " {winner}")?;
        }

        Ok(())
    }
}
