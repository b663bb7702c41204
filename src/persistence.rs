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

//! The status file.
//!
//! ```text
//! Summer Cup
//! 2024 6 1 18 0 0
//! 3
//! 32
//! ```
//!
//! Line one is the name, line two the start as `year month day hour minute
//! utc_offset_hours`, line three the round length in days and line four the
//! maximum number of players. A fifth line holds the winner once there is
//! one.

use std::{
    fmt::{self, Write as _},
    fs::{self, File},
    io::{ErrorKind, Write},
    path::{Path, PathBuf},
    str::{FromStr, SplitAsciiWhitespace},
};

use chrono::{DateTime, Datelike, FixedOffset, TimeZone, Timelike, Utc};
use log::{debug, info};

use crate::{
    error::PersistenceError,
    tournament::{RoundLength, Tournament},
};

const HOUR_IN_SECONDS: i32 = 60 * 60;

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct StatusFile {
    path: PathBuf,
}

impl StatusFile {
    #[must_use]
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the saved tournament, `None` if there is no status file.
    ///
    /// Whether the tournament has started is decided by comparing its start
    /// to `now`.
    ///
    /// # Errors
    ///
    /// If the file can't be read or is malformed.
    pub fn load(&self, now: DateTime<Utc>) -> Result<Option<Tournament>, PersistenceError> {
        let string = match fs::read_to_string(&self.path) {
            Ok(string) => string,
            Err(error) if error.kind() == ErrorKind::NotFound => {
                debug!("{} does not exist", self.path.display());
                return Ok(None);
            }
            Err(error) => return Err(self.io_error(error)),
        };

        let tournament = parse(&string, now).map_err(|(line, message)| PersistenceError::Parse {
            path: self.path.clone(),
            line,
            message,
        })?;

        info!("loaded the {} from {}", tournament.display_name(), self.path.display());
        Ok(Some(tournament))
    }

    /// # Errors
    ///
    /// If the file can't be written.
    pub fn save(&self, tournament: &Tournament) -> Result<(), PersistenceError> {
        let mut file = File::create(&self.path).map_err(|error| self.io_error(error))?;
        file.write_all(to_status_string(tournament).as_bytes())
            .map_err(|error| self.io_error(error))?;

        debug!("saved the {} to {}", tournament.display_name(), self.path.display());
        Ok(())
    }

    /// Deletes the status file, which is how an ended tournament is recorded.
    ///
    /// # Errors
    ///
    /// If the file exists and can't be removed.
    pub fn remove(&self) -> Result<(), PersistenceError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(error) if error.kind() == ErrorKind::NotFound => Ok(()),
            Err(error) => Err(self.io_error(error)),
        }
    }

    fn io_error(&self, source: std::io::Error) -> PersistenceError {
        PersistenceError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

/// Renders the status file contents.
///
/// Offsets that are not whole hours can't be written, such a start is
/// written in UTC instead. Seconds are dropped.
#[must_use]
pub fn to_status_string(tournament: &Tournament) -> String {
    let mut start = tournament.start();
    if start.offset().local_minus_utc() % HOUR_IN_SECONDS != 0 {
        start = start.with_timezone(&Utc).fixed_offset();
    }

    let mut string = String::new();
    let _ok = write_status(&mut string, tournament, start);
    string
}

fn write_status(
    string: &mut String,
    tournament: &Tournament,
    start: DateTime<FixedOffset>,
) -> fmt::Result {
    writeln!(string, "{}", tournament.name())?;
    writeln!(
        string,
        "{} {} {} {} {} {}",
        start.year(),
        start.month(),
        start.day(),
        start.hour(),
        start.minute(),
        start.offset().local_minus_utc() / HOUR_IN_SECONDS,
    )?;
    writeln!(string, "{}", tournament.round_length())?;
    writeln!(string, "{}", tournament.max_players())?;

    if let Some(winner) = tournament.winner() {
        writeln!(string, "{winner}")?;
    }

    Ok(())
}

fn parse(string: &str, now: DateTime<Utc>) -> Result<Tournament, (usize, String)> {
    let mut lines = string.lines();

    let name = lines.next().ok_or((1, "the name is missing".to_string()))?;
    let start = lines
        .next()
        .ok_or((2, "the start is missing".to_string()))
        .and_then(|line| parse_start(line).map_err(|message| (2, message)))?;
    let round_length = lines
        .next()
        .ok_or((3, "the round length is missing".to_string()))
        .and_then(|line| {
            RoundLength::from_str(line.trim()).map_err(|error| (3, error.to_string()))
        })?;
    let max_players = lines
        .next()
        .ok_or((4, "the maximum number of players is missing".to_string()))
        .and_then(|line| {
            line.trim()
                .parse::<u32>()
                .map_err(|error| (4, format!("max players '{line}': {error}")))
        })?;

    let mut tournament = Tournament::new(name, start, round_length, max_players)
        .map_err(|error| (1, error.to_string()))?;

    if let Some(winner) = lines.next() {
        tournament
            .set_winner(winner)
            .map_err(|error| (5, error.to_string()))?;
    }

    if lines.any(|line| !line.trim().is_empty()) {
        return Err((6, "unexpected lines after the winner".to_string()));
    }

    if tournament.has_started_by(now) {
        tournament.mark_started();
    }

    Ok(tournament)
}

fn parse_start(line: &str) -> Result<DateTime<FixedOffset>, String> {
    let mut fields = line.split_ascii_whitespace();

    let year: i32 = field(&mut fields, "year")?;
    let month: u32 = field(&mut fields, "month")?;
    let day: u32 = field(&mut fields, "day")?;
    let hour: u32 = field(&mut fields, "hour")?;
    let minute: u32 = field(&mut fields, "minute")?;
    let offset_hours: i32 = field(&mut fields, "utc offset")?;

    if fields.next().is_some() {
        return Err(format!("too many fields in '{line}'"));
    }

    let offset = offset_hours
        .checked_mul(HOUR_IN_SECONDS)
        .and_then(FixedOffset::east_opt)
        .ok_or_else(|| format!("invalid utc offset: {offset_hours}"))?;

    offset
        .with_ymd_and_hms(year, month, day, hour, minute, 0)
        .single()
        .ok_or_else(|| format!("invalid date: '{line}'"))
}

fn field<T>(fields: &mut SplitAsciiWhitespace<'_>, what: &str) -> Result<T, String>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    let value = fields.next().ok_or_else(|| format!("the {what} is missing"))?;
    value
        .parse()
        .map_err(|error| format!("{what} '{value}': {error}"))
}

#[cfg(test)]
mod tests {
    use chrono::TimeDelta;

    use super::*;

    fn tournament(offset_seconds: i32) -> Tournament {
        let start = FixedOffset::east_opt(offset_seconds)
            .unwrap()
            .with_ymd_and_hms(2024, 6, 1, 18, 0, 0)
            .unwrap();

        Tournament::new("Summer Cup", start, RoundLength::from_days(3).unwrap(), 32).unwrap()
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn status_string_layout() {
        assert_eq!(
            to_status_string(&tournament(-5 * 3600)),
            "Summer Cup\n2024 6 1 18 0 -5\n3\n32\n"
        );

        let mut won = tournament(0);
        won.set_winner("ash").unwrap();
        assert_eq!(to_status_string(&won), "Summer Cup\n2024 6 1 18 0 0\n3\n32\nash\n");
    }

    #[test]
    fn half_hour_offsets_are_written_in_utc() {
        let india = tournament(5 * 3600 + 1800);
        let string = to_status_string(&india);
        assert_eq!(string, "Summer Cup\n2024 6 1 12 30 0\n3\n32\n");

        let loaded = parse(&string, now()).unwrap();
        assert_eq!(loaded.start(), india.start());
    }

    #[test]
    fn save_then_load() {
        let directory = tempfile::tempdir().unwrap();
        let file = StatusFile::new(directory.path().join("status.txt"));
        let mut saved = tournament(2 * 3600);
        saved.set_winner("misty").unwrap();

        file.save(&saved).unwrap();
        let loaded = file.load(now()).unwrap().unwrap();

        assert_eq!(loaded.name(), saved.name());
        assert_eq!(loaded.start(), saved.start());
        assert_eq!(loaded.start().offset(), saved.start().offset());
        assert_eq!(loaded.round_length(), saved.round_length());
        assert_eq!(loaded.max_players(), saved.max_players());
        assert_eq!(loaded.winner(), saved.winner());
        assert!(!loaded.started());
    }

    #[test]
    fn winners_stay_on_their_line() {
        let directory = tempfile::tempdir().unwrap();
        let file = StatusFile::new(directory.path().join("status.txt"));
        let mut saved = tournament(0);

        assert!(saved.set_winner("Ash\nKetchum").is_err());
        saved.set_winner("Ash Ketchum").unwrap();
        file.save(&saved).unwrap();

        assert_eq!(
            fs::read_to_string(file.path()).unwrap(),
            "Summer Cup\n2024 6 1 18 0 0\n3\n32\nAsh Ketchum\n"
        );
        assert_eq!(
            file.load(now()).unwrap().unwrap().winner(),
            Some("Ash Ketchum")
        );
    }

    #[test]
    fn loading_after_the_start_marks_it_started() {
        let saved = tournament(0);
        let after = saved.start().with_timezone(&Utc) + TimeDelta::minutes(1);

        let loaded = parse(&to_status_string(&saved), after).unwrap();
        assert!(loaded.started());
    }

    #[test]
    fn missing_file_is_no_tournament() {
        let directory = tempfile::tempdir().unwrap();
        let file = StatusFile::new(directory.path().join("status.txt"));

        assert!(file.load(now()).unwrap().is_none());
        assert!(file.remove().is_ok());
    }

    #[test]
    fn remove_deletes_the_file() {
        let directory = tempfile::tempdir().unwrap();
        let file = StatusFile::new(directory.path().join("status.txt"));

        file.save(&tournament(0)).unwrap();
        file.remove().unwrap();
        assert!(file.load(now()).unwrap().is_none());
    }

    #[test]
    fn malformed_files_name_the_line() {
        let cases = [
            ("", 1),
            ("Summer Cup\n", 2),
            ("Summer Cup\n2024 6 1 18\n3\n32\n", 2),
            ("Summer Cup\n2024 13 1 18 0 0\n3\n32\n", 2),
            ("Summer Cup\n2024 6 1 18 0 0 7\n3\n32\n", 2),
            ("Summer Cup\n2024 6 1 18 0 99\n3\n32\n", 2),
            ("Summer Cup\n2024 6 1 18 0 0\n0\n32\n", 3),
            ("Summer Cup\n2024 6 1 18 0 0\n3\n", 4),
            ("Summer Cup\n2024 6 1 18 0 0\n3\nlots\n", 4),
            ("  \n2024 6 1 18 0 0\n3\n32\n", 1),
            ("Summer Cup\n2024 6 1 18 0 0\n3\n32\nAsh\nKetchum\n", 6),
            ("Summer Cup\n2024 6 1 18 0 0\n3\n32\nAsh\rKetchum\n", 5),
        ];

        for (string, expected) in cases {
            let Err((line, _message)) = parse(string, now()) else {
                panic!("{string:?} should not parse");
            };
            assert_eq!(line, expected, "{string:?}");
        }
    }

    #[test]
    fn parse_errors_carry_the_path() {
        let directory = tempfile::tempdir().unwrap();
        let path = directory.path().join("status.txt");
        fs::write(&path, "Summer Cup\nsoon\n3\n32\n").unwrap();

        let error = StatusFile::new(path.clone()).load(now()).unwrap_err();
        assert!(matches!(error, PersistenceError::Parse { line: 2, .. }));
        assert!(error.to_string().starts_with(&path.display().to_string()));
    }
}
