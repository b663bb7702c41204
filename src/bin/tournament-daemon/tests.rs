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

#![allow(clippy::unwrap_used)]
#![cfg(test)]

use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use chrono::{FixedOffset, TimeZone};
use clap::CommandFactory;
use tournament_daemon::{
    persistence::StatusFile,
    tournament::{RoundLength, Tournament},
};

use super::*;

fn data_folder() -> &'static Path {
    Path::new("/var/lib/tournament-daemon")
}

#[test]
fn verify_args() {
    Args::command().debug_assert();
}

#[test]
fn flags_override_the_config() {
    let config = Config {
        utc_offset_hours: 2,
        poll_interval_seconds: 5,
        status_file: Some(PathBuf::from("/srv/tournament/status.txt")),
        ..Config::default()
    };

    let args = Args::try_parse_from([
        "tournament-daemon",
        "--utc-offset",
        "-5",
        "--status-file",
        "here.txt",
    ])
    .unwrap();
    let options = args.options(&config, data_folder()).unwrap();

    assert_eq!(options.offset, FixedOffset::west_opt(5 * 3600).unwrap());
    assert_eq!(options.poll_interval, Duration::from_secs(5));
    assert_eq!(options.status_file, Some(PathBuf::from("here.txt")));
}

#[test]
fn the_config_fills_in_missing_flags() {
    let config = Config {
        status_file: Some(PathBuf::from("/srv/tournament/status.txt")),
        ..Config::default()
    };

    let args = Args::try_parse_from(["tournament-daemon"]).unwrap();
    let options = args.options(&config, data_folder()).unwrap();

    assert_eq!(options.offset, FixedOffset::east_opt(0).unwrap());
    assert_eq!(
        options.status_file,
        Some(PathBuf::from("/srv/tournament/status.txt"))
    );
}

#[test]
fn skip_the_data_file() {
    let args = Args::try_parse_from(["tournament-daemon", "--skip-the-data-file"]).unwrap();
    let options = args.options(&Config::default(), data_folder()).unwrap();

    assert!(options.status_file.is_none());
}

#[test]
fn the_status_file_defaults_to_the_data_folder() {
    let args = Args::try_parse_from(["tournament-daemon"]).unwrap();
    let options = args.options(&Config::default(), data_folder()).unwrap();

    assert_eq!(
        options.status_file,
        Some(data_folder().join(tournament_daemon::STATUS_FILE))
    );
}

#[test]
fn the_data_folder_is_created_with_a_config_flag() {
    let directory = tempfile::tempdir().unwrap();
    let config_file = directory.path().join("config.ron");
    fs::write(&config_file, "(utc_offset_hours: 2)").unwrap();
    let data_folder = directory.path().join("share").join("tournament-daemon");

    let args = Args::try_parse_from([
        "tournament-daemon",
        "--config",
        config_file.to_str().unwrap(),
    ])
    .unwrap();
    let config = args.config(&data_folder).unwrap();

    assert_eq!(config.utc_offset_hours, 2);
    assert!(data_folder.is_dir());

    let options = args.options(&config, &data_folder).unwrap();
    let status_file = StatusFile::new(options.status_file.unwrap());
    let tournament = Tournament::new(
        "Summer Cup",
        FixedOffset::east_opt(0)
            .unwrap()
            .with_ymd_and_hms(2030, 6, 1, 18, 0, 0)
            .unwrap(),
        RoundLength::from_days(3).unwrap(),
        32,
    )
    .unwrap();
    status_file.save(&tournament).unwrap();
}

#[test]
fn the_data_folder_is_created_without_a_config_flag() {
    let directory = tempfile::tempdir().unwrap();
    let data_folder = directory.path().join("tournament-daemon");

    let args = Args::try_parse_from(["tournament-daemon"]).unwrap();
    assert_eq!(args.config(&data_folder).unwrap(), Config::default());
    assert!(data_folder.is_dir());
}

#[test]
fn bad_offsets_are_refused() {
    let args = Args::try_parse_from(["tournament-daemon", "--utc-offset", "25"]).unwrap();
    assert!(args.options(&Config::default(), data_folder()).is_err());
}
