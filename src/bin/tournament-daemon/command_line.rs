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
    fs,
    io::Write as _,
    path::{Path, PathBuf},
};

use clap::{CommandFactory, Parser};
use tournament_daemon::{
    CONFIG_FILE, COPYRIGHT, LONG_VERSION, STATUS_FILE, config::Config, daemon::Options,
};

/// Tournament Daemon
///
/// Runs one tournament: saves its schedule, reports the current round and
/// starts it on time. Reads commands from stdin, one per line. Enter
/// 'list_commands' for a list of commands.
#[allow(clippy::struct_excessive_bools)]
#[derive(Parser, Debug)]
#[command(long_version = LONG_VERSION, about = "Tournament Daemon")]
pub(crate) struct Args {
    /// The RON configuration file [default: DATA_FOLDER/config.ron]
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Hours east of UTC used for every timestamp, overrides the configuration
    #[arg(allow_negative_numbers = true, long, value_name = "HOURS")]
    pub utc_offset: Option<i32>,

    /// Seconds between checks of the start time, overrides the configuration
    #[arg(long, value_name = "SECONDS")]
    pub poll_interval: Option<u64>,

    /// Where the tournament is saved [default: DATA_FOLDER/status.txt]
    #[arg(long, value_name = "PATH")]
    pub status_file: Option<PathBuf>,

    /// Whether to skip the data file
    #[arg(long)]
    pub skip_the_data_file: bool,

    /// Whether to keep running without reading stdin
    #[arg(long)]
    pub headless: bool,

    /// Whether to log on the debug level
    #[arg(long)]
    pub debug: bool,

    /// Whether the application is being run by systemd
    #[arg(long)]
    pub systemd: bool,

    /// Build the manpage
    #[arg(long)]
    pub man: bool,
}

impl Args {
    pub(crate) fn generate_man_page() -> anyhow::Result<()> {
        let mut buffer: Vec<u8> = Vec::default();
        let cmd = Self::command().name("tournament-daemon").long_version(None);
        let man = clap_mangen::Man::new(cmd).date("2026-10-19");

        man.render(&mut buffer)?;
        write!(buffer, "{COPYRIGHT}")?;

        std::fs::write("tournament-daemon.1", buffer)?;
        Ok(())
    }

    /// Creates `data_folder`, then loads `--config` or the config file in
    /// it.
    pub(crate) fn config(&self, data_folder: &Path) -> anyhow::Result<Config> {
        fs::create_dir_all(data_folder)?;

        match &self.config {
            Some(path) => Config::load(path),
            None => Config::load(&data_folder.join(CONFIG_FILE)),
        }
    }

    /// Folds the flags over the configuration file.
    pub(crate) fn options(&self, config: &Config, data_folder: &Path) -> anyhow::Result<Options> {
        let mut config = config.clone();

        if let Some(utc_offset) = self.utc_offset {
            config.utc_offset_hours = utc_offset;
        }
        if let Some(poll_interval) = self.poll_interval {
            config.poll_interval_seconds = poll_interval;
        }

        let status_file = if self.skip_the_data_file {
            None
        } else {
            Some(
                self.status_file
                    .clone()
                    .or(config.status_file.clone())
                    .unwrap_or_else(|| data_folder.join(STATUS_FILE)),
            )
        };

        Ok(Options {
            offset: config.fixed_offset()?,
            poll_interval: config.poll_interval(),
            reply_timeout: config.reply_timeout(),
            status_file,
            ..Options::default()
        })
    }
}
