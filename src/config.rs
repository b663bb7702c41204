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
    fmt, fs,
    io::ErrorKind,
    path::{Path, PathBuf},
    time::Duration,
};

use chrono::FixedOffset;
use log::info;
use serde::{Deserialize, Serialize};

const HOUR_IN_SECONDS: i32 = 60 * 60;
const MAX_POLL_INTERVAL_SECONDS: u64 = 60;

/// `config.ron`
///
/// ```ron
/// (
///     utc_offset_hours: -5,
///     poll_interval_seconds: 1,
///     reply_timeout_seconds: 10,
///     status_file: None,
///     smtp: None,
/// )
/// ```
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default)]
pub struct Config {
    /// Every timestamp the daemon creates uses this offset.
    pub utc_offset_hours: i32,
    pub poll_interval_seconds: u64,
    pub reply_timeout_seconds: u64,
    pub status_file: Option<PathBuf>,
    pub smtp: Option<Smtp>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            utc_offset_hours: 0,
            poll_interval_seconds: 1,
            reply_timeout_seconds: 10,
            status_file: None,
            smtp: None,
        }
    }
}

impl Config {
    /// A missing file gives the defaults.
    ///
    /// # Errors
    ///
    /// If the file can't be read or isn't valid RON.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        match fs::read_to_string(path) {
            Ok(string) => ron::from_str(&string)
                .map_err(|err| anyhow::Error::msg(format!("RON: {}: {err}", path.display()))),
            Err(err) => match err.kind() {
                ErrorKind::NotFound => {
                    info!("{} not found, using the default settings", path.display());
                    Ok(Self::default())
                }
                _ => Err(anyhow::Error::msg(format!("{}: {err}", path.display()))),
            },
        }
    }

    /// # Errors
    ///
    /// If the offset is more than a day.
    pub fn fixed_offset(&self) -> anyhow::Result<FixedOffset> {
        self.utc_offset_hours
            .checked_mul(HOUR_IN_SECONDS)
            .and_then(FixedOffset::east_opt)
            .ok_or_else(|| {
                anyhow::Error::msg(format!(
                    "utc_offset_hours is out of range: {}",
                    self.utc_offset_hours
                ))
            })
    }

    /// Between one second and a minute.
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(
            self.poll_interval_seconds
                .clamp(1, MAX_POLL_INTERVAL_SECONDS),
        )
    }

    #[must_use]
    pub fn reply_timeout(&self) -> Duration {
        Duration::from_secs(self.reply_timeout_seconds.max(1))
    }
}

/// Where to mail the announcement that a tournament started.
#[derive(Clone, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default)]
pub struct Smtp {
    pub service: String,
    pub username: String,
    pub password: String,
    pub from: String,
    pub to: Vec<String>,
}

impl fmt::Debug for Smtp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Smtp")
            .field("service", &self.service)
            .field("username", &self.username)
            .field("password", &"***")
            .field("from", &self.from)
            .field("to", &self.to)
            .finish()
    }
}
