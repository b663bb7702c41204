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

use std::{io, path::PathBuf, time::Duration};

use thiserror::Error;

/// Every failure a caller of the daemon can see.
#[derive(Error, Debug)]
pub enum DaemonError {
    #[error("the {0} Tournament is already running")]
    AlreadyExists(String),
    #[error("there is no tournament")]
    NotFound,
    #[error("invalid tournament: {0}")]
    InvalidRecord(String),
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
    #[error("task failed: {0}")]
    TaskFailure(String),
    #[error("the task queue is full")]
    ResourceExhausted,
    #[error("the task queue is closed")]
    Disconnected,
    #[error("no reply after {0:?}")]
    Timeout(Duration),
    #[error("could not spawn the {0} thread: {1}")]
    Spawn(&'static str, #[source] io::Error),
}

#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("{}: line {line}: {message}", path.display())]
    Parse {
        path: PathBuf,
        line: usize,
        message: String,
    },
}
