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
    path::PathBuf,
    sync::Arc,
    thread::{self, JoinHandle},
    time::Duration,
};

use chrono::{DateTime, FixedOffset, NaiveDateTime, Offset, TimeZone, Utc};
use log::{error, info};

use crate::{
    announce::Announcer,
    clock::Clock,
    error::DaemonError,
    persistence::StatusFile,
    queue::TaskQueue,
    task::{Answer, Command, Task},
    tournament::{RoundLength, Tournament},
    watcher::EventWatcher,
    worker::Worker,
};

#[derive(Clone, Debug)]
pub struct Options {
    /// The offset every timestamp is created with.
    pub offset: FixedOffset,
    pub poll_interval: Duration,
    pub reply_timeout: Duration,
    /// `None` keeps everything in memory.
    pub status_file: Option<PathBuf>,
    /// `None` for an unbounded task queue.
    pub queue_capacity: Option<usize>,
    pub watch: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            offset: Utc.fix(),
            poll_interval: Duration::from_secs(1),
            reply_timeout: Duration::from_secs(10),
            status_file: None,
            queue_capacity: None,
            watch: true,
        }
    }
}

/// The handle the rest of the program uses.
///
/// Every method queues a task for the worker thread and blocks until the
/// worker answers, so each call sees every call made before it fully
/// applied.
#[derive(Debug)]
pub struct Daemon {
    queue: TaskQueue,
    offset: FixedOffset,
    reply_timeout: Duration,
    worker: Option<JoinHandle<()>>,
    watcher: Option<JoinHandle<()>>,
}

impl Daemon {
    /// Starts the worker, loads the saved tournament if there is one and
    /// starts the event watcher.
    ///
    /// # Errors
    ///
    /// If a thread can't be spawned.
    pub fn start(
        options: Options,
        clock: Arc<dyn Clock>,
        announcer: Box<dyn Announcer>,
    ) -> Result<Self, DaemonError> {
        let (queue, receiver) = match options.queue_capacity {
            Some(capacity) => TaskQueue::bounded(capacity),
            None => TaskQueue::unbounded(),
        };

        let status_file = options.status_file.map(StatusFile::new);
        let load = status_file.is_some();
        let worker = Worker::new(status_file, announcer, clock.clone());

        let worker = thread::Builder::new()
            .name("worker".to_string())
            .spawn(move || worker.run(&receiver))
            .map_err(|error| DaemonError::Spawn("worker", error))?;

        if load {
            queue.enqueue_waiting(Task::new(Command::Load))?;
            queue.enqueue_waiting(Task::new(Command::Save))?;
        }

        let watcher = if options.watch {
            let watcher = EventWatcher::new(
                queue.clone(),
                clock,
                options.poll_interval,
                options.reply_timeout,
            );
            Some(watcher.spawn()?)
        } else {
            None
        };

        info!("the daemon started");

        Ok(Self {
            queue,
            offset: options.offset,
            reply_timeout: options.reply_timeout,
            worker: Some(worker),
            watcher,
        })
    }

    #[must_use]
    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    /// A producer handle onto the same queue the daemon uses.
    #[must_use]
    pub fn queue(&self) -> TaskQueue {
        self.queue.clone()
    }

    /// Attaches the configured offset to a wall clock time.
    ///
    /// # Errors
    ///
    /// If the time does not exist at that offset.
    pub fn local_datetime(&self, naive: &NaiveDateTime) -> Result<DateTime<FixedOffset>, DaemonError> {
        self.offset
            .from_local_datetime(naive)
            .single()
            .ok_or_else(|| DaemonError::InvalidRecord(format!("invalid start: {naive}")))
    }

    fn request(&self, command: Command) -> Result<Answer, DaemonError> {
        self.queue.request(command, self.reply_timeout)
    }

    /// # Errors
    ///
    /// [`DaemonError::AlreadyExists`] if a tournament is running, or the
    /// record is invalid, or saving it failed. A tournament that could not
    /// be saved is still running.
    pub fn initialize(
        &self,
        name: &str,
        start: DateTime<FixedOffset>,
        round_length_days: u32,
        max_players: u32,
    ) -> Result<(), DaemonError> {
        let round_length = RoundLength::from_days(round_length_days)?;

        expect_done(self.request(Command::Initialize {
            name: name.to_string(),
            start,
            round_length,
            max_players,
        })?)
    }

    /// `None` if there is no tournament.
    ///
    /// # Errors
    ///
    /// If the worker can't be reached.
    pub fn name(&self) -> Result<Option<String>, DaemonError> {
        match self.request(Command::Name)? {
            Answer::Name(name) => Ok(name),
            answer => Err(unexpected(&answer)),
        }
    }

    /// # Errors
    ///
    /// If the worker can't be reached.
    pub fn round_label(&self) -> Result<String, DaemonError> {
        match self.request(Command::RoundLabel)? {
            Answer::Label(label) => Ok(label),
            answer => Err(unexpected(&answer)),
        }
    }

    /// A copy of the current tournament.
    ///
    /// # Errors
    ///
    /// If the worker can't be reached.
    pub fn status(&self) -> Result<Option<Tournament>, DaemonError> {
        match self.request(Command::Status)? {
            Answer::Status(tournament) => Ok(tournament),
            answer => Err(unexpected(&answer)),
        }
    }

    /// # Errors
    ///
    /// [`DaemonError::NotFound`] if there is no tournament, or if the write
    /// failed.
    pub fn save(&self) -> Result<(), DaemonError> {
        expect_done(self.request(Command::Save)?)
    }

    /// Starts the tournament now instead of waiting for the event watcher.
    /// Returns `false` if it had already started.
    ///
    /// # Errors
    ///
    /// [`DaemonError::NotFound`] if there is no tournament.
    pub fn start_tournament(&self) -> Result<bool, DaemonError> {
        match self.request(Command::StartTournament { generation: None })? {
            Answer::Started(started) => Ok(started),
            answer => Err(unexpected(&answer)),
        }
    }

    /// An empty `winner` clears it.
    ///
    /// # Errors
    ///
    /// [`DaemonError::NotFound`] if there is no tournament, or if the write
    /// failed.
    pub fn set_winner(&self, winner: &str) -> Result<(), DaemonError> {
        expect_done(self.request(Command::SetWinner(winner.to_string()))?)
    }

    /// # Errors
    ///
    /// [`DaemonError::NotFound`] if there is no tournament, or if the status
    /// file could not be removed.
    pub fn end(&self) -> Result<(), DaemonError> {
        expect_done(self.request(Command::End)?)
    }

    /// Lets the worker finish everything already queued, then stops it.
    ///
    /// # Errors
    ///
    /// If the worker thread panicked.
    pub fn shutdown(mut self) -> Result<(), DaemonError> {
        self.stop()
    }

    fn stop(&mut self) -> Result<(), DaemonError> {
        let Some(worker) = self.worker.take() else {
            return Ok(());
        };

        if let Err(error) = self.queue.enqueue_waiting(Task::new(Command::Shutdown)) {
            error!("shutdown: {error}");
        }

        worker
            .join()
            .map_err(|_| DaemonError::TaskFailure("the worker thread panicked".to_string()))?;

        // The watcher notices the closed queue on its next poll.
        self.watcher = None;

        info!("the daemon stopped");
        Ok(())
    }
}

impl Drop for Daemon {
    fn drop(&mut self) {
        if let Err(error) = self.stop() {
            error!("{error}");
        }
    }
}

fn expect_done(answer: Answer) -> Result<(), DaemonError> {
    match answer {
        Answer::Done => Ok(()),
        answer => Err(unexpected(&answer)),
    }
}

fn unexpected(answer: &Answer) -> DaemonError {
    DaemonError::TaskFailure(format!("unexpected reply: {answer:?}"))
}
