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
    sync::Arc,
    thread::{self, JoinHandle},
    time::Duration,
};

use log::{debug, error, info, trace};

use crate::{
    clock::Clock,
    error::DaemonError,
    queue::TaskQueue,
    task::{Answer, Command, Task},
};

/// Polls the clock and queues the start of the tournament once its start
/// time has passed.
///
/// The watcher never touches the tournament, it asks the worker for a
/// [`crate::task::Schedule`] like any other caller would.
pub struct EventWatcher {
    queue: TaskQueue,
    clock: Arc<dyn Clock>,
    interval: Duration,
    reply_timeout: Duration,
    /// The generation of the last tournament a start was queued for.
    signaled: Option<u64>,
}

impl EventWatcher {
    #[must_use]
    pub fn new(
        queue: TaskQueue,
        clock: Arc<dyn Clock>,
        interval: Duration,
        reply_timeout: Duration,
    ) -> Self {
        Self {
            queue,
            clock,
            interval,
            reply_timeout,
            signaled: None,
        }
    }

    /// # Errors
    ///
    /// If the thread can't be spawned.
    pub fn spawn(self) -> Result<JoinHandle<()>, DaemonError> {
        thread::Builder::new()
            .name("event-watcher".to_string())
            .spawn(move || self.run())
            .map_err(|error| DaemonError::Spawn("event watcher", error))
    }

    /// Polls every `interval` until the task queue closes.
    pub fn run(mut self) {
        loop {
            match self.poll() {
                Ok(_) => {}
                Err(DaemonError::Disconnected) => break,
                Err(error) => error!("event watcher: {error}"),
            }

            thread::sleep(self.interval);
        }

        debug!("the event watcher stopped");
    }

    /// Checks the schedule once. Returns whether a start was queued.
    ///
    /// # Errors
    ///
    /// If the worker can't be reached.
    pub fn poll(&mut self) -> Result<bool, DaemonError> {
        let answer = self.queue.request(Command::Schedule, self.reply_timeout)?;
        let Answer::Schedule(schedule) = answer else {
            return Err(DaemonError::TaskFailure(format!(
                "schedule: unexpected reply: {answer:?}"
            )));
        };

        let Some(schedule) = schedule else {
            trace!("poll: there is no tournament");
            return Ok(false);
        };

        let now = self.clock.now();
        if schedule.started || self.signaled == Some(schedule.generation) || now < schedule.start {
            trace!("poll: nothing to do at {now}");
            return Ok(false);
        }

        self.queue.enqueue(Task::new(Command::StartTournament {
            generation: Some(schedule.generation),
        }))?;
        self.signaled = Some(schedule.generation);
        info!("it is {now}, queued the start of the tournament");

        Ok(true)
    }
}
