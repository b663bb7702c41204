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
    any::Any,
    panic::{self, AssertUnwindSafe},
    sync::Arc,
};

use log::{debug, error, info, warn};

use crate::{
    announce::Announcer,
    clock::Clock,
    error::DaemonError,
    persistence::StatusFile,
    queue::TaskReceiver,
    task::{Answer, Command, Reply, Schedule, Task},
    tournament::{NO_TOURNAMENT, Tournament},
};

/// Owns the tournament. Every read and write of it is a task run here, one
/// at a time, in the order the tasks were queued.
pub struct Worker {
    tournament: Option<Tournament>,
    generation: u64,
    status_file: Option<StatusFile>,
    announcer: Box<dyn Announcer>,
    clock: Arc<dyn Clock>,
}

impl Worker {
    /// Without a `status_file` nothing is read from or written to disk.
    #[must_use]
    pub fn new(
        status_file: Option<StatusFile>,
        announcer: Box<dyn Announcer>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            tournament: None,
            generation: 0,
            status_file,
            announcer,
            clock,
        }
    }

    /// Runs tasks until a [`Command::Shutdown`] or until every producer is
    /// gone.
    pub fn run(mut self, receiver: &TaskReceiver) {
        while let Some(task) = receiver.dequeue() {
            if !self.run_task(task) {
                break;
            }
        }

        info!("the worker stopped");
    }

    /// Runs one task and sends exactly one reply if the task has a reply
    /// channel, even if the task panics. Returns `false` after a shutdown.
    pub fn run_task(&mut self, task: Task) -> bool {
        let Task { command, reply } = task;

        if let Command::Shutdown = command {
            debug!("{command}");
            if let Some(reply) = reply {
                let _ok = reply.send(Ok(Answer::Done));
            }
            return false;
        }

        let name = command.to_string();
        debug!("{name}");

        let result = match panic::catch_unwind(AssertUnwindSafe(|| self.execute(command))) {
            Ok(result) => result,
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                error!("{name}: the task panicked: {message}");
                Err(DaemonError::TaskFailure(message))
            }
        };

        match &result {
            Err(error @ (DaemonError::NotFound | DaemonError::AlreadyExists(_))) => {
                debug!("{name}: {error}");
            }
            Err(DaemonError::TaskFailure(_)) | Ok(_) => {}
            Err(error) => error!("{name}: {error}"),
        }

        if let Some(reply) = reply
            && reply.send(result).is_err()
        {
            warn!("{name}: nobody is waiting for the reply");
        }

        true
    }

    fn execute(&mut self, command: Command) -> Reply {
        match command {
            Command::Load => self.load(),
            Command::Initialize {
                name,
                start,
                round_length,
                max_players,
            } => {
                if let Some(tournament) = &self.tournament {
                    return Err(DaemonError::AlreadyExists(tournament.name().to_string()));
                }

                let mut tournament = Tournament::new(&name, start, round_length, max_players)?;
                if tournament.has_started_by(self.clock.now()) {
                    tournament.mark_started();
                    info!("the {} started in the past", tournament.display_name());
                }

                info!("created {tournament}");
                self.generation += 1;
                self.tournament = Some(tournament);
                self.persist()?;

                Ok(Answer::Done)
            }
            Command::Save => {
                if self.tournament.is_none() {
                    return Err(DaemonError::NotFound);
                }

                self.persist()?;
                Ok(Answer::Done)
            }
            Command::Name => Ok(Answer::Name(
                self.tournament
                    .as_ref()
                    .map(|tournament| tournament.name().to_string()),
            )),
            Command::RoundLabel => {
                let label = self.tournament.as_ref().map_or_else(
                    || NO_TOURNAMENT.to_string(),
                    |tournament| tournament.round_label(self.clock.now()),
                );

                Ok(Answer::Label(label))
            }
            Command::Status => Ok(Answer::Status(self.tournament.clone())),
            Command::Schedule => Ok(Answer::Schedule(self.tournament.as_ref().map(
                |tournament| Schedule {
                    generation: self.generation,
                    start: tournament.start(),
                    started: tournament.started(),
                },
            ))),
            Command::SetWinner(winner) => {
                let tournament = self.tournament.as_mut().ok_or(DaemonError::NotFound)?;
                tournament.set_winner(&winner)?;

                self.persist()?;
                Ok(Answer::Done)
            }
            Command::StartTournament { generation } => self.start_tournament(generation),
            Command::End => {
                let tournament = self.tournament.take().ok_or(DaemonError::NotFound)?;
                info!("ended the {}", tournament.display_name());

                if let Some(status_file) = &self.status_file {
                    status_file.remove()?;
                }

                Ok(Answer::Done)
            }
            Command::Shutdown => Ok(Answer::Done),
        }
    }

    fn load(&mut self) -> Reply {
        let Some(status_file) = &self.status_file else {
            return Ok(Answer::Done);
        };

        if let Some(tournament) = &self.tournament {
            return Err(DaemonError::AlreadyExists(tournament.name().to_string()));
        }

        match status_file.load(self.clock.now())? {
            Some(tournament) => {
                self.generation += 1;
                self.tournament = Some(tournament);
            }
            None => info!("there is no saved tournament"),
        }

        Ok(Answer::Done)
    }

    fn start_tournament(&mut self, generation: Option<u64>) -> Reply {
        let tournament = self.tournament.as_mut().ok_or(DaemonError::NotFound)?;

        if let Some(generation) = generation
            && generation != self.generation
        {
            debug!("ignoring a start for an old tournament: {generation}");
            return Ok(Answer::Started(false));
        }

        if !tournament.mark_started() {
            return Ok(Answer::Started(false));
        }

        let display_name = tournament.display_name();
        info!("Starting the {display_name}...");

        // A failed write or announcement does not undo the start.
        if let Err(error) = self.persist() {
            error!("start_tournament: {error}");
        }

        if let Err(error) = self.announcer.post_announcement(&display_name) {
            error!("post_announcement: {error}");
        }

        Ok(Answer::Started(true))
    }

    fn persist(&self) -> Result<(), DaemonError> {
        match (&self.status_file, &self.tournament) {
            (Some(status_file), Some(tournament)) => Ok(status_file.save(tournament)?),
            _ => Ok(()),
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, FixedOffset, TimeDelta, TimeZone, Utc};

    use crate::{announce::LogAnnouncer, clock::ManualClock, tournament::RoundLength};

    use super::*;

    fn start() -> DateTime<FixedOffset> {
        FixedOffset::east_opt(0)
            .unwrap()
            .with_ymd_and_hms(2024, 6, 1, 18, 0, 0)
            .unwrap()
    }

    fn worker(clock: &ManualClock, status_file: Option<StatusFile>) -> Worker {
        Worker::new(status_file, Box::new(LogAnnouncer), Arc::new(clock.clone()))
    }

    fn initialize(name: &str) -> Command {
        Command::Initialize {
            name: name.to_string(),
            start: start(),
            round_length: RoundLength::from_days(3).unwrap(),
            max_players: 32,
        }
    }

    fn run(worker: &mut Worker, command: Command) -> Reply {
        let (task, rx) = Task::with_reply(command);
        assert!(worker.run_task(task));
        rx.try_recv().unwrap()
    }

    #[test]
    fn initialize_twice() {
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap());
        let mut worker = worker(&clock, None);

        run(&mut worker, initialize("Summer Cup")).unwrap();
        assert!(matches!(
            run(&mut worker, initialize("Winter Cup")),
            Err(DaemonError::AlreadyExists(name)) if name == "Summer Cup"
        ));
        assert_eq!(
            run(&mut worker, Command::Name).unwrap(),
            Answer::Name(Some("Summer Cup".to_string()))
        );
    }

    #[test]
    fn initialize_in_the_past_is_already_started() {
        let clock = ManualClock::new(start().with_timezone(&Utc) + TimeDelta::days(1));
        let mut worker = worker(&clock, None);

        run(&mut worker, initialize("Summer Cup")).unwrap();
        let Answer::Schedule(Some(schedule)) = run(&mut worker, Command::Schedule).unwrap() else {
            panic!("there should be a schedule");
        };
        assert!(schedule.started);
        assert_eq!(
            run(&mut worker, Command::StartTournament { generation: None }).unwrap(),
            Answer::Started(false)
        );
    }

    #[test]
    fn stale_starts_are_ignored() {
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap());
        let mut worker = worker(&clock, None);

        run(&mut worker, initialize("Summer Cup")).unwrap();
        run(&mut worker, Command::End).unwrap();
        run(&mut worker, initialize("Winter Cup")).unwrap();

        assert_eq!(
            run(&mut worker, Command::StartTournament { generation: Some(1) }).unwrap(),
            Answer::Started(false)
        );
        assert_eq!(
            run(&mut worker, Command::StartTournament { generation: Some(2) }).unwrap(),
            Answer::Started(true)
        );
    }

    #[test]
    fn no_tournament() {
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap());
        let mut worker = worker(&clock, None);

        assert_eq!(run(&mut worker, Command::Name).unwrap(), Answer::Name(None));
        assert_eq!(
            run(&mut worker, Command::RoundLabel).unwrap(),
            Answer::Label(NO_TOURNAMENT.to_string())
        );
        assert_eq!(run(&mut worker, Command::Schedule).unwrap(), Answer::Schedule(None));
        assert!(matches!(run(&mut worker, Command::Save), Err(DaemonError::NotFound)));
        assert!(matches!(run(&mut worker, Command::End), Err(DaemonError::NotFound)));
        assert!(matches!(
            run(&mut worker, Command::StartTournament { generation: None }),
            Err(DaemonError::NotFound)
        ));
    }

    #[test]
    fn end_removes_the_status_file() {
        let directory = tempfile::tempdir().unwrap();
        let path = directory.path().join("status.txt");
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap());
        let mut worker = worker(&clock, Some(StatusFile::new(path.clone())));

        run(&mut worker, initialize("Summer Cup")).unwrap();
        assert!(path.exists());

        run(&mut worker, Command::End).unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn winners_with_line_breaks_are_refused() {
        let directory = tempfile::tempdir().unwrap();
        let file = StatusFile::new(directory.path().join("status.txt"));
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap());
        let mut worker = worker(&clock, Some(file.clone()));

        run(&mut worker, initialize("Summer Cup")).unwrap();
        run(&mut worker, Command::SetWinner("Misty".to_string())).unwrap();

        assert!(matches!(
            run(&mut worker, Command::SetWinner("Ash\nKetchum".to_string())),
            Err(DaemonError::InvalidRecord(_))
        ));

        let Answer::Status(Some(tournament)) = run(&mut worker, Command::Status).unwrap() else {
            panic!("there should be a tournament");
        };
        assert_eq!(tournament.winner(), Some("Misty"));
        assert_eq!(
            file.load(clock.now()).unwrap().unwrap().winner(),
            Some("Misty")
        );
    }

    #[test]
    fn shutdown_replies_and_stops() {
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap());
        let mut worker = worker(&clock, None);

        let (task, rx) = Task::with_reply(Command::Shutdown);
        assert!(!worker.run_task(task));
        assert_eq!(rx.try_recv().unwrap().unwrap(), Answer::Done);
    }
}
