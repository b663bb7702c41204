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
    sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, SyncSender, TrySendError},
    time::Duration,
};

use crate::{
    error::DaemonError,
    task::{Answer, Command, Task},
};

#[derive(Clone, Debug)]
enum Producer {
    Bounded(SyncSender<Task>),
    Unbounded(Sender<Task>),
}

/// The sending half of the task queue. Clone it for every producer.
///
/// Tasks come out of the [`TaskReceiver`] in the order they arrived here,
/// whichever clone they were sent from.
#[derive(Clone, Debug)]
pub struct TaskQueue {
    producer: Producer,
}

/// The one consumer of a [`TaskQueue`].
#[derive(Debug)]
pub struct TaskReceiver(Receiver<Task>);

impl TaskQueue {
    #[must_use]
    pub fn unbounded() -> (Self, TaskReceiver) {
        let (tx, rx) = mpsc::channel();

        (
            Self {
                producer: Producer::Unbounded(tx),
            },
            TaskReceiver(rx),
        )
    }

    /// A queue holding at most `capacity` waiting tasks (at least one).
    #[must_use]
    pub fn bounded(capacity: usize) -> (Self, TaskReceiver) {
        let (tx, rx) = mpsc::sync_channel(capacity.max(1));

        (
            Self {
                producer: Producer::Bounded(tx),
            },
            TaskReceiver(rx),
        )
    }

    /// Never blocks.
    ///
    /// # Errors
    ///
    /// If the receiver is gone, or a bounded queue is full.
    pub fn enqueue(&self, task: Task) -> Result<(), DaemonError> {
        match &self.producer {
            Producer::Unbounded(tx) => tx.send(task).map_err(|_| DaemonError::Disconnected),
            Producer::Bounded(tx) => tx.try_send(task).map_err(|error| match error {
                TrySendError::Full(_) => DaemonError::ResourceExhausted,
                TrySendError::Disconnected(_) => DaemonError::Disconnected,
            }),
        }
    }

    /// Like [`Self::enqueue`], but waits for room in a full bounded queue.
    ///
    /// # Errors
    ///
    /// If the receiver is gone.
    pub fn enqueue_waiting(&self, task: Task) -> Result<(), DaemonError> {
        match &self.producer {
            Producer::Unbounded(tx) => tx.send(task).map_err(|_| DaemonError::Disconnected),
            Producer::Bounded(tx) => tx.send(task).map_err(|_| DaemonError::Disconnected),
        }
    }

    /// Queues `command` and waits up to `timeout` for the worker to answer.
    ///
    /// # Errors
    ///
    /// The command's own failure, or [`DaemonError::Timeout`] if the worker
    /// did not answer in time, or [`DaemonError::Disconnected`] if it went
    /// away.
    pub fn request(&self, command: Command, timeout: Duration) -> Result<Answer, DaemonError> {
        let (task, rx) = Task::with_reply(command);
        self.enqueue(task)?;

        match rx.recv_timeout(timeout) {
            Ok(reply) => reply,
            Err(RecvTimeoutError::Timeout) => Err(DaemonError::Timeout(timeout)),
            Err(RecvTimeoutError::Disconnected) => Err(DaemonError::Disconnected),
        }
    }
}

impl TaskReceiver {
    /// Blocks until there is a task, `None` once every producer is gone.
    #[must_use]
    pub fn dequeue(&self) -> Option<Task> {
        self.0.recv().ok()
    }

    #[must_use]
    pub fn try_dequeue(&self) -> Option<Task> {
        self.0.try_recv().ok()
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;

    fn winner(task: &Task) -> &str {
        match &task.command {
            Command::SetWinner(winner) => winner,
            command => panic!("unexpected command: {command}"),
        }
    }

    #[test]
    fn first_in_first_out() {
        let (queue, receiver) = TaskQueue::unbounded();

        for name in ["a", "b", "c"] {
            queue
                .enqueue(Task::new(Command::SetWinner(name.to_string())))
                .unwrap();
        }

        let order: Vec<_> = (0..3)
            .map(|_| winner(&receiver.dequeue().unwrap()).to_string())
            .collect();
        assert_eq!(order, ["a", "b", "c"]);
        assert!(receiver.try_dequeue().is_none());
    }

    #[test]
    fn each_producer_keeps_its_order() {
        let (queue, receiver) = TaskQueue::unbounded();
        let mut handles = Vec::new();

        for producer in 0..4 {
            let queue = queue.clone();
            handles.push(thread::spawn(move || {
                for index in 0..250 {
                    queue
                        .enqueue(Task::new(Command::SetWinner(format!("{producer} {index}"))))
                        .unwrap();
                }
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }
        drop(queue);

        let mut last = [None; 4];
        let mut count = 0;
        while let Some(task) = receiver.dequeue() {
            let (producer, index) = winner(&task).split_once(' ').unwrap();
            let producer: usize = producer.parse().unwrap();
            let index: usize = index.parse().unwrap();

            if let Some(last) = last[producer] {
                assert!(index > last);
            }
            last[producer] = Some(index);
            count += 1;
        }

        assert_eq!(count, 1_000);
    }

    #[test]
    fn full_bounded_queue() {
        let (queue, receiver) = TaskQueue::bounded(2);

        queue.enqueue(Task::new(Command::Save)).unwrap();
        queue.enqueue(Task::new(Command::Save)).unwrap();
        assert!(matches!(
            queue.enqueue(Task::new(Command::Save)),
            Err(DaemonError::ResourceExhausted)
        ));

        assert!(receiver.dequeue().is_some());
        queue.enqueue(Task::new(Command::Save)).unwrap();
    }

    #[test]
    fn enqueue_waiting_waits_for_room() {
        let (queue, receiver) = TaskQueue::bounded(1);
        queue.enqueue(Task::new(Command::Load)).unwrap();

        let producer = {
            let queue = queue.clone();
            thread::spawn(move || queue.enqueue_waiting(Task::new(Command::Save)))
        };

        assert!(matches!(receiver.dequeue().unwrap().command, Command::Load));
        assert!(matches!(receiver.dequeue().unwrap().command, Command::Save));
        producer.join().unwrap().unwrap();

        drop(receiver);
        assert!(matches!(
            queue.enqueue_waiting(Task::new(Command::Save)),
            Err(DaemonError::Disconnected)
        ));
    }

    #[test]
    fn closed_queue() {
        let (queue, receiver) = TaskQueue::unbounded();
        drop(receiver);

        assert!(matches!(
            queue.enqueue(Task::new(Command::Save)),
            Err(DaemonError::Disconnected)
        ));
        assert!(matches!(
            queue.request(Command::Name, Duration::from_secs(1)),
            Err(DaemonError::Disconnected)
        ));
    }

    #[test]
    fn request_times_out_without_a_worker() {
        let (queue, _receiver) = TaskQueue::unbounded();

        assert!(matches!(
            queue.request(Command::Name, Duration::from_millis(10)),
            Err(DaemonError::Timeout(_))
        ));
    }

    #[test]
    fn request_gets_the_reply() {
        let (queue, receiver) = TaskQueue::unbounded();

        let worker = thread::spawn(move || {
            let task = receiver.dequeue().unwrap();
            assert!(matches!(task.command, Command::Name));
            task.reply
                .unwrap()
                .send(Ok(Answer::Name(Some("Summer Cup".to_string()))))
                .unwrap();
        });

        assert_eq!(
            queue.request(Command::Name, Duration::from_secs(5)).unwrap(),
            Answer::Name(Some("Summer Cup".to_string()))
        );
        worker.join().unwrap();
    }
}
