//! A daemon that runs one community tournament.
//!
//! It keeps the tournament's schedule on disk, reports the current round and
//! starts the tournament on time without anyone having to be there.
//!
//! ## Threads
//!
//! * the caller, which talks to a [`daemon::Daemon`]
//! * the [`worker::Worker`], the only code that reads or writes the
//!   tournament and the status file, one [`task::Task`] at a time
//! * the [`watcher::EventWatcher`], which queues the start of the
//!   tournament once its start time passed
//!
//! ## Feature Flags
//!
//! By default the `smtp` feature flag is enabled.
//!
//! * smtp - mail an announcement when the tournament starts

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

pub mod announce;
pub mod clock;
pub mod config;
pub mod daemon;
pub mod error;
pub mod message;
pub mod persistence;
pub mod queue;
pub mod task;
pub mod tournament;
pub mod utils;
pub mod watcher;
pub mod worker;

pub const HOME: &str = "tournament-daemon";
pub const CONFIG_FILE: &str = "config.ron";
pub const STATUS_FILE: &str = "status.txt";

pub const COPYRIGHT: &str = r".SH COPYRIGHT
Copyright (C) 2025-2026 Developers of the tournament-daemon project

This program is free software: you can redistribute it and/or modify
it under the terms of the GNU Affero General Public License as published by
the Free Software Foundation, either version 3 of the License, or
(at your option) any later version.

This program is distributed in the hope that it will be useful,
but WITHOUT ANY WARRANTY; without even the implied warranty of
MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
GNU Affero General Public License for more details.

You should have received a copy of the GNU Affero General Public License
along with this program.  If not, see <https://www.gnu.org/licenses/>.
";

pub const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    "
Copyright (c) 2025 Developers of the tournament-daemon project
Licensed under the AGPLv3"
);
