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

#![deny(clippy::expect_used)]
#![deny(clippy::indexing_slicing)]
#![deny(clippy::panic)]
#![deny(clippy::unwrap_used)]

mod command_line;
mod tests;

use std::{
    io::{self, BufRead},
    process::exit,
    sync::Arc,
    thread,
};

use clap::Parser;
use log::{error, info};
use tournament_daemon::{
    announce::{Announcer, LogAnnouncer},
    clock::SystemClock,
    config::Config,
    daemon::Daemon,
    error::DaemonError,
    message::{self, Message},
    utils,
};

use crate::command_line::Args;

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    utils::init_logger(args.debug, args.systemd);

    if args.man {
        return Args::generate_man_page();
    }

    let data_folder = utils::data_folder();
    let config = args.config(&data_folder)?;
    let options = args.options(&config, &data_folder)?;
    if let Some(status_file) = &options.status_file {
        info!("saving to {}", status_file.display());
    }

    let daemon = Arc::new(Daemon::start(
        options,
        Arc::new(SystemClock),
        announcer(&config),
    )?);

    let daemon_ctrlc = daemon.clone();
    let systemd = args.systemd;
    ctrlc::set_handler(move || {
        if !systemd {
            println!();
        }

        match daemon_ctrlc.save() {
            Ok(()) | Err(DaemonError::NotFound) => {}
            Err(error) => error!("save: {error}"),
        }
        exit(0);
    })?;

    if args.headless {
        info!("running headless");
        loop {
            thread::park();
        }
    }

    read_commands(&daemon)
}

fn read_commands(daemon: &Daemon) -> anyhow::Result<()> {
    let stdin = io::stdin();
    let mut buffer = String::new();

    loop {
        buffer.clear();
        if stdin.lock().read_line(&mut buffer)? == 0 {
            return Ok(());
        }

        match buffer.parse::<Message>() {
            Ok(Message::Quit) => return Ok(()),
            Ok(message) => match message::update(daemon, message) {
                Ok(Some(reply)) => println!("= {reply}"),
                Ok(None) => {}
                Err(error) => println!("? {error}"),
            },
            Err(error) => println!("? {error}"),
        }
    }
}

#[cfg(feature = "smtp")]
fn announcer(config: &Config) -> Box<dyn Announcer> {
    match &config.smtp {
        Some(smtp) => Box::new(tournament_daemon::announce::SmtpAnnouncer::new(smtp.clone())),
        None => Box::new(LogAnnouncer),
    }
}

#[cfg(not(feature = "smtp"))]
fn announcer(config: &Config) -> Box<dyn Announcer> {
    if config.smtp.is_some() {
        error!("smtp is configured, but this build has no smtp support");
    }

    Box::new(LogAnnouncer)
}
