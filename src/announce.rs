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

use log::info;

#[cfg(feature = "smtp")]
use lettre::{
    SmtpTransport, Transport,
    message::{Mailbox, header::ContentType},
    transport::smtp::authentication::Credentials,
};

#[cfg(feature = "smtp")]
use crate::config::Smtp;

/// Tells the community that a tournament started.
///
/// Only ever called from the worker, a failure is logged and nothing else.
pub trait Announcer: Send {
    /// # Errors
    ///
    /// If the announcement could not be posted.
    fn post_announcement(&self, tournament_name: &str) -> anyhow::Result<()>;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct LogAnnouncer;

impl Announcer for LogAnnouncer {
    fn post_announcement(&self, tournament_name: &str) -> anyhow::Result<()> {
        info!("The {tournament_name} has started!");
        Ok(())
    }
}

#[cfg(feature = "smtp")]
#[derive(Clone, Debug)]
pub struct SmtpAnnouncer {
    smtp: Smtp,
}

#[cfg(feature = "smtp")]
impl SmtpAnnouncer {
    #[must_use]
    pub fn new(smtp: Smtp) -> Self {
        Self { smtp }
    }
}

#[cfg(feature = "smtp")]
impl Announcer for SmtpAnnouncer {
    fn post_announcement(&self, tournament_name: &str) -> anyhow::Result<()> {
        let from: Mailbox = self.smtp.from.parse()?;
        let mut email = lettre::Message::builder()
            .from(from)
            .subject(format!("The {tournament_name} has started"))
            .header(ContentType::TEXT_PLAIN);

        for to in &self.smtp.to {
            let to: Mailbox = to.parse()?;
            email = email.bcc(to);
        }

        let email = email.body(format!(
            "The {tournament_name} has started! Round 1 is under way, good luck to everyone."
        ))?;

        let credentials = Credentials::new(self.smtp.username.clone(), self.smtp.password.clone());
        let mailer = SmtpTransport::relay(&self.smtp.service)?
            .credentials(credentials)
            .build();

        mailer.send(&email)?;
        info!("announced the {tournament_name} to {} addresses", self.smtp.to.len());

        Ok(())
    }
}
