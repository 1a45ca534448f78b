//! How the run outcome reaches the recipient

use crate::commands::Cli;
use crate::error::CliResult;
use autopay::{LogNotifier, MailAccount, Notifier, OutboxNotifier, PortalConfig, SmtpNotifier};
use std::path::PathBuf;

/// Notification delivery selected on the command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    /// Mail through an SMTP relay (default)
    Smtp {
        /// Relay host
        host: String,
    },
    /// JSON documents in a directory (`--outbox`)
    Outbox(PathBuf),
    /// Log only (`--log-only`)
    Log,
}

impl Delivery {
    /// Pick the delivery for this invocation
    #[must_use]
    pub fn select(cli: &Cli, config: &PortalConfig) -> Self {
        if cli.log_only {
            return Self::Log;
        }
        match &cli.outbox {
            Some(dir) => Self::Outbox(dir.clone()),
            None => Self::Smtp {
                host: config.mail.smtp_host.clone(),
            },
        }
    }

    /// Build the notifier, sending as `account`
    pub fn notifier(&self, account: &MailAccount) -> CliResult<Box<dyn Notifier>> {
        let notifier: Box<dyn Notifier> = match self {
            Self::Smtp { host } => Box::new(SmtpNotifier::relay(host, account)?),
            Self::Outbox(dir) => Box::new(OutboxNotifier::new(dir.clone(), account.username.clone())),
            Self::Log => Box::new(LogNotifier),
        };
        tracing::debug!(delivery = ?self, "notifier ready");
        Ok(notifier)
    }
}
