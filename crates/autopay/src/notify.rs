//! Outcome notifications.
//!
//! A run sends at most one [`NotificationMessage`]. Delivery is behind the
//! [`Notifier`] trait. [`SmtpNotifier`] mails the message with its
//! screenshots attached; [`OutboxNotifier`] drops one JSON document per
//! message into a directory instead, and [`LogNotifier`] only logs it.

use crate::evidence::EvidenceTrail;
use crate::result::{PayError, PayResult};
use async_trait::async_trait;
use base64::Engine;
use chrono::{DateTime, Utc};
use lettre::message::header::ContentType;
use lettre::message::{Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials as SmtpCredentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// MIME type of screenshot attachments
pub const PNG_CONTENT_TYPE: &str = "image/png";

/// Account the notification is sent from
#[derive(Clone, PartialEq, Eq)]
pub struct MailAccount {
    /// Sender address / login
    pub username: String,
    password: String,
    /// Destination address
    pub to_address: String,
}

impl MailAccount {
    /// Create a mail account
    #[must_use]
    pub fn new(
        username: impl Into<String>,
        password: impl Into<String>,
        to_address: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            to_address: to_address.into(),
        }
    }

    /// Account password
    #[must_use]
    pub fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for MailAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MailAccount")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("to_address", &self.to_address)
            .finish()
    }
}

/// Base64-encoded file attached to a message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    /// File name shown to the recipient
    pub file_name: String,
    /// MIME type
    pub content_type: String,
    /// Standard base64 of the file bytes
    pub data_base64: String,
}

impl Attachment {
    /// Encode a PNG
    #[must_use]
    pub fn png(file_name: impl Into<String>, data: &[u8]) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: PNG_CONTENT_TYPE.to_string(),
            data_base64: base64::engine::general_purpose::STANDARD.encode(data),
        }
    }

    /// Decode the payload
    pub fn decode(&self) -> PayResult<Vec<u8>> {
        base64::engine::general_purpose::STANDARD
            .decode(&self.data_base64)
            .map_err(|e| PayError::notification(format!("bad attachment {}: {e}", self.file_name)))
    }
}

/// Final message of a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationMessage {
    /// Destination address
    pub to: String,
    /// Subject line
    pub subject: String,
    /// Plain-text body
    pub body: String,
    /// Screenshots, in capture order
    pub attachments: Vec<Attachment>,
}

impl NotificationMessage {
    /// Message without attachments
    #[must_use]
    pub fn new(to: impl Into<String>, subject: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            to: to.into(),
            subject: subject.into(),
            body: body.into(),
            attachments: Vec::new(),
        }
    }

    /// Attach every screenshot in `trail`
    #[must_use]
    pub fn with_evidence(mut self, trail: &EvidenceTrail) -> Self {
        self.attachments.extend(
            trail
                .items()
                .iter()
                .enumerate()
                .map(|(i, item)| Attachment::png(item.file_name(i), &item.screenshot.data)),
        );
        self
    }
}

/// Delivers notification messages
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver one message
    async fn send(&self, message: &NotificationMessage) -> PayResult<()>;
}

#[async_trait]
impl<T: Notifier + ?Sized> Notifier for Box<T> {
    async fn send(&self, message: &NotificationMessage) -> PayResult<()> {
        (**self).send(message).await
    }
}

/// Writes messages to the log only
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, message: &NotificationMessage) -> PayResult<()> {
        tracing::info!(
            to = %message.to,
            subject = %message.subject,
            attachments = message.attachments.len(),
            "{}",
            message.body
        );
        Ok(())
    }
}

/// JSON document written by [`OutboxNotifier`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboxDocument {
    /// Unique message id
    pub id: Uuid,
    /// When the document was written
    pub created_at: DateTime<Utc>,
    /// Sending account
    pub from: String,
    /// The message itself
    pub message: NotificationMessage,
}

/// Drops one JSON document per message into a directory
#[derive(Debug, Clone)]
pub struct OutboxNotifier {
    dir: PathBuf,
    from: String,
}

impl OutboxNotifier {
    /// Outbox in `dir`, sending as `from`
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>, from: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            from: from.into(),
        }
    }

    /// Outbox directory
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl Notifier for OutboxNotifier {
    async fn send(&self, message: &NotificationMessage) -> PayResult<()> {
        let document = OutboxDocument {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            from: self.from.clone(),
            message: message.clone(),
        };
        let file_name = format!(
            "{}-{}.json",
            document.created_at.format("%Y%m%dT%H%M%SZ"),
            document.id
        );
        let path = self.dir.join(file_name);

        tokio::fs::create_dir_all(&self.dir).await?;
        let json = serde_json::to_vec_pretty(&document)?;
        tokio::fs::write(&path, json).await?;

        tracing::info!(path = %path.display(), to = %message.to, "notification queued");
        Ok(())
    }
}

/// Sends messages over SMTP
///
/// The default transport is an implicit-TLS relay authenticated with the
/// sending [`MailAccount`]; any lettre [`AsyncTransport`] can stand in.
pub struct SmtpNotifier<T = AsyncSmtpTransport<Tokio1Executor>> {
    transport: T,
    from: Mailbox,
}

impl SmtpNotifier {
    /// Relay through `host`, logging in as `account`
    pub fn relay(host: &str, account: &MailAccount) -> PayResult<Self> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(host)
            .map_err(|e| PayError::notification(format!("bad SMTP relay {host}: {e}")))?
            .credentials(SmtpCredentials::new(
                account.username.clone(),
                account.password().to_string(),
            ))
            .build();
        Self::with_transport(transport, &account.username)
    }
}

impl<T> SmtpNotifier<T> {
    /// Send through `transport` as `from`
    pub fn with_transport(transport: T, from: &str) -> PayResult<Self> {
        Ok(Self {
            transport,
            from: parse_mailbox(from)?,
        })
    }

    /// Sending mailbox
    #[must_use]
    pub const fn sender(&self) -> &Mailbox {
        &self.from
    }

    /// Build the MIME message: plain body first, then one part per attachment
    pub fn build_email(&self, message: &NotificationMessage) -> PayResult<Message> {
        let mut parts = MultiPart::mixed().singlepart(SinglePart::plain(message.body.clone()));
        for attachment in &message.attachments {
            let content_type = ContentType::parse(&attachment.content_type).map_err(|e| {
                PayError::notification(format!("bad content type {}: {e}", attachment.content_type))
            })?;
            parts = parts.singlepart(
                lettre::message::Attachment::new(attachment.file_name.clone())
                    .body(attachment.decode()?, content_type),
            );
        }

        Message::builder()
            .from(self.from.clone())
            .to(parse_mailbox(&message.to)?)
            .subject(message.subject.clone())
            .multipart(parts)
            .map_err(|e| PayError::notification(format!("cannot build message: {e}")))
    }
}

impl<T> fmt::Debug for SmtpNotifier<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmtpNotifier")
            .field("from", &self.from.to_string())
            .finish_non_exhaustive()
    }
}

fn parse_mailbox(address: &str) -> PayResult<Mailbox> {
    address
        .trim()
        .parse()
        .map_err(|e| PayError::notification(format!("bad mail address {address:?}: {e}")))
}

#[async_trait]
impl<T> Notifier for SmtpNotifier<T>
where
    T: AsyncTransport + Send + Sync,
    T::Error: fmt::Display,
{
    async fn send(&self, message: &NotificationMessage) -> PayResult<()> {
        let email = self.build_email(message)?;
        self.transport
            .send(email)
            .await
            .map_err(|e| PayError::notification(format!("mail delivery failed: {e}")))?;
        tracing::info!(
            to = %message.to,
            attachments = message.attachments.len(),
            "notification mailed"
        );
        Ok(())
    }
}
