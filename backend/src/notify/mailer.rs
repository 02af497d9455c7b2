use crate::notify::OutgoingMail;
use async_trait::async_trait;
use chrono::Utc;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("could not write message: {0}")]
    Io(#[from] std::io::Error),
    #[error("recipient rejected: {0}")]
    Rejected(String),
}

/// Final delivery step behind the notification queue.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn deliver(&self, mail: &OutgoingMail) -> Result<(), MailError>;
}

/// Writes the message to the log only. Used when no outbox is configured.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn deliver(&self, mail: &OutgoingMail) -> Result<(), MailError> {
        log::info!(
            "[mail] to={} <{}> subject={:?} ({} bytes)",
            mail.recipient_name,
            mail.to,
            mail.subject,
            mail.body_html.len()
        );
        Ok(())
    }
}

/// Drops each message as an `.html` file into a directory picked up by the mail relay.
pub struct OutboxMailer {
    dir: PathBuf,
}

impl OutboxMailer {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl Mailer for OutboxMailer {
    async fn deliver(&self, mail: &OutgoingMail) -> Result<(), MailError> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let file_name = format!(
            "{}-{}.html",
            Utc::now().format("%Y%m%dT%H%M%S%3f"),
            uuid::Uuid::new_v4()
        );
        let document = format!(
            "<!--\nTo: {} <{}>\nSubject: {}\n-->\n{}\n",
            mail.recipient_name, mail.to, mail.subject, mail.body_html
        );
        tokio::fs::write(self.dir.join(file_name), document).await?;
        Ok(())
    }
}
