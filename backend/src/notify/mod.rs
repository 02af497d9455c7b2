//! Fire-and-forget outbound notifications.
//!
//! The pieces mirror a small job queue:
//! - [`Notifier`]: a clonable handle injected into the lifecycle. `send` only enqueues
//!   and never reports failure to its caller.
//! - [`OutgoingMail`]: the message pushed through the channel.
//! - [`start_dispatcher`]: a long-running task spawned from `main.rs` that drains the
//!   channel and hands each message to a [`Mailer`], logging the outcome.

pub mod mailer;
pub mod messages;

pub use mailer::{LogMailer, MailError, Mailer, OutboxMailer};

use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

/// Capacity of the notification queue.
pub const QUEUE_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMail {
    pub to: String,
    pub recipient_name: String,
    pub subject: String,
    pub body_html: String,
}

#[derive(Clone)]
pub struct Notifier {
    tx: mpsc::Sender<OutgoingMail>,
}

impl Notifier {
    /// Creates the handle together with the receiving end for [`start_dispatcher`].
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<OutgoingMail>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }

    /// Queues `mail` for delivery. A full or closed queue drops the message with a log line.
    pub fn send(&self, mail: OutgoingMail) {
        match self.tx.try_send(mail) {
            Ok(()) => {}
            Err(TrySendError::Full(mail)) => {
                log::warn!(
                    "Notification queue full, dropping '{}' for {}",
                    mail.subject,
                    mail.to
                );
            }
            Err(TrySendError::Closed(mail)) => {
                log::warn!(
                    "Notification dispatcher stopped, dropping '{}' for {}",
                    mail.subject,
                    mail.to
                );
            }
        }
    }
}

/// Delivers queued notifications until every [`Notifier`] handle is dropped.
pub async fn start_dispatcher(mailer: Arc<dyn Mailer>, mut rx: mpsc::Receiver<OutgoingMail>) {
    while let Some(mail) = rx.recv().await {
        match mailer.deliver(&mail).await {
            Ok(()) => log::info!("Sent '{}' to {}", mail.subject, mail.to),
            Err(e) => log::error!("Error sending '{}' to {}: {}", mail.subject, mail.to, e),
        }
    }
    log::debug!("Notification dispatcher stopped");
}
