//! Status resolution and chat delivery.
//!
//! The [`Notifier`] owns the dedup cache: a message identical to the last one
//! successfully delivered on the same slot (status or error) is never sent
//! again. Delivery failures are logged and never propagate out of here.
use async_trait::async_trait;
use std::sync::Arc;
use teloxide::prelude::*;
use teloxide::types::{ChatId, Recipient};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::model::{AssignmentRecord, NotificationCache};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeliveryError {
    #[error("chat is unreachable: {reason}")]
    Unreachable { reason: String },
}

/// Delivers plain text to the configured chat.
#[async_trait]
pub trait MessageSink: Send + Sync {
    async fn deliver(&self, text: &str) -> Result<(), DeliveryError>;
}

pub struct TelegramSink {
    bot: Bot,
    chat: Recipient,
}

impl TelegramSink {
    pub fn new(bot: Bot, chat_id: &str) -> Self {
        Self {
            bot,
            chat: parse_recipient(chat_id),
        }
    }
}

/// Numeric ids address a chat directly; anything else is a `@channel` username.
pub fn parse_recipient(chat_id: &str) -> Recipient {
    let trimmed = chat_id.trim();
    match trimmed.parse::<i64>() {
        Ok(id) => Recipient::Id(ChatId(id)),
        Err(_) => Recipient::ChannelUsername(trimmed.to_string()),
    }
}

#[async_trait]
impl MessageSink for TelegramSink {
    async fn deliver(&self, text: &str) -> Result<(), DeliveryError> {
        self.bot
            .send_message(self.chat.clone(), text)
            .await
            .map(|_| ())
            .map_err(|err| DeliveryError::Unreachable {
                reason: err.to_string(),
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    Sent,
    /// Same content as the last delivered message on this slot.
    Suppressed,
    Failed,
}

pub struct Notifier {
    sink: Arc<dyn MessageSink>,
    cache: NotificationCache,
}

impl Notifier {
    pub fn new(sink: Arc<dyn MessageSink>) -> Self {
        Self::with_cache(sink, NotificationCache::default())
    }

    pub fn with_cache(sink: Arc<dyn MessageSink>, cache: NotificationCache) -> Self {
        Self { sink, cache }
    }

    pub fn cache(&self) -> &NotificationCache {
        &self.cache
    }

    pub fn set_cache(&mut self, cache: NotificationCache) {
        self.cache = cache;
    }

    /// Notify about the newest record only. `None` when there is nothing to report.
    pub async fn resolve(&mut self, records: &[AssignmentRecord]) -> Option<SendOutcome> {
        let latest = records.first()?;
        let message = latest.status_message();
        Some(self.notify_status(&message).await)
    }

    pub async fn notify_status(&mut self, message: &str) -> SendOutcome {
        if self.cache.last_status.as_deref() == Some(message) {
            debug!("status unchanged since last delivery; not sending");
            return SendOutcome::Suppressed;
        }
        match self.sink.deliver(message).await {
            Ok(()) => {
                self.cache.last_status = Some(message.to_owned());
                info!("status message sent");
                SendOutcome::Sent
            }
            Err(err) => {
                warn!(%err, "failed to send status message");
                self.report_error(&format!("Failed to send message: {err}"))
                    .await;
                SendOutcome::Failed
            }
        }
    }

    pub async fn report_error(&mut self, message: &str) -> SendOutcome {
        if self.cache.last_error.as_deref() == Some(message) {
            debug!(error = message, "error already reported; not sending again");
            return SendOutcome::Suppressed;
        }
        match self.sink.deliver(message).await {
            Ok(()) => {
                self.cache.last_error = Some(message.to_owned());
                info!("error message sent");
                SendOutcome::Sent
            }
            Err(err) => {
                warn!(%err, error = message, "failed to send error message");
                SendOutcome::Failed
            }
        }
    }
}
