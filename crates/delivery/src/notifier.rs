//! Subscriber notification over Telegram and webhooks.

use serde_json::json;
use signal_core::{Error, Result};
use tracing::{debug, warn};

use crate::retry::RetryPolicy;

/// A normalized notification target. Collaborator inputs of any shape
/// (bare chat-id strings, webhook objects) are converted to this record
/// at the boundary; nothing downstream inspects shape variants.
#[derive(Debug, Clone)]
pub struct Subscriber {
    /// Stable identifier used in delivery reports.
    pub id: String,
    pub channel: SubscriberChannel,
}

#[derive(Debug, Clone)]
pub enum SubscriberChannel {
    Telegram { chat_id: String },
    Webhook { url: String },
}

impl Subscriber {
    pub fn telegram(chat_id: &str) -> Self {
        Self {
            id: format!("telegram:{chat_id}"),
            channel: SubscriberChannel::Telegram {
                chat_id: chat_id.to_string(),
            },
        }
    }

    pub fn webhook(url: &str) -> Self {
        Self {
            id: format!("webhook:{url}"),
            channel: SubscriberChannel::Webhook {
                url: url.to_string(),
            },
        }
    }
}

/// Per-subscriber delivery outcome. One subscriber failing never blocks
/// the others.
#[derive(Debug, Clone)]
pub struct DeliveryReport {
    pub subscriber_id: String,
    pub delivered: bool,
    pub error: Option<String>,
}

/// Sends formatted backtest outcomes to subscribers.
pub struct SubscriberNotifier {
    client: reqwest::Client,
    telegram_bot_token: Option<String>,
    retry: RetryPolicy,
}

impl SubscriberNotifier {
    pub fn new(telegram_bot_token: Option<String>, retry: RetryPolicy) -> Self {
        Self {
            client: reqwest::Client::new(),
            telegram_bot_token,
            retry,
        }
    }

    /// Deliver `message` to every subscriber, collecting per-subscriber
    /// results. Failures are recorded, not propagated.
    pub async fn notify_all(
        &self,
        subscribers: &[Subscriber],
        message: &str,
    ) -> Vec<DeliveryReport> {
        let mut reports = Vec::with_capacity(subscribers.len());

        for subscriber in subscribers {
            let outcome = self
                .retry
                .run("notify_subscriber", || self.notify_one(subscriber, message))
                .await;

            match outcome {
                Ok(()) => {
                    debug!(subscriber = %subscriber.id, "notification delivered");
                    reports.push(DeliveryReport {
                        subscriber_id: subscriber.id.clone(),
                        delivered: true,
                        error: None,
                    });
                }
                Err(error) => {
                    warn!(subscriber = %subscriber.id, error = %error, "notification failed");
                    reports.push(DeliveryReport {
                        subscriber_id: subscriber.id.clone(),
                        delivered: false,
                        error: Some(error.to_string()),
                    });
                }
            }
        }

        reports
    }

    async fn notify_one(&self, subscriber: &Subscriber, message: &str) -> Result<()> {
        match &subscriber.channel {
            SubscriberChannel::Telegram { chat_id } => {
                let token = self.telegram_bot_token.as_ref().ok_or_else(|| {
                    Error::Delivery("telegram bot token not configured".to_string())
                })?;

                let url = format!("https://api.telegram.org/bot{token}/sendMessage");
                self.client
                    .post(&url)
                    .json(&json!({ "chat_id": chat_id, "text": message }))
                    .send()
                    .await?
                    .error_for_status()?;
            }
            SubscriberChannel::Webhook { url } => {
                self.client
                    .post(url)
                    .json(&json!({ "text": message }))
                    .send()
                    .await?
                    .error_for_status()?;
            }
        }

        Ok(())
    }
}
