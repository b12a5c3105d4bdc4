//! Notification Channels
//!
//! The `Notifier` trait is the seam to the external delivery transports.
//! The stock implementations here record the delivery through tracing; the
//! actual SMTP/SMS-gateway/webhook plumbing lives outside this core.

use alerting::ChannelKind;
use thiserror::Error;
use tracing::info;

/// Per-channel delivery error
#[derive(Debug, Error)]
pub enum NotifyError {
    /// No notifier registered for the channel
    #[error("No notifier registered for channel {0}")]
    UnknownChannel(&'static str),

    /// Transport-level failure
    #[error("Delivery via {channel} failed: {reason}")]
    Delivery { channel: &'static str, reason: String },
}

/// A delivery transport for one channel kind
pub trait Notifier: Send + Sync {
    /// The channel this notifier serves
    fn kind(&self) -> ChannelKind;

    /// Deliver one message
    fn send(&self, title: &str, body: &str) -> Result<(), NotifyError>;
}

/// Email delivery seam
pub struct EmailNotifier {
    /// Sender address
    pub from: String,
    /// Recipient list
    pub recipients: Vec<String>,
}

impl Notifier for EmailNotifier {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Email
    }

    fn send(&self, title: &str, body: &str) -> Result<(), NotifyError> {
        info!(
            channel = "email",
            from = %self.from,
            recipients = self.recipients.len(),
            title,
            body_len = body.len(),
            "notification dispatched"
        );
        Ok(())
    }
}

/// SMS delivery seam
pub struct SmsNotifier {
    /// Destination numbers
    pub numbers: Vec<String>,
}

impl Notifier for SmsNotifier {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Sms
    }

    fn send(&self, title: &str, _body: &str) -> Result<(), NotifyError> {
        // SMS carries the title only; bodies are for the long-form channels
        info!(channel = "sms", numbers = self.numbers.len(), title, "notification dispatched");
        Ok(())
    }
}

/// Chat webhook seam (Slack-style incoming webhook)
pub struct ChatNotifier {
    /// Incoming webhook URL
    pub webhook_url: String,
}

impl Notifier for ChatNotifier {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Chat
    }

    fn send(&self, title: &str, body: &str) -> Result<(), NotifyError> {
        info!(channel = "chat", url = %self.webhook_url, title, body_len = body.len(), "notification dispatched");
        Ok(())
    }
}

/// Generic webhook seam
pub struct WebhookNotifier {
    /// Endpoint URL
    pub url: String,
}

impl Notifier for WebhookNotifier {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Webhook
    }

    fn send(&self, title: &str, body: &str) -> Result<(), NotifyError> {
        let payload = serde_json::json!({ "title": title, "body": body });
        info!(channel = "webhook", url = %self.url, payload = %payload, "notification dispatched");
        Ok(())
    }
}
