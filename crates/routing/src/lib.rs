//! Router & Notifier
//!
//! Maps alerts to delivery channels and formatted messages using ordered
//! routing rules, and owns the channel notifier implementations.

mod channel;
mod router;
mod template;

pub use channel::{
    ChatNotifier, EmailNotifier, Notifier, NotifyError, SmsNotifier, WebhookNotifier,
};
pub use router::{BusinessHours, DispatchOutcome, Router, RoutingRule};
pub use template::{format_duration, MessageTemplate};
