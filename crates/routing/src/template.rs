//! Message Templates

use alerting::Alert;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// A per-channel message template with `{placeholder}` substitution.
///
/// Supported placeholders: `{severity}`, `{rule}`, `{value}`, `{threshold}`,
/// `{duration}`, `{labels}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageTemplate {
    /// Title line
    pub title: String,
    /// Body text
    pub body: String,
}

impl MessageTemplate {
    /// Render the template against an alert
    pub fn render(&self, alert: &Alert, now: DateTime<Utc>) -> (String, String) {
        let labels = alert
            .labels
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join(", ");
        let duration = format_duration(alert.elapsed(now));

        let substitute = |text: &str| {
            text.replace("{severity}", alert.severity.as_str())
                .replace("{rule}", &alert.rule_name)
                .replace("{value}", &format!("{:.2}", alert.metric_value))
                .replace("{threshold}", &format!("{:.2}", alert.threshold))
                .replace("{duration}", &duration)
                .replace("{labels}", &labels)
        };

        (substitute(&self.title), substitute(&self.body))
    }
}

/// Format an elapsed duration as `Xh Ym`, `Xm Ys`, or `Xs`
pub fn format_duration(elapsed: Duration) -> String {
    let secs = elapsed.num_seconds().max(0);
    if secs >= 3600 {
        format!("{}h {}m", secs / 3600, (secs % 3600) / 60)
    } else if secs >= 60 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{secs}s")
    }
}
