//! Notification Dispatch
//! 
//! Push messages addressed to workers' registered devices. Delivery is best
//! effort: dispatchers report how many messages went out and how many did not,
//! and never fail the caller.

mod push;
mod recording;

pub use push::PushDispatcher;
pub use recording::{LogDispatcher, RecordingDispatcher};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::model::Recipient;

/// Messages per request to the push transport
pub const DEFAULT_BATCH_SIZE: usize = 100;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PushMessage {
    pub to: String,
    pub title: String,
    pub body: String,
    pub data: Value,
    pub sound: String,
    pub priority: String,
}

/// Builds one message per recipient.
pub fn build_messages(recipients: &[Recipient], title: &str, body: &str, data: Value) -> Vec<PushMessage> {
    recipients
        .iter()
        .map(|r| PushMessage {
            to: r.notification_address.clone(),
            title: title.to_string(),
            body: body.to_string(),
            data: data.clone(),
            sound: "default".to_string(),
            priority: "high".to_string(),
        })
        .collect()
}

/// Result of one `send_batch` call
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DispatchOutcome {
    pub sent: usize,
    pub failed: usize,
}

impl DispatchOutcome {
    pub fn merge(self, other: DispatchOutcome) -> Self {
        Self {
            sent: self.sent + other.sent,
            failed: self.failed + other.failed,
        }
    }
}

#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    /// Delivers `messages`, batching internally. Failures are counted, not raised.
    async fn send_batch(&self, messages: Vec<PushMessage>) -> DispatchOutcome;
}

/// What happened to the notifications of one job run.
///
/// Carried next to the job's primary result; a failed lookup or delivery never
/// turns a successful job into an error.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct NotificationOutcome {
    pub recipients: usize,
    pub sent: usize,
    pub failed: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lookup_error: Option<String>,
}

impl NotificationOutcome {
    pub fn delivered(recipients: usize, outcome: DispatchOutcome) -> Self {
        Self {
            recipients,
            sent: outcome.sent,
            failed: outcome.failed,
            lookup_error: None,
        }
    }

    pub fn lookup_failed(error: &anyhow::Error) -> Self {
        Self {
            lookup_error: Some(format!("{:#}", error)),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_build_messages() {
        let recipients = vec![
            Recipient { worker_id: "w1".into(), notification_address: "ExponentPushToken[a]".into() },
            Recipient { worker_id: "w2".into(), notification_address: "ExponentPushToken[b]".into() },
        ];
        let messages = build_messages(&recipients, "Title", "Body", json!({ "screen": "inventory" }));

        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1].to, "ExponentPushToken[b]");
        assert_eq!(messages[0].priority, "high");
        assert_eq!(messages[0].data["screen"], "inventory");
    }

    #[test]
    fn test_outcome_serialization_omits_missing_error() {
        let outcome = NotificationOutcome::delivered(2, DispatchOutcome { sent: 2, failed: 0 });
        let value = serde_json::to_value(&outcome).unwrap();
        assert!(value.get("lookup_error").is_none());
        assert_eq!(value["sent"], 2);
    }
}
