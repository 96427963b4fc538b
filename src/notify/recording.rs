//! In-process dispatchers: one logs instead of sending (dry runs), one records
//! what it was given (tests).

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;
use tracing::info;

use super::{DispatchOutcome, NotificationDispatcher, PushMessage};

#[derive(Default)]
pub struct LogDispatcher;

#[async_trait]
impl NotificationDispatcher for LogDispatcher {
    async fn send_batch(&self, messages: Vec<PushMessage>) -> DispatchOutcome {
        for message in &messages {
            info!(to = %message.to, title = %message.title, "[dry-run] {}", message.body);
        }
        DispatchOutcome { sent: messages.len(), failed: 0 }
    }
}

/// Keeps every `send_batch` call; can be told to fail delivery.
pub struct RecordingDispatcher {
    calls: Mutex<Vec<Vec<PushMessage>>>,
    fail_delivery: AtomicBool,
}

impl RecordingDispatcher {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            fail_delivery: AtomicBool::new(false),
        }
    }

    pub fn set_fail_delivery(&self, fail: bool) {
        self.fail_delivery.store(fail, Ordering::SeqCst);
    }

    /// Messages passed to each `send_batch` call, in call order
    pub async fn calls(&self) -> Vec<Vec<PushMessage>> {
        self.calls.lock().await.clone()
    }

    pub async fn messages(&self) -> Vec<PushMessage> {
        self.calls.lock().await.iter().flatten().cloned().collect()
    }
}

impl Default for RecordingDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NotificationDispatcher for RecordingDispatcher {
    async fn send_batch(&self, messages: Vec<PushMessage>) -> DispatchOutcome {
        let total = messages.len();
        self.calls.lock().await.push(messages);

        if self.fail_delivery.load(Ordering::SeqCst) {
            return DispatchOutcome { sent: 0, failed: total };
        }
        DispatchOutcome { sent: total, failed: 0 }
    }
}
