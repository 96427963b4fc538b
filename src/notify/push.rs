//! Push Transport
//! 
//! Posts messages to an Expo-compatible push endpoint, one JSON array per batch,
//! with all batches in flight at once.

use async_trait::async_trait;
use futures::future::join_all;
use reqwest::Client;
use tracing::{debug, warn};

use super::{DispatchOutcome, NotificationDispatcher, PushMessage, DEFAULT_BATCH_SIZE};

pub struct PushDispatcher {
    client: Client,
    endpoint: String,
    batch_size: usize,
}

impl PushDispatcher {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.into(),
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    async fn post_batch(&self, batch: &[PushMessage]) -> anyhow::Result<()> {
        self.client
            .post(&self.endpoint)
            .header("Accept", "application/json")
            .header("Accept-Encoding", "gzip, deflate")
            .json(batch)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

#[async_trait]
impl NotificationDispatcher for PushDispatcher {
    async fn send_batch(&self, messages: Vec<PushMessage>) -> DispatchOutcome {
        if messages.is_empty() {
            return DispatchOutcome::default();
        }

        let batches: Vec<&[PushMessage]> = messages.chunks(self.batch_size).collect();
        debug!(messages = messages.len(), batches = batches.len(), "Sending push batches");

        let results = join_all(batches.iter().map(|batch| self.post_batch(batch))).await;

        batches
            .iter()
            .zip(results)
            .fold(DispatchOutcome::default(), |acc, (batch, result)| match result {
                Ok(()) => acc.merge(DispatchOutcome { sent: batch.len(), failed: 0 }),
                Err(e) => {
                    warn!(size = batch.len(), "Push batch failed: {:#}", e);
                    acc.merge(DispatchOutcome { sent: 0, failed: batch.len() })
                }
            })
    }
}
