//! Batched SQS sends with paging and retry of failed entries
//!
//! SendMessageBatch takes at most 10 messages and 262144 bytes per request.
//! Entries that SQS reports as failed are retried with exponential backoff
//! until the page's elapsed-time limit runs out; a request-level error is
//! permanent. Each page gets its own limit.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use aws_sdk_sqs as sqs;
use aws_sdk_sqs::types::SendMessageBatchRequestEntry;
use tokio::time::{sleep, Instant};
use tracing::{debug, error, info, warn};

use super::submission::ScanQueue;
use super::types::ScanMsg;

pub const MAX_MESSAGES: usize = 10;

/// Kept under the 262144 byte limit to leave room for request overhead
pub const MAX_BYTES: usize = 260_000;

/// SQS refuses per-message delays above 15 minutes
pub const MAX_DELAY_SECONDS: i64 = 900;

pub const DEFAULT_MAX_ELAPSED: Duration = Duration::from_secs(30);

const INITIAL_BACKOFF: Duration = Duration::from_millis(500);
const MAX_BACKOFF: Duration = Duration::from_secs(10);

/// One SendMessageBatch entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchMessage {
    /// Unique within one request
    pub id: String,
    pub body: String,
    pub delay_seconds: i32,
}

/// Result of one SendMessageBatch request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    pub successful: usize,
    pub failed_ids: Vec<String>,
}

/// Issues a single SendMessageBatch request
#[async_trait]
pub trait MessageBatchSender: Send + Sync {
    async fn send_batch(&self, messages: &[BatchMessage]) -> Result<BatchOutcome>;
}

/// SendMessageBatch against one queue
pub struct SqsBatchSender {
    client: sqs::Client,
    queue_url: String,
}

impl SqsBatchSender {
    pub fn new(client: sqs::Client, queue_url: impl Into<String>) -> Self {
        Self {
            client,
            queue_url: queue_url.into(),
        }
    }
}

#[async_trait]
impl MessageBatchSender for SqsBatchSender {
    async fn send_batch(&self, messages: &[BatchMessage]) -> Result<BatchOutcome> {
        let entries = messages
            .iter()
            .map(|message| {
                SendMessageBatchRequestEntry::builder()
                    .id(&message.id)
                    .message_body(&message.body)
                    .delay_seconds(message.delay_seconds)
                    .build()
            })
            .collect::<Result<Vec<_>, _>>()
            .context("invalid sqs batch entry")?;

        let output = self
            .client
            .send_message_batch()
            .queue_url(&self.queue_url)
            .set_entries(Some(entries))
            .send()
            .await
            .with_context(|| format!("sqs.SendMessageBatch to {} failed", self.queue_url))?;

        Ok(BatchOutcome {
            successful: output.successful().len(),
            failed_ids: output.failed().iter().map(|f| f.id().to_string()).collect(),
        })
    }
}

/// Split messages into requests under both the count and the byte limit
pub fn paginate(messages: Vec<BatchMessage>) -> Vec<Vec<BatchMessage>> {
    let mut pages = Vec::new();
    let mut current: Vec<BatchMessage> = Vec::with_capacity(MAX_MESSAGES);
    let mut current_bytes = 0;

    for message in messages {
        let size = message.body.len();
        if !current.is_empty() && (current.len() == MAX_MESSAGES || current_bytes + size >= MAX_BYTES) {
            pages.push(std::mem::replace(&mut current, Vec::with_capacity(MAX_MESSAGES)));
            current_bytes = 0;
        }
        current_bytes += size;
        current.push(message);
    }

    if !current.is_empty() {
        pages.push(current);
    }
    pages
}

/// Send every message, retrying only the entries SQS rejected
pub async fn send_message_batch(
    sender: &dyn MessageBatchSender,
    max_elapsed: Duration,
    messages: Vec<BatchMessage>,
) -> Result<()> {
    let total = messages.len();
    info!(total_entries = total, "starting sqsbatch.SendMessageBatch");
    let start = Instant::now();
    let mut sent = 0;

    for page in paginate(messages) {
        if let Err(e) = send_page(sender, page, max_elapsed, &mut sent).await {
            error!(
                sent_message_count = sent,
                failed_message_count = total - sent,
                error = %e,
                "SendMessageBatch permanently failed"
            );
            return Err(e);
        }
    }

    info!(duration_ms = start.elapsed().as_millis() as u64, "SendMessageBatch successful");
    Ok(())
}

async fn send_page(
    sender: &dyn MessageBatchSender,
    mut pending: Vec<BatchMessage>,
    max_elapsed: Duration,
    sent: &mut usize,
) -> Result<()> {
    let deadline = Instant::now() + max_elapsed;
    let mut backoff = INITIAL_BACKOFF;

    loop {
        debug!(entries = pending.len(), "invoking sqs.SendMessageBatch");
        let outcome = sender.send_batch(&pending).await?;
        *sent += outcome.successful;

        if outcome.failed_ids.is_empty() {
            return Ok(());
        }

        let err = anyhow!("{} unprocessed items", outcome.failed_ids.len());
        warn!(error = %err, backoff_ms = backoff.as_millis() as u64, "backoff: batch send failed");
        pending.retain(|message| outcome.failed_ids.contains(&message.id));

        if Instant::now() + backoff > deadline {
            return Err(err);
        }
        sleep(backoff).await;
        backoff = (backoff * 2).min(MAX_BACKOFF);
    }
}

/// Poller queue backed by SQS
pub struct SqsScanQueue {
    sender: Arc<dyn MessageBatchSender>,
    max_elapsed: Duration,
}

impl SqsScanQueue {
    pub fn new(client: sqs::Client, queue_url: impl Into<String>) -> Self {
        Self::with_sender(Arc::new(SqsBatchSender::new(client, queue_url)))
    }

    pub fn with_sender(sender: Arc<dyn MessageBatchSender>) -> Self {
        Self {
            sender,
            max_elapsed: DEFAULT_MAX_ELAPSED,
        }
    }

    pub fn with_max_elapsed(mut self, max_elapsed: Duration) -> Self {
        self.max_elapsed = max_elapsed;
        self
    }
}

/// One message per delay bucket, keyed by the delay itself
pub fn scan_messages(scans: &BTreeMap<i64, ScanMsg>) -> Result<Vec<BatchMessage>> {
    scans
        .iter()
        .map(|(delay, request)| {
            let body = serde_json::to_string(request).map_err(|e| {
                error!(error = %e, "resource queueing failed: json marshal");
                anyhow::Error::new(e)
            })?;
            Ok(BatchMessage {
                id: delay.to_string(),
                body,
                delay_seconds: (*delay).clamp(0, MAX_DELAY_SECONDS) as i32,
            })
        })
        .collect()
}

#[async_trait]
impl ScanQueue for SqsScanQueue {
    async fn send_scans(&self, scans: &BTreeMap<i64, ScanMsg>) -> Result<()> {
        let messages = scan_messages(scans)?;
        send_message_batch(self.sender.as_ref(), self.max_elapsed, messages).await
    }
}
