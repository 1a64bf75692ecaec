//! In-memory collaborators and log capture shared by the integration tests

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex};

use anyhow::{bail, Result};
use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer};
use tracing_subscriber::prelude::*;

use awsevents::app::event_processor::accounts::{AccountCache, Integration, IntegrationSource};
use awsevents::app::event_processor::confirmation::{SnsClientBuilder, SnsConfirmer};
use awsevents::app::event_processor::sqs_batch::{BatchMessage, BatchOutcome, MessageBatchSender, SqsScanQueue};
use awsevents::app::event_processor::submission::{InventoryApi, ScanQueue};
use awsevents::app::event_processor::types::{DeleteResources, ScanMsg};
use awsevents::EventProcessor;

pub const ACCOUNT: &str = "111111111111";
pub const INTEGRATION: &str = "ebb4d69f-177b-4eff-a7a6-9251fdc72d21";

pub struct StaticAccounts {
    pub fail: bool,
}

#[async_trait]
impl IntegrationSource for StaticAccounts {
    async fn list_integrations(&self) -> Result<Vec<Integration>> {
        if self.fail {
            bail!("snapshot-api timed out");
        }
        Ok(vec![
            Integration::new(ACCOUNT, INTEGRATION).with_label("TestAWS"),
            Integration::new("888888888888", "45c378a7-2e36-4b12-8e16-2d3c49ff1371").with_label("ProdAWS"),
        ])
    }
}

#[derive(Default)]
pub struct FakeInventory {
    pub deletes: Mutex<Vec<DeleteResources>>,
}

#[async_trait]
impl InventoryApi for FakeInventory {
    async fn delete_resources(&self, request: &DeleteResources) -> Result<()> {
        self.deletes.lock().unwrap().push(request.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeQueue {
    pub sent: Mutex<Vec<BTreeMap<i64, ScanMsg>>>,
}

#[async_trait]
impl ScanQueue for FakeQueue {
    async fn send_scans(&self, scans: &BTreeMap<i64, ScanMsg>) -> Result<()> {
        self.sent.lock().unwrap().push(scans.clone());
        Ok(())
    }
}

/// Records every SendMessageBatch request; never fails
#[derive(Default)]
pub struct RecordingSender {
    pub requests: Mutex<Vec<Vec<BatchMessage>>>,
}

#[async_trait]
impl MessageBatchSender for RecordingSender {
    async fn send_batch(&self, messages: &[BatchMessage]) -> Result<BatchOutcome> {
        self.requests.lock().unwrap().push(messages.to_vec());
        Ok(BatchOutcome {
            successful: messages.len(),
            failed_ids: Vec::new(),
        })
    }
}

#[derive(Default)]
pub struct FakeSns {
    pub confirmed: Arc<Mutex<Vec<(String, String, String)>>>,
    pub fail: bool,
}

struct FakeSnsClient {
    region: String,
    confirmed: Arc<Mutex<Vec<(String, String, String)>>>,
    fail: bool,
}

#[async_trait]
impl SnsConfirmer for FakeSnsClient {
    async fn confirm_subscription(&self, topic_arn: &str, token: &str) -> Result<Option<String>> {
        if self.fail {
            bail!("topic does not exist");
        }
        self.confirmed
            .lock()
            .unwrap()
            .push((self.region.clone(), topic_arn.to_string(), token.to_string()));
        Ok(Some(format!("{}:subscription", topic_arn)))
    }
}

#[async_trait]
impl SnsClientBuilder for FakeSns {
    async fn build(&self, region: &str) -> Result<Box<dyn SnsConfirmer>> {
        Ok(Box::new(FakeSnsClient {
            region: region.to_string(),
            confirmed: self.confirmed.clone(),
            fail: self.fail,
        }))
    }
}

pub struct Harness {
    pub processor: EventProcessor,
    pub inventory: Arc<FakeInventory>,
    pub queue: Arc<FakeQueue>,
    pub sns: Arc<FakeSns>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with(StaticAccounts { fail: false }, FakeSns::default())
    }

    pub fn with(accounts: StaticAccounts, sns: FakeSns) -> Self {
        let inventory = Arc::new(FakeInventory::default());
        let queue = Arc::new(FakeQueue::default());
        let sns = Arc::new(sns);
        let processor = EventProcessor::new(
            Arc::new(AccountCache::new(Arc::new(accounts))),
            inventory.clone(),
            queue.clone(),
            sns.clone(),
        );
        Self {
            processor,
            inventory,
            queue,
            sns,
        }
    }

    /// Harness whose scans go through the real SQS batching onto a recording sender
    pub fn with_sqs() -> (Self, Arc<RecordingSender>) {
        let sender = Arc::new(RecordingSender::default());
        let inventory = Arc::new(FakeInventory::default());
        let sns = Arc::new(FakeSns::default());
        let processor = EventProcessor::new(
            Arc::new(AccountCache::new(Arc::new(StaticAccounts { fail: false }))),
            inventory.clone(),
            Arc::new(SqsScanQueue::with_sender(sender.clone())),
            sns.clone(),
        );
        let harness = Self {
            processor,
            inventory,
            queue: Arc::new(FakeQueue::default()),
            sns,
        };
        (harness, sender)
    }
}

/// A direct-delivery CloudTrail event
pub fn cloudtrail_event(source: &str, name: &str, time: &str, request: Value, response: Value) -> Value {
    json!({
        "eventVersion": "1.05",
        "userIdentity": {"type": "AssumedRole", "accountId": ACCOUNT},
        "eventTime": time,
        "eventSource": source,
        "eventName": name,
        "awsRegion": "us-west-2",
        "sourceIPAddress": "10.0.0.1",
        "requestParameters": request,
        "responseElements": response,
        "eventType": "AwsApiCall",
        "recipientAccountId": ACCOUNT,
    })
}

pub fn s3_event(name: &str, bucket: &str, time: &str) -> Value {
    cloudtrail_event("s3.amazonaws.com", name, time, json!({"bucketName": bucket}), Value::Null)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedEvent {
    pub level: Level,
    pub message: String,
    pub fields: BTreeMap<String, String>,
}

#[derive(Default)]
struct FieldVisitor {
    message: String,
    fields: BTreeMap<String, String>,
}

impl Visit for FieldVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        } else {
            self.fields.insert(field.name().to_string(), value.to_string());
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{:?}", value);
        } else {
            self.fields.insert(field.name().to_string(), format!("{:?}", value));
        }
    }
}

/// Layer that keeps every event for later assertions
#[derive(Clone, Default)]
pub struct CaptureLayer {
    pub events: Arc<Mutex<Vec<CapturedEvent>>>,
}

impl<S: Subscriber> Layer<S> for CaptureLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);
        self.events.lock().unwrap().push(CapturedEvent {
            level: *event.metadata().level(),
            message: visitor.message,
            fields: visitor.fields,
        });
    }
}

impl CaptureLayer {
    /// Install as this thread's default subscriber until the guard drops
    pub fn install(&self) -> tracing::subscriber::DefaultGuard {
        tracing::subscriber::set_default(tracing_subscriber::registry().with(self.clone()))
    }

    pub fn find(&self, message: &str) -> Vec<CapturedEvent> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.message == message)
            .cloned()
            .collect()
    }
}
