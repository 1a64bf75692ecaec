//! Whole-batch entry point

use std::sync::Arc;

use anyhow::Result;
use serde_json::Value;
use tracing::{debug, warn};

use super::accounts::AccountCache;
use super::aggregator::ChangeSet;
use super::arn::Arn;
use super::classifiers::ClassifierRegistry;
use super::confirmation::{confirm_subscription, SnsClientBuilder};
use super::dispatcher::Dispatcher;
use super::event::str_at;
use super::submission::{submit_changes, InventoryApi, ScanQueue};

/// Turns batches of queue records into inventory deletes and poller scans
pub struct EventProcessor {
    registry: ClassifierRegistry,
    accounts: Arc<AccountCache>,
    inventory: Arc<dyn InventoryApi>,
    scans: Arc<dyn ScanQueue>,
    sns: Arc<dyn SnsClientBuilder>,
}

impl EventProcessor {
    pub fn new(
        accounts: Arc<AccountCache>,
        inventory: Arc<dyn InventoryApi>,
        scans: Arc<dyn ScanQueue>,
        sns: Arc<dyn SnsClientBuilder>,
    ) -> Self {
        Self {
            registry: ClassifierRegistry::new(),
            accounts,
            inventory,
            scans,
            sns,
        }
    }

    /// Process one batch of record bodies.
    ///
    /// Malformed records are logged and skipped. The batch fails as a whole
    /// when the account refresh, a subscription confirmation, the inventory
    /// delete or the scan queueing fails; the transport then redelivers it.
    pub async fn handle_batch<S: AsRef<str>>(&self, records: &[S]) -> Result<()> {
        self.accounts.ensure_fresh().await?;
        let accounts = self.accounts.snapshot().await;
        let dispatcher = Dispatcher::new(&self.registry, &accounts);

        let mut changes = ChangeSet::new();

        for record in records {
            let body = record.as_ref();
            let envelope: Value = serde_json::from_str(body).unwrap_or(Value::Null);

            match str_at(&envelope, "Type") {
                "Notification" => {
                    debug!("wrapped sns message - assuming cloudtrail is in Message field");
                    changes.extend(dispatcher.classify(str_at(&envelope, "Message")));
                }
                "SubscriptionConfirmation" => {
                    let topic_arn = match Arn::parse(str_at(&envelope, "TopicArn")) {
                        Ok(topic_arn) => topic_arn,
                        Err(e) => {
                            warn!(error = %e, "invalid confirmation arn");
                            continue;
                        }
                    };
                    let token = envelope.get("Token").and_then(Value::as_str);
                    confirm_subscription(&topic_arn, token, &accounts, self.sns.as_ref()).await?;
                }
                "" => changes.extend(dispatcher.classify_value(&envelope, body)),
                record_type => {
                    warn!(record_type, body, "unexpected record type");
                }
            }
        }

        submit_changes(changes, self.inventory.as_ref(), self.scans.as_ref()).await
    }
}
