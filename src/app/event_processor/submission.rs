//! Hand-off of de-duplicated changes to the inventory API and the poller queue

use std::collections::BTreeMap;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use tracing::{error, info};
use url::Url;

use super::aggregator::ChangeSet;
use super::types::{DeleteResources, ScanMsg};

/// Resources API bulk operations
#[async_trait]
pub trait InventoryApi: Send + Sync {
    /// Mark the given resources deleted in inventory
    async fn delete_resources(&self, request: &DeleteResources) -> Result<()>;
}

/// Snapshot poller request queue
#[async_trait]
pub trait ScanQueue: Send + Sync {
    /// Queue one message per delay bucket, delivered after that many seconds
    async fn send_scans(&self, scans: &BTreeMap<i64, ScanMsg>) -> Result<()>;
}

/// Resources API over HTTP
pub struct HttpInventoryClient {
    client: reqwest::Client,
    delete_url: Url,
}

impl HttpInventoryClient {
    pub fn new(resources_api_url: &str) -> Result<Self> {
        let delete_url = Url::parse(&format!("{}/delete", resources_api_url.trim_end_matches('/')))
            .with_context(|| format!("invalid resources api url: {}", resources_api_url))?;

        Ok(Self {
            client: reqwest::Client::new(),
            delete_url,
        })
    }

    pub fn delete_url(&self) -> &Url {
        &self.delete_url
    }
}

#[async_trait]
impl InventoryApi for HttpInventoryClient {
    async fn delete_resources(&self, request: &DeleteResources) -> Result<()> {
        let response = self
            .client
            .post(self.delete_url.clone())
            .json(request)
            .send()
            .await
            .with_context(|| format!("POST {} failed", self.delete_url))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("POST {} returned {}: {}", self.delete_url, status, body);
        }
        Ok(())
    }
}

/// Send deletes to the inventory API, then queue the scans. Either failing fails the batch.
pub async fn submit_changes(
    changes: ChangeSet,
    inventory: &dyn InventoryApi,
    queue: &dyn ScanQueue,
) -> Result<()> {
    let (deletes, scans) = changes.partition();

    if !deletes.is_empty() {
        info!(delete_request = ?deletes, "deleting resources");
        if let Err(e) = inventory.delete_resources(&deletes).await {
            error!(error = %e, "resource deletion failed");
            return Err(e);
        }
    }

    if !scans.is_empty() {
        for (delay, request) in &scans {
            info!(delay, update_request = ?request, "queueing resource scans");
        }
        queue.send_scans(&scans).await?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::event_processor::types::{ResourceChange, ResourceType};
    use pretty_assertions::assert_eq;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        deletes: Mutex<Vec<DeleteResources>>,
        scans: Mutex<Vec<BTreeMap<i64, ScanMsg>>>,
        fail_deletes: bool,
    }

    #[async_trait]
    impl InventoryApi for Recorder {
        async fn delete_resources(&self, request: &DeleteResources) -> Result<()> {
            if self.fail_deletes {
                bail!("resources-api is down");
            }
            self.deletes.lock().unwrap().push(request.clone());
            Ok(())
        }
    }

    #[async_trait]
    impl ScanQueue for Recorder {
        async fn send_scans(&self, scans: &BTreeMap<i64, ScanMsg>) -> Result<()> {
            self.scans.lock().unwrap().push(scans.clone());
            Ok(())
        }
    }

    fn change(id: &str, delete: bool) -> ResourceChange {
        ResourceChange::new("111111111111", ResourceType::S3Bucket, id, "DeleteBucket").with_delete(delete)
    }

    #[test]
    fn test_delete_url() {
        let client = HttpInventoryClient::new("https://api.example.com/v1/resources/").unwrap();
        assert_eq!(client.delete_url().as_str(), "https://api.example.com/v1/resources/delete");
        assert!(HttpInventoryClient::new("not a url").is_err());
    }

    #[tokio::test]
    async fn test_nothing_to_submit() {
        let recorder = Recorder::default();
        submit_changes(ChangeSet::new(), &recorder, &recorder).await.unwrap();
        assert!(recorder.deletes.lock().unwrap().is_empty());
        assert!(recorder.scans.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_deletes_and_scans() {
        let recorder = Recorder::default();
        let mut changes = ChangeSet::new();
        changes.extend(vec![change("arn:aws:s3:::a", true), change("arn:aws:s3:::b", false)]);

        submit_changes(changes, &recorder, &recorder).await.unwrap();

        let deletes = recorder.deletes.lock().unwrap();
        assert_eq!(deletes.len(), 1);
        assert_eq!(
            serde_json::to_string(&deletes[0]).unwrap(),
            r#"{"resources":[{"id":"arn:aws:s3:::a"}]}"#
        );
        assert_eq!(recorder.scans.lock().unwrap()[0][&0].entries.len(), 1);
    }

    #[tokio::test]
    async fn test_delete_failure_skips_scans() {
        let recorder = Recorder {
            fail_deletes: true,
            ..Default::default()
        };
        let mut changes = ChangeSet::new();
        changes.extend(vec![change("arn:aws:s3:::a", true), change("arn:aws:s3:::b", false)]);

        assert!(submit_changes(changes, &recorder, &recorder).await.is_err());
        assert!(recorder.scans.lock().unwrap().is_empty());
    }
}
