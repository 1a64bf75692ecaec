//! Registered account lookup
//!
//! Maps a 12-digit AWS account ID to the integration that onboarded it. The
//! cache is refreshed from the snapshot API at most once per TTL and the whole
//! map is swapped at once, so readers holding an [`AccountSnapshot`] never see
//! a partial refresh.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use aws_sdk_lambda as lambda;
use aws_smithy_types::Blob;
use moka::future::Cache;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Integration type for accounts onboarded for resource scanning
pub const AWS_SCAN_INTEGRATION: &str = "aws-scan";

/// Default lifetime of a refreshed account map
pub const DEFAULT_ACCOUNT_CACHE_TTL: Duration = Duration::from_secs(120);

/// One onboarded source account, as returned by the snapshot API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Integration {
    pub aws_account_id: String,
    pub integration_id: String,
    #[serde(default)]
    pub integration_label: String,
    #[serde(default)]
    pub integration_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scan_enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scan_interval_mins: Option<i64>,
}

impl Integration {
    pub fn new(aws_account_id: impl Into<String>, integration_id: impl Into<String>) -> Self {
        Self {
            aws_account_id: aws_account_id.into(),
            integration_id: integration_id.into(),
            integration_label: String::new(),
            integration_type: AWS_SCAN_INTEGRATION.to_string(),
            scan_enabled: Some(true),
            scan_interval_mins: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.integration_label = label.into();
        self
    }
}

/// Immutable account map taken at one point in time
#[derive(Debug, Clone, Default)]
pub struct AccountSnapshot {
    by_account: HashMap<String, Integration>,
}

impl AccountSnapshot {
    pub fn from_integrations(integrations: impl IntoIterator<Item = Integration>) -> Self {
        Self {
            by_account: integrations
                .into_iter()
                .map(|integration| (integration.aws_account_id.clone(), integration))
                .collect(),
        }
    }

    pub fn lookup(&self, account_id: &str) -> Option<&Integration> {
        self.by_account.get(account_id)
    }

    pub fn integration_id(&self, account_id: &str) -> Option<&str> {
        self.lookup(account_id).map(|i| i.integration_id.as_str())
    }

    pub fn len(&self) -> usize {
        self.by_account.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_account.is_empty()
    }
}

/// Where the current set of onboarded accounts comes from
#[async_trait]
pub trait IntegrationSource: Send + Sync {
    async fn list_integrations(&self) -> Result<Vec<Integration>>;
}

/// Single cache slot; the whole account map is one entry
type SnapshotKey = ();

fn snapshot_cache(ttl: Duration) -> Cache<SnapshotKey, Arc<AccountSnapshot>> {
    Cache::builder().max_capacity(1).time_to_live(ttl).build()
}

/// Read-through account cache with a TTL
pub struct AccountCache {
    source: Arc<dyn IntegrationSource>,
    snapshots: Cache<SnapshotKey, Arc<AccountSnapshot>>,
    current: RwLock<Arc<AccountSnapshot>>,
}

impl AccountCache {
    pub fn new(source: Arc<dyn IntegrationSource>) -> Self {
        Self {
            source,
            snapshots: snapshot_cache(DEFAULT_ACCOUNT_CACHE_TTL),
            current: RwLock::new(Arc::new(AccountSnapshot::default())),
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.snapshots = snapshot_cache(ttl);
        self
    }

    /// Reload the account map unless it is non-empty and younger than the TTL.
    /// Concurrent callers share one reload. A failed refresh leaves the
    /// previous map in place and returns the error.
    pub async fn ensure_fresh(&self) -> Result<()> {
        let snapshot = self
            .snapshots
            .try_get_with((), async {
                info!("populating account cache");
                let integrations = self
                    .source
                    .list_integrations()
                    .await
                    .context("failed to list registered aws-scan integrations")?;
                let snapshot = Arc::new(AccountSnapshot::from_integrations(integrations));
                debug!(accounts = snapshot.len(), "account cache refreshed");
                Ok::<_, anyhow::Error>(snapshot)
            })
            .await
            .map_err(|e| anyhow!("{:#}", e))?;

        // An empty map is never treated as fresh
        if snapshot.is_empty() {
            self.snapshots.invalidate(&()).await;
        }

        *self.current.write().await = snapshot;
        Ok(())
    }

    /// Current account map. Never refreshes; call [`AccountCache::ensure_fresh`] first.
    pub async fn snapshot(&self) -> Arc<AccountSnapshot> {
        self.current.read().await.clone()
    }

    pub async fn lookup(&self, account_id: &str) -> Option<String> {
        self.snapshot().await.integration_id(account_id).map(str::to_string)
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct IntegrationFilter<'a> {
    integration_type: &'a str,
}

/// Snapshot API request envelope; the API routes on the single top-level key
#[derive(Serialize)]
struct SnapshotApiRequest<'a> {
    #[serde(rename = "getEnabledIntegrations")]
    get_enabled_integrations: IntegrationFilter<'a>,
}

/// Lists integrations by invoking the snapshot API Lambda function
pub struct LambdaIntegrationSource {
    client: lambda::Client,
    function_name: String,
}

impl LambdaIntegrationSource {
    pub fn new(aws_config: &aws_config::SdkConfig, function_name: impl Into<String>) -> Self {
        Self {
            client: lambda::Client::new(aws_config),
            function_name: function_name.into(),
        }
    }
}

#[async_trait]
impl IntegrationSource for LambdaIntegrationSource {
    async fn list_integrations(&self) -> Result<Vec<Integration>> {
        let request = SnapshotApiRequest {
            get_enabled_integrations: IntegrationFilter {
                integration_type: AWS_SCAN_INTEGRATION,
            },
        };
        let payload = serde_json::to_vec(&request)?;

        let response = self
            .client
            .invoke()
            .function_name(&self.function_name)
            .payload(Blob::new(payload))
            .send()
            .await
            .with_context(|| format!("failed to invoke {}", self.function_name))?;

        let body = response.payload().map(|blob| blob.as_ref()).unwrap_or_default();

        if let Some(function_error) = response.function_error() {
            bail!(
                "{} returned {}: {}",
                self.function_name,
                function_error,
                String::from_utf8_lossy(body)
            );
        }
        let status = response.status_code();
        if !(200..300).contains(&status) {
            bail!("{} returned status {}", self.function_name, status);
        }

        serde_json::from_slice(body)
            .with_context(|| format!("invalid integration list from {}", self.function_name))
    }
}
