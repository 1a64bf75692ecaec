//! Processor settings from the environment

use std::time::Duration;

use anyhow::{Context, Result};

use super::event_processor::accounts::DEFAULT_ACCOUNT_CACHE_TTL;
use super::event_processor::sqs_batch::DEFAULT_MAX_ELAPSED;

pub const DEFAULT_SNAPSHOT_API_FUNCTION: &str = "panther-snapshot-api";

pub const DEFAULT_LOG_FILTER: &str = "awsevents=info,aws_config=warn,aws_smithy_runtime=warn,hyper=warn";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessorConfig {
    /// Snapshot poller request queue (`SNAPSHOT_POLLER_QUEUE_URL`)
    pub queue_url: String,
    /// Resources API base URL (`RESOURCES_API_URL`)
    pub resources_api_url: String,
    /// Lambda serving the integration list (`SNAPSHOT_API_FUNCTION`)
    pub snapshot_api_function: String,
    /// `ACCOUNT_CACHE_TTL_SECS`
    pub account_cache_ttl: Duration,
    /// Retry deadline for queue sends (`SQS_MAX_BACKOFF_SECS`)
    pub max_send_elapsed: Duration,
    /// `RUST_LOG`
    pub log_filter: String,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            queue_url: String::new(),
            resources_api_url: String::new(),
            snapshot_api_function: DEFAULT_SNAPSHOT_API_FUNCTION.to_string(),
            account_cache_ttl: DEFAULT_ACCOUNT_CACHE_TTL,
            max_send_elapsed: DEFAULT_MAX_ELAPSED,
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl ProcessorConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; empty values count as unset
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let required = |key: &str| get(key).with_context(|| format!("{} must be set", key));
        let seconds = |key: &str, default: Duration| -> Result<Duration> {
            match get(key) {
                Some(raw) => raw
                    .trim()
                    .parse::<u64>()
                    .map(Duration::from_secs)
                    .with_context(|| format!("{} must be a whole number of seconds, got {:?}", key, raw)),
                None => Ok(default),
            }
        };

        let defaults = Self::default();
        Ok(Self {
            queue_url: required("SNAPSHOT_POLLER_QUEUE_URL")?,
            resources_api_url: required("RESOURCES_API_URL")?,
            snapshot_api_function: get("SNAPSHOT_API_FUNCTION").unwrap_or(defaults.snapshot_api_function),
            account_cache_ttl: seconds("ACCOUNT_CACHE_TTL_SECS", defaults.account_cache_ttl)?,
            max_send_elapsed: seconds("SQS_MAX_BACKOFF_SECS", defaults.max_send_elapsed)?,
            log_filter: get("RUST_LOG").unwrap_or(defaults.log_filter),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| vars.get(key).cloned()
    }

    const REQUIRED: [(&str, &str); 2] = [
        ("SNAPSHOT_POLLER_QUEUE_URL", "https://sqs.us-west-2.amazonaws.com/111111111111/snapshot-queue"),
        ("RESOURCES_API_URL", "https://api.example.com/v1/resources"),
    ];

    #[test]
    fn test_defaults() {
        let config = ProcessorConfig::from_lookup(lookup(&REQUIRED)).unwrap();
        assert_eq!(
            config,
            ProcessorConfig {
                queue_url: REQUIRED[0].1.to_string(),
                resources_api_url: REQUIRED[1].1.to_string(),
                ..Default::default()
            }
        );
        assert_eq!(config.account_cache_ttl, Duration::from_secs(120));
        assert_eq!(config.max_send_elapsed, Duration::from_secs(30));
    }

    #[test]
    fn test_overrides() {
        let mut vars = REQUIRED.to_vec();
        vars.extend([
            ("SNAPSHOT_API_FUNCTION", "custom-snapshot-api"),
            ("ACCOUNT_CACHE_TTL_SECS", "5"),
            ("SQS_MAX_BACKOFF_SECS", " 60 "),
            ("RUST_LOG", "debug"),
        ]);
        let config = ProcessorConfig::from_lookup(lookup(&vars)).unwrap();
        assert_eq!(config.snapshot_api_function, "custom-snapshot-api");
        assert_eq!(config.account_cache_ttl, Duration::from_secs(5));
        assert_eq!(config.max_send_elapsed, Duration::from_secs(60));
        assert_eq!(config.log_filter, "debug");
    }

    #[test]
    fn test_missing_and_invalid() {
        let err = ProcessorConfig::from_lookup(lookup(&REQUIRED[..1])).unwrap_err();
        assert_eq!(err.to_string(), "RESOURCES_API_URL must be set");

        let mut vars = REQUIRED.to_vec();
        vars.push(("ACCOUNT_CACHE_TTL_SECS", "two minutes"));
        assert!(ProcessorConfig::from_lookup(lookup(&vars)).is_err());
    }
}
