#![warn(clippy::all, rust_2018_idioms)]

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use aws_config::BehaviorVersion;
use serde_json::Value;
use tokio::io::AsyncReadExt;

use awsevents::app::event_processor::accounts::{AccountCache, LambdaIntegrationSource};
use awsevents::app::event_processor::confirmation::AwsSnsClientBuilder;
use awsevents::app::event_processor::sqs_batch::SqsScanQueue;
use awsevents::app::event_processor::submission::HttpInventoryClient;
use awsevents::{EventProcessor, ProcessorConfig};

/// Read one batch: a JSON array whose items are record bodies, either as
/// strings or as inline JSON objects
async fn read_batch(path: Option<&str>) -> Result<Vec<String>> {
    let raw = match path {
        Some(path) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read batch from {}", path))?,
        None => {
            let mut raw = String::new();
            tokio::io::stdin()
                .read_to_string(&mut raw)
                .await
                .context("failed to read batch from stdin")?;
            raw
        }
    };

    let records: Vec<Value> = serde_json::from_str(&raw).context("batch must be a JSON array of records")?;
    Ok(records
        .into_iter()
        .map(|record| match record {
            Value::String(body) => body,
            other => other.to_string(),
        })
        .collect())
}

async fn run(config: ProcessorConfig, batch_path: Option<String>) -> Result<()> {
    let aws_config = aws_config::defaults(BehaviorVersion::latest()).load().await;

    let accounts = AccountCache::new(Arc::new(LambdaIntegrationSource::new(
        &aws_config,
        config.snapshot_api_function.clone(),
    )))
    .with_ttl(config.account_cache_ttl);
    let inventory = HttpInventoryClient::new(&config.resources_api_url)?;
    let scans = SqsScanQueue::new(aws_sdk_sqs::Client::new(&aws_config), config.queue_url.clone())
        .with_max_elapsed(config.max_send_elapsed);

    let processor = EventProcessor::new(
        Arc::new(accounts),
        Arc::new(inventory),
        Arc::new(scans),
        Arc::new(AwsSnsClientBuilder),
    );

    let records = read_batch(batch_path.as_deref()).await?;
    tracing::info!(records = records.len(), "processing batch");
    processor.handle_batch(&records).await
}

fn main() -> Result<()> {
    let mut args = std::env::args().skip(1);
    let batch_path = args.next();
    if args.next().is_some() {
        bail!("usage: awsevents [BATCH_FILE]");
    }

    let config = ProcessorConfig::from_env()?;
    awsevents::app::logging::init(&config.log_filter)?;
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        commit = env!("AWSEVENTS_GIT_COMMIT"),
        "awsevents starting"
    );

    let runtime = tokio::runtime::Runtime::new().context("failed to create tokio runtime")?;
    let result = runtime.block_on(run(config, batch_path));

    if let Err(e) = &result {
        tracing::error!(error = %format!("{:#}", e), "batch failed");
    }
    result
}
