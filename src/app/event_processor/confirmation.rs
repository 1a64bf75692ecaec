//! SNS subscription confirmation
//!
//! When a source account subscribes the event queue to its CloudTrail topic,
//! SNS first delivers a `SubscriptionConfirmation` record. It is confirmed only
//! for topics owned by an onboarded account.

use anyhow::{Context, Result};
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_sns as sns;
use aws_types::region::Region;
use tracing::{error, info, warn};

use super::accounts::AccountSnapshot;
use super::arn::Arn;

/// The ConfirmSubscription call
#[async_trait]
pub trait SnsConfirmer: Send + Sync {
    /// Returns the new subscription ARN when SNS reports one
    async fn confirm_subscription(&self, topic_arn: &str, token: &str) -> Result<Option<String>>;
}

/// Builds an SNS client for the topic's region
#[async_trait]
pub trait SnsClientBuilder: Send + Sync {
    async fn build(&self, region: &str) -> Result<Box<dyn SnsConfirmer>>;
}

struct AwsSnsConfirmer {
    client: sns::Client,
}

#[async_trait]
impl SnsConfirmer for AwsSnsConfirmer {
    async fn confirm_subscription(&self, topic_arn: &str, token: &str) -> Result<Option<String>> {
        let output = self
            .client
            .confirm_subscription()
            .topic_arn(topic_arn)
            .token(token)
            .send()
            .await
            .with_context(|| format!("sns.ConfirmSubscription failed for {}", topic_arn))?;

        Ok(output.subscription_arn().map(str::to_string))
    }
}

/// Loads the default credential chain pinned to the topic's region
#[derive(Debug, Default, Clone, Copy)]
pub struct AwsSnsClientBuilder;

#[async_trait]
impl SnsClientBuilder for AwsSnsClientBuilder {
    async fn build(&self, region: &str) -> Result<Box<dyn SnsConfirmer>> {
        if region.is_empty() {
            anyhow::bail!("topic arn has no region");
        }

        let aws_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(region.to_string()))
            .load()
            .await;

        Ok(Box::new(AwsSnsConfirmer {
            client: sns::Client::new(&aws_config),
        }))
    }
}

/// Confirm a topic subscription. Unknown accounts and missing tokens are
/// refused without error; client or confirmation failures are returned so the
/// record is redelivered.
pub async fn confirm_subscription(
    topic_arn: &Arn,
    token: Option<&str>,
    accounts: &AccountSnapshot,
    clients: &dyn SnsClientBuilder,
) -> Result<()> {
    if accounts.lookup(&topic_arn.account_id).is_none() {
        warn!(account_id = %topic_arn.account_id, "refusing sns confirmation from unknown account");
        return Ok(());
    }

    let Some(token) = token.filter(|t| !t.is_empty()) else {
        warn!(topic_arn = %topic_arn, "no sns confirmation token");
        return Ok(());
    };

    info!(topic_arn = %topic_arn, "confirming sns subscription");
    let client = match clients.build(&topic_arn.region).await {
        Ok(client) => client,
        Err(e) => {
            error!(error = %e, "sns client creation failed");
            return Err(e);
        }
    };

    match client.confirm_subscription(&topic_arn.to_string(), token).await {
        Ok(subscription_arn) => {
            info!(
                subscription_arn = subscription_arn.as_deref().unwrap_or_default(),
                "sns subscription confirmed successfully"
            );
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "sns confirmation failed");
            Err(e)
        }
    }
}
