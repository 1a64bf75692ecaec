//! Per-service CloudTrail classifiers
//!
//! Each classifier turns one CloudTrail event from its service into zero or
//! more [`ResourceChange`]s. Every classifier follows the same shape:
//!
//! - **Ignored events**: calls that never change tracked state. Logged at debug.
//! - **Known mutations**: a fixed table of event names, each with an extraction
//!   rule for the resource identifier (direct, synthesized ARN, fan-out, or a
//!   region/account scan when the log doesn't name the resource).
//! - **Unknown events**: logged at warn and dropped so a mapping can be added.
//!
//! Identifier parse failures are logged at error and drop the event. Classifiers
//! are pure; the [`ClassifierRegistry`] is built once and shared read-only.

#![warn(clippy::all, rust_2018_idioms)]

use std::collections::HashMap;

use tracing::{debug, error, info, warn};

use super::arn::Arn;
use super::event::CloudTrailEvent;
use super::types::ResourceChange;

pub mod acm;
pub mod cloudformation;
pub mod cloudtrail;
pub mod config;
pub mod dynamodb;
pub mod ec2;
pub mod elbv2;
pub mod guardduty;
pub mod iam;
pub mod kms;
pub mod lambda;
pub mod logs;
pub mod rds;
pub mod redshift;
pub mod s3;
pub mod waf;

/// Classifies CloudTrail events for one AWS service
pub trait EventClassifier: Send + Sync {
    /// `eventSource` value this classifier handles, e.g. "s3.amazonaws.com"
    fn event_source(&self) -> &'static str;

    /// Map one event logged in `account_id` to the resources it may have changed
    fn classify(&self, event: &CloudTrailEvent<'_>, account_id: &str) -> Vec<ResourceChange>;
}

/// Immutable `eventSource` -> classifier lookup
pub struct ClassifierRegistry {
    classifiers: HashMap<&'static str, Box<dyn EventClassifier>>,
}

impl ClassifierRegistry {
    /// Registry with every supported service
    pub fn new() -> Self {
        let all: Vec<Box<dyn EventClassifier>> = vec![
            Box::new(acm::AcmClassifier),
            Box::new(cloudformation::CloudFormationClassifier),
            Box::new(cloudtrail::CloudTrailClassifier),
            Box::new(config::ConfigClassifier),
            Box::new(dynamodb::DynamoDbClassifier),
            Box::new(ec2::Ec2Classifier),
            Box::new(elbv2::Elbv2Classifier),
            Box::new(guardduty::GuardDutyClassifier),
            Box::new(iam::IamClassifier),
            Box::new(kms::KmsClassifier),
            Box::new(lambda::LambdaClassifier),
            Box::new(logs::LogGroupClassifier),
            Box::new(rds::RdsClassifier),
            Box::new(redshift::RedshiftClassifier),
            Box::new(s3::S3Classifier),
            Box::new(waf::WafClassifier),
            Box::new(waf::WafRegionalClassifier),
        ];

        Self {
            classifiers: all.into_iter().map(|c| (c.event_source(), c)).collect(),
        }
    }

    pub fn get(&self, event_source: &str) -> Option<&dyn EventClassifier> {
        self.classifiers.get(event_source).map(|c| c.as_ref())
    }

    /// Supported event sources, sorted
    pub fn event_sources(&self) -> Vec<&'static str> {
        let mut sources: Vec<_> = self.classifiers.keys().copied().collect();
        sources.sort_unstable();
        sources
    }
}

impl Default for ClassifierRegistry {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) fn ignored(service: &str, event_name: &str) -> Vec<ResourceChange> {
    debug!(event_name, "{}: ignoring event", service);
    Vec::new()
}

pub(crate) fn unknown(service: &str, event_name: &str) -> Vec<ResourceChange> {
    warn!(event_name, "{}: encountered unknown event name", service);
    Vec::new()
}

/// Parse an ARN from event data, logging at error on failure
pub(crate) fn parse_arn(service: &str, event_name: &str, raw: &str) -> Option<Arn> {
    match Arn::parse(raw) {
        Ok(arn) => Some(arn),
        Err(e) => {
            error!(event_name, raw, error = %e, "{}: unable to parse ARN", service);
            None
        }
    }
}

/// True (and logged) when a resolved ARN is owned by an account other than the one the event was logged in
pub(crate) fn is_foreign(service: &str, arn: &Arn, account_id: &str) -> bool {
    if arn.account_id == account_id {
        return false;
    }
    info!(
        resource_id = %arn,
        account_id,
        "{}: discarding resource from another account",
        service
    );
    true
}

#[cfg(test)]
pub(crate) mod test_support {
    use serde_json::{json, Value};

    use super::super::event::CloudTrailEvent;
    use super::super::types::ResourceChange;
    use super::EventClassifier;

    pub const ACCOUNT: &str = "111111111111";
    pub const REGION: &str = "us-west-2";

    /// Minimal CloudTrail event with the given name and payloads
    pub fn event(name: &str, request: Value, response: Value) -> Value {
        json!({
            "eventName": name,
            "awsRegion": REGION,
            "eventTime": "2019-08-01T04:43:00Z",
            "requestParameters": request,
            "responseElements": response,
        })
    }

    pub fn classify(classifier: &dyn EventClassifier, raw: &Value) -> Vec<ResourceChange> {
        classifier.classify(&CloudTrailEvent::new(raw), ACCOUNT)
    }

    pub fn ids(changes: &[ResourceChange]) -> Vec<&str> {
        changes.iter().map(|c| c.resource_id.as_str()).collect()
    }
}
