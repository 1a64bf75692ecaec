//! Envelope detection and noise filtering in front of the classifiers
//!
//! A record body is either an EventBridge notification wrapping a CloudTrail
//! event in `detail`, or a CloudTrail event delivered directly. Anything that
//! fails a filter here is logged and dropped; nothing in this module returns an
//! error, so one bad record never fails its batch.

use serde_json::Value;
use tracing::{debug, warn};

use super::accounts::AccountSnapshot;
use super::classifiers::ClassifierRegistry;
use super::event::{str_at, CloudTrailEvent};
use super::types::ResourceChange;

/// `detail-type` of an EventBridge rule matching CloudTrail API calls
pub const CLOUDTRAIL_DETAIL_TYPE: &str = "AWS API Call via CloudTrail";

/// `eventType` of a management API call in a raw CloudTrail log
pub const API_CALL_EVENT_TYPE: &str = "AwsApiCall";

/// `readOnly` in the event itself is unreliable, so read-only calls are recognised by name
const READ_ONLY_PREFIXES: &[&str] = &["Get", "BatchGet", "Describe", "List"];

/// Routes CloudTrail records to their service classifier
pub struct Dispatcher<'a> {
    registry: &'a ClassifierRegistry,
    accounts: &'a AccountSnapshot,
}

impl<'a> Dispatcher<'a> {
    pub fn new(registry: &'a ClassifierRegistry, accounts: &'a AccountSnapshot) -> Self {
        Self { registry, accounts }
    }

    /// Classify one raw record body
    pub fn classify(&self, body: &str) -> Vec<ResourceChange> {
        let envelope = serde_json::from_str(body).unwrap_or(Value::Null);
        self.classify_value(&envelope, body)
    }

    /// Classify an already-decoded record body; `body` is only used for logging
    pub fn classify_value(&self, envelope: &Value, body: &str) -> Vec<ResourceChange> {
        let (detail, account_id) = if str_at(envelope, "detail-type") == CLOUDTRAIL_DETAIL_TYPE {
            (envelope.get("detail"), str_at(envelope, "account"))
        } else if str_at(envelope, "eventType") == API_CALL_EVENT_TYPE {
            (Some(envelope), str_at(envelope, "recipientAccountId"))
        } else {
            warn!(body, "dropping unknown notification type");
            return Vec::new();
        };

        let Some(detail) = detail.filter(|d| d.is_object()) else {
            // Only reachable if someone writes bad data to the log bucket by hand
            warn!(body, "unable to parse CloudTrail log");
            return Vec::new();
        };
        let event = CloudTrailEvent::new(detail);

        let source = event.event_source();
        let Some(classifier) = self.registry.get(source) else {
            debug!(event_source = source, "dropping event from unsupported source");
            return Vec::new();
        };

        let error_code = event.error_code();
        if !error_code.is_empty() {
            debug!(event_source = source, error_code, "dropping failed event");
            return Vec::new();
        }

        let event_name = event.event_name();
        if READ_ONLY_PREFIXES.iter().any(|prefix| event_name.starts_with(prefix)) {
            debug!(event_name, "{}: ignoring read-only event", source);
            return Vec::new();
        }

        let Some(integration) = self.accounts.lookup(account_id) else {
            warn!(account_id, event_source = source, "dropping event from unauthorized account");
            return Vec::new();
        };

        let mut changes = classifier.classify(&event, account_id);
        let event_time = event.event_time();
        for change in &mut changes {
            change.event_time = event_time.to_string();
            change.integration_id = integration.integration_id.clone();
        }
        changes
    }
}
