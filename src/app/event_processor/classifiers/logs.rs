//! CloudWatch Logs log groups

use super::{ignored, unknown, EventClassifier};
use crate::app::event_processor::event::CloudTrailEvent;
use crate::app::event_processor::types::{ResourceChange, ResourceType};

const SERVICE: &str = "loggroup";

const IGNORED_EVENTS: &[&str] = &[
    "CancelExportTask",
    "CreateExportTask",
    "PutDestination",
    "PutDestinationPolicy",
    "PutLogEvents",
    "PutResourcePolicy",
    "StartQuery",
    "StopQuery",
    "TestMetricFilter",
    "CreateLogStream",
    "FilterLogEvents",
];

const LOG_GROUP_EVENTS: &[&str] = &[
    "AssociateKmsKey",
    "CreateLogGroup",
    "DeleteLogGroup",
    "DeleteLogStream",
    "DeleteMetricFilter",
    "DeleteRetentionPolicy",
    "DeleteSubscriptionFilter",
    "DisassociateKmsKey",
    "PutMetricFilter",
    "PutRetentionPolicy",
    "PutSubscriptionFilter",
    "TagLogGroup",
    "UntagLogGroup",
];

pub struct LogGroupClassifier;

impl EventClassifier for LogGroupClassifier {
    fn event_source(&self) -> &'static str {
        "logs.amazonaws.com"
    }

    fn classify(&self, event: &CloudTrailEvent<'_>, account_id: &str) -> Vec<ResourceChange> {
        let event_name = event.event_name();

        // https://docs.aws.amazon.com/IAM/latest/UserGuide/list_amazoncloudwatchlogs.html
        if IGNORED_EVENTS.contains(&event_name) {
            return ignored(SERVICE, event_name);
        }
        if !LOG_GROUP_EVENTS.contains(&event_name) {
            return unknown(SERVICE, event_name);
        }

        // Real log group ARNs end in ":*"; the poller only needs the name
        let log_group = format!(
            "arn:aws:logs:{}:{}:log-group:{}",
            event.region(),
            account_id,
            event.request("logGroupName")
        );

        vec![ResourceChange::new(account_id, ResourceType::CloudWatchLogGroup, log_group, event_name)
            .with_delete(event_name == "DeleteLogGroup")]
    }
}
