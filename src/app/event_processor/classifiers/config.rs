//! AWS Config recorders

use super::{ignored, unknown, EventClassifier};
use crate::app::event_processor::event::CloudTrailEvent;
use crate::app::event_processor::types::{ResourceChange, ResourceType};

const SERVICE: &str = "config";

// Only the recorder is tracked, so most of the Config API surface is noise here
const IGNORED_EVENTS: &[&str] = &[
    "PutAggregationAuthorization",
    "PutConfigurationAggregator",
    "PutDeliveryChannel",
    "PutEvaluations",
    "PutRemediationConfigurations",
    "PutRetentionConfiguration",
    "StartRemediationExecution",
    "TagResource",
    "UntagResource",
    "DeleteDeliveryChannel",
    "DeleteEvaluationResults",
    "DeletePendingAggregationRequest",
    "DeleteRemediationConfiguration",
    "DeleteRetentionConfiguration",
    "DeliverConfigSnapshot",
    "DeleteAggregationAuthorization",
    "DeleteConfigRule",
    "DeleteConfigurationAggregator",
    "PutConfigRule",
];

pub struct ConfigClassifier;

/// Recorders are one per region, identified as `<account>:<region>:AWS.Config.Recorder`
fn recorder_id(event: &CloudTrailEvent<'_>, account_id: &str) -> String {
    format!("{}:{}:{}", account_id, event.region(), ResourceType::ConfigRecorder)
}

impl EventClassifier for ConfigClassifier {
    fn event_source(&self) -> &'static str {
        "config.amazonaws.com"
    }

    fn classify(&self, event: &CloudTrailEvent<'_>, account_id: &str) -> Vec<ResourceChange> {
        let event_name = event.event_name();

        if IGNORED_EVENTS.contains(&event_name) {
            return ignored(SERVICE, event_name);
        }

        match event_name {
            "StartConfigRulesEvaluation" | "StartConfigurationRecorder" | "StopConfigurationRecorder" => {
                vec![ResourceChange::new(
                    account_id,
                    ResourceType::ConfigRecorder,
                    recorder_id(event, account_id),
                    event_name,
                )]
            }
            // Recorder settings feed the meta resource, which needs a full account scan
            "PutConfigurationRecorder" => {
                vec![ResourceChange::account_scan(account_id, ResourceType::ConfigRecorder, event_name)]
            }
            "DeleteConfigurationRecorder" => vec![
                ResourceChange::new(
                    account_id,
                    ResourceType::ConfigRecorder,
                    recorder_id(event, account_id),
                    event_name,
                )
                .with_delete(true),
                ResourceChange::account_scan(account_id, ResourceType::ConfigRecorder, event_name),
            ],
            _ => unknown(SERVICE, event_name),
        }
    }
}
