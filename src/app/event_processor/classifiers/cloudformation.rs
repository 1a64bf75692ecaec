//! AWS CloudFormation stacks
//!
//! Single-stack changes are delayed so the poller's drift detection call runs
//! against a stack that has finished updating.

use super::{ignored, is_foreign, parse_arn, unknown, EventClassifier};
use crate::app::event_processor::arn::Arn;
use crate::app::event_processor::event::CloudTrailEvent;
use crate::app::event_processor::types::{ResourceChange, ResourceType, CLOUDFORMATION_SCAN_DELAY_SECS};

const SERVICE: &str = "cloudformation";

pub struct CloudFormationClassifier;

impl EventClassifier for CloudFormationClassifier {
    fn event_source(&self) -> &'static str {
        "cloudformation.amazonaws.com"
    }

    fn classify(&self, event: &CloudTrailEvent<'_>, account_id: &str) -> Vec<ResourceChange> {
        let event_name = event.event_name();

        // https://docs.aws.amazon.com/IAM/latest/UserGuide/list_awscloudformation.html
        // ExecuteChangeSet is not ignored: it is the call that actually applies the change
        if matches!(
            event_name,
            "DeleteChangeSet" | "CreateStackSet" | "EstimateTemplateCost" | "ValidateTemplate"
        ) || event_name.starts_with("Detect")
        {
            return ignored(SERVICE, event_name);
        }

        let region = event.region();

        let stack_id = match event_name {
            "CancelUpdateStack" | "CreateChangeSet" | "ContinueUpdateRollback" | "DeleteStack"
            | "SetStackPolicy" | "UpdateStack" | "ExecuteChangeSet" => {
                // stackName is either the bare name or the full stack ARN
                let stack_name = event.request("stackName");
                if stack_name.is_empty() {
                    tracing::error!(event_name, "cloudformation: unable to process known event");
                    return Vec::new();
                }
                match Arn::parse(stack_name) {
                    Ok(stack_arn) => {
                        if is_foreign(SERVICE, &stack_arn, account_id) {
                            return Vec::new();
                        }
                        stack_arn.to_string()
                    }
                    // Missing the unique suffix of a real stack ARN; the poller only needs the name
                    Err(_) => format!("arn:aws:cloudformation:{}:{}:stack/{}", region, account_id, stack_name),
                }
            }
            "CreateStack" => match parse_arn(SERVICE, event_name, event.response("stackId")) {
                Some(stack_arn) => stack_arn.to_string(),
                None => return Vec::new(),
            },
            // The logged event carries no request parameters
            "UpdateTerminationProtection" => {
                return vec![ResourceChange::region_scan(
                    account_id,
                    ResourceType::CloudFormationStack,
                    region,
                    event_name,
                )];
            }
            // Nothing identifying is logged for stack set instances
            "CreateStackInstances" | "DeleteStackInstances" => {
                return vec![ResourceChange::account_scan(
                    account_id,
                    ResourceType::CloudFormationStack,
                    event_name,
                )];
            }
            _ => return unknown(SERVICE, event_name),
        };

        vec![ResourceChange::new(account_id, ResourceType::CloudFormationStack, stack_id, event_name)
            .with_delay_seconds(CLOUDFORMATION_SCAN_DELAY_SECS)
            .with_delete(event_name == "DeleteStack")]
    }
}
