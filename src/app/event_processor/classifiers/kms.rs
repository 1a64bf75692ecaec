//! AWS KMS keys
//!
//! KMS request parameters name keys inconsistently (key id, alias, or ARN), so
//! the key ARN is read from the event's `resources` list instead.

use super::{ignored, unknown, EventClassifier};
use crate::app::event_processor::arn::Arn;
use crate::app::event_processor::event::{str_at, CloudTrailEvent};
use crate::app::event_processor::types::{ResourceChange, ResourceType};

const SERVICE: &str = "kms";

pub struct KmsClassifier;

impl EventClassifier for KmsClassifier {
    fn event_source(&self) -> &'static str {
        "kms.amazonaws.com"
    }

    fn classify(&self, event: &CloudTrailEvent<'_>, account_id: &str) -> Vec<ResourceChange> {
        let event_name = event.event_name();

        // https://docs.aws.amazon.com/IAM/latest/UserGuide/list_awskeymanagementservice.html
        if ["Decrypt", "GenerateDataKey", "Encrypt"]
            .iter()
            .any(|prefix| event_name.starts_with(prefix))
        {
            return ignored(SERVICE, event_name);
        }

        let key_arn = match event_name {
            "CancelKeyDeletion" | "CreateGrant" | "CreateKey" | "DisableKey" | "DisableKeyRotation"
            | "EnableKey" | "EnableKeyRotation" | "PutKeyPolicy" | "ScheduleKeyDeletion" | "TagResource"
            | "UntagResource" | "UpdateAlias" | "UpdateKeyDescription" => event.str_at("resources.0.ARN").to_string(),
            // Alias events list both the alias and the key it points at
            "CreateAlias" | "DeleteAlias" => {
                let mut key_arn = String::new();
                for resource in event.array_at("resources") {
                    match Arn::parse(str_at(resource, "ARN")) {
                        Ok(arn) if arn.resource.starts_with("key/") => key_arn = arn.to_string(),
                        Ok(_) => {}
                        Err(e) => {
                            tracing::error!(event_name, error = %e, "kms: unable to extract ARN");
                            return Vec::new();
                        }
                    }
                }
                key_arn
            }
            _ => return unknown(SERVICE, event_name),
        };

        if key_arn.is_empty() {
            tracing::error!(event_name, "kms: no key ARN in event resources");
            return Vec::new();
        }

        vec![ResourceChange::new(account_id, ResourceType::KmsKey, key_arn, event_name)]
    }
}
