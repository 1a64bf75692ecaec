//! AWS CloudTrail trails

use super::{ignored, is_foreign, parse_arn, unknown, EventClassifier};
use crate::app::event_processor::arn::Arn;
use crate::app::event_processor::event::CloudTrailEvent;
use crate::app::event_processor::types::{ResourceChange, ResourceType};

const SERVICE: &str = "cloudtrail";

pub struct CloudTrailClassifier;

/// The `name` parameter may be the trail name or the trail ARN
fn trail_arn(event: &CloudTrailEvent<'_>, account_id: &str) -> Arn {
    let name = event.request("name");
    Arn::parse(name).unwrap_or_else(|_| Arn {
        partition: "aws".to_string(),
        service: "cloudtrail".to_string(),
        region: event.region().to_string(),
        account_id: account_id.to_string(),
        resource: format!("trail/{}", name),
    })
}

impl EventClassifier for CloudTrailClassifier {
    fn event_source(&self) -> &'static str {
        "cloudtrail.amazonaws.com"
    }

    fn classify(&self, event: &CloudTrailEvent<'_>, account_id: &str) -> Vec<ResourceChange> {
        let event_name = event.event_name();

        // https://docs.aws.amazon.com/IAM/latest/UserGuide/list_awscloudtrail.html
        if event_name.starts_with("Lookup") {
            return ignored(SERVICE, event_name);
        }

        let trail = match event_name {
            "AddTags" | "RemoveTags" => match parse_arn(SERVICE, event_name, event.request("resourceId")) {
                Some(arn) => arn,
                None => return Vec::new(),
            },
            "StartLogging" | "StopLogging" | "UpdateTrail" => trail_arn(event, account_id),
            // May change the CloudTrail meta resource
            "CreateTrail" | "PutEventSelectors" => {
                return vec![ResourceChange::account_scan(account_id, ResourceType::CloudTrail, event_name)];
            }
            "DeleteTrail" => {
                let trail = trail_arn(event, account_id);
                return vec![
                    ResourceChange::new(account_id, ResourceType::CloudTrail, trail.to_string(), event_name)
                        .with_delete(true),
                    ResourceChange::account_scan(account_id, ResourceType::CloudTrail, event_name),
                ];
            }
            _ => return unknown(SERVICE, event_name),
        };

        // Only possible when the trail was named by ARN
        if is_foreign(SERVICE, &trail, account_id) {
            return Vec::new();
        }

        vec![ResourceChange::new(account_id, ResourceType::CloudTrail, trail.to_string(), event_name)]
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_stop_logging_by_name() {
        let raw = event("StopLogging", json!({"name": "panther-trail"}), json!(null));
        assert_eq!(
            ids(&classify(&CloudTrailClassifier, &raw)),
            vec!["arn:aws:cloudtrail:us-west-2:111111111111:trail/panther-trail"]
        );
    }

    #[test]
    fn test_update_trail_by_foreign_arn() {
        let raw = event(
            "UpdateTrail",
            json!({"name": "arn:aws:cloudtrail:us-west-2:222222222222:trail/org-trail"}),
            json!(null),
        );
        assert!(classify(&CloudTrailClassifier, &raw).is_empty());
    }

    #[test]
    fn test_add_tags() {
        let trail = "arn:aws:cloudtrail:us-west-2:111111111111:trail/panther-trail";
        let raw = event("AddTags", json!({"resourceId": trail}), json!(null));
        assert_eq!(ids(&classify(&CloudTrailClassifier, &raw)), vec![trail]);

        let raw = event("AddTags", json!({"resourceId": "panther-trail"}), json!(null));
        assert!(classify(&CloudTrailClassifier, &raw).is_empty());
    }

    #[test]
    fn test_delete_trail_emits_delete_and_meta_scan() {
        let raw = event("DeleteTrail", json!({"name": "panther-trail"}), json!(null));
        let changes = classify(&CloudTrailClassifier, &raw);

        assert_eq!(changes.len(), 2);
        assert_eq!(changes[0].resource_id, "arn:aws:cloudtrail:us-west-2:111111111111:trail/panther-trail");
        assert!(changes[0].delete);
        assert!(changes[1].is_scope_scan());
        assert_eq!(changes[1].region, "");
        assert!(!changes[1].delete);
    }

    #[test]
    fn test_create_trail_scans_account() {
        let raw = event("CreateTrail", json!({"name": "t"}), json!({}));
        let changes = classify(&CloudTrailClassifier, &raw);
        assert_eq!(changes.len(), 1);
        assert!(changes[0].is_scope_scan());
    }

    #[test]
    fn test_lookup_ignored() {
        assert!(classify(&CloudTrailClassifier, &event("LookupEvents", json!({}), json!({}))).is_empty());
    }
}
