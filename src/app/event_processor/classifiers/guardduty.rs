//! Amazon GuardDuty detectors

use super::{ignored, unknown, EventClassifier};
use crate::app::event_processor::event::CloudTrailEvent;
use crate::app::event_processor::types::{ResourceChange, ResourceType};

const SERVICE: &str = "guardduty";

const IGNORED_EVENTS: &[&str] = &[
    "ArchiveFindings",
    "CreateIPSet",
    "CreateSampleFindings",
    "CreateThreatIntelSet",
    "DeclineInvitations",
    "DeleteFilter",
    "DeleteIPSet",
    "DeleteInvitations",
    "DeleteThreatIntelSet",
    "InviteMembers",
    "UnarchiveFindings",
    "UpdateFilter",
    "UpdateFindingsFeedback",
    "UpdateIPSet",
    "UpdateThreatIntelSet",
    "CreateFilter",
];

pub struct GuardDutyClassifier;

/// At most one detector exists per region
fn detector_id(event: &CloudTrailEvent<'_>, account_id: &str) -> String {
    format!("{}:{}:{}", account_id, event.region(), ResourceType::GuardDutyDetector)
}

impl EventClassifier for GuardDutyClassifier {
    fn event_source(&self) -> &'static str {
        "guardduty.amazonaws.com"
    }

    fn classify(&self, event: &CloudTrailEvent<'_>, account_id: &str) -> Vec<ResourceChange> {
        let event_name = event.event_name();

        // https://docs.aws.amazon.com/IAM/latest/UserGuide/list_amazonguardduty.html
        if IGNORED_EVENTS.contains(&event_name) {
            return ignored(SERVICE, event_name);
        }

        match event_name {
            "TagResource" | "UntagResource" | "UpdateDetector" => vec![ResourceChange::new(
                account_id,
                ResourceType::GuardDutyDetector,
                detector_id(event, account_id),
                event_name,
            )],
            "AcceptInvitation"
            | "CreateDetector"
            | "CreateMembers"
            | "DeleteMembers"
            | "DisassociateFromMasterAccount"
            | "DisassociateMembers"
            | "StartMonitoringMembers"
            | "StopMonitoringMembers" => {
                vec![ResourceChange::account_scan(account_id, ResourceType::GuardDutyDetector, event_name)]
            }
            "DeleteDetector" => vec![
                ResourceChange::new(
                    account_id,
                    ResourceType::GuardDutyDetector,
                    detector_id(event, account_id),
                    event_name,
                )
                .with_delete(true),
                ResourceChange::account_scan(account_id, ResourceType::GuardDutyDetector, event_name),
            ],
            _ => unknown(SERVICE, event_name),
        }
    }
}
