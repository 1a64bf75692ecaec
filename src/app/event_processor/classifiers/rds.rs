//! Amazon RDS database instances
//!
//! Only instances are tracked. Aurora clusters, parameter/option groups and
//! event subscriptions are ignored by name suffix.

use super::{ignored, parse_arn, unknown, EventClassifier};
use crate::app::event_processor::event::CloudTrailEvent;
use crate::app::event_processor::types::{ResourceChange, ResourceType};

const SERVICE: &str = "rds";

const IGNORED_SUFFIXES: &[&str] = &[
    "DBCluster",
    "ParameterGroup",
    "Subscription",
    "OptionGroup",
    "GlobalCluster",
    "ClusterSnapshot",
];

const IGNORED_EVENTS: &[&str] = &[
    "CreateDBClusterEndpoint",
    "DeleteDBClusterEndpoint",
    "CreateDBSecurityGroup",
    "DeleteDBSecurityGroup",
    "AuthorizeDBSecurityGroupIngress",
    "DeleteDBSubnetGroup",
    "DownloadDBLogFilePortion",
    "ModifyCurrentDBClusterCapacity",
    "ModifyDBClusterEndpoint",
    "ModifyDBClusterSnapshotAttribute",
    "RestoreDBClusterFromS3",
    "RestoreDBClusterFromSnapshot",
    "RestoreDBClusterToPointInTime",
    "RevokeDBSecurityGroupIngress",
    "StartActivityStream",
    "StopActivityStream",
];

const INSTANCE_EVENTS: &[&str] = &[
    "AddRoleToDBInstance",
    "CreateDBInstance",
    "CreateDBSnapshot",
    "DeleteDBInstance",
    "ModifyDBInstance",
    "PromoteReadReplica",
    "RebootDBInstance",
    "RemoveRoleFromDBInstance",
    "RestoreDBInstanceFromDBSnapshot",
    "RestoreDBInstanceFromS3",
    "StartDBInstance",
    "StopDBInstance",
];

pub struct RdsClassifier;

impl EventClassifier for RdsClassifier {
    fn event_source(&self) -> &'static str {
        "rds.amazonaws.com"
    }

    fn classify(&self, event: &CloudTrailEvent<'_>, account_id: &str) -> Vec<ResourceChange> {
        let event_name = event.event_name();

        if IGNORED_SUFFIXES.iter().any(|suffix| event_name.ends_with(suffix)) || IGNORED_EVENTS.contains(&event_name) {
            return ignored(SERVICE, event_name);
        }

        // https://docs.aws.amazon.com/IAM/latest/UserGuide/list_amazonrds.html
        let region = event.region();
        let instance = |identifier: &str| {
            ResourceChange::new(
                account_id,
                ResourceType::RdsInstance,
                format!("arn:aws:rds:{}:{}:db:{}", region, account_id, identifier),
                event_name,
            )
        };
        // Tagging and maintenance calls take any RDS ARN; only instances ("db:") are kept
        let tagged_instance = |raw: &str| match parse_arn(SERVICE, event_name, raw) {
            Some(rds_arn) if rds_arn.resource.starts_with("db:") => vec![ResourceChange::new(
                account_id,
                ResourceType::RdsInstance,
                rds_arn.to_string(),
                event_name,
            )],
            _ => Vec::new(),
        };

        if INSTANCE_EVENTS.contains(&event_name) {
            return vec![instance(event.request("dBInstanceIdentifier")).with_delete(event_name == "DeleteDBInstance")];
        }

        match event_name {
            "AddTagsToResource" | "RemoveTagsFromResource" => tagged_instance(event.request("resourceName")),
            "ApplyPendingMaintenanceAction" => tagged_instance(event.request("resourceIdentifier")),
            "CopyDBSnapshot" | "DeleteDBSnapshot" | "ModifyDBSnapshot" => {
                vec![instance(event.response("dBSnapshot.dBInstanceIdentifier"))]
            }
            "CreateDBInstanceReadReplica" => vec![
                instance(event.request("dBInstanceIdentifier")),
                instance(event.request("sourcedBInstanceIdentifier")),
            ],
            "RestoreDBInstanceToPointInTime" => vec![
                instance(event.request("targetdBInstanceIdentifier")),
                instance(event.request("sourcedBInstanceIdentifier")),
            ],
            // Subnet groups aren't tracked; the VPC they live in is
            "CreateDBSubnetGroup" | "ModifyDBSubnetGroup" => vec![ResourceChange::new(
                account_id,
                ResourceType::Ec2Vpc,
                format!("arn:aws:ec2:{}:{}:vpc/{}", region, account_id, event.response("dBSubnetGroup.vpcId")),
                event_name,
            )],
            "DeleteDBInstanceAutomatedBackup" => {
                vec![instance(event.response("dBInstanceAutomatedBackup.dBInstanceIdentifier"))]
            }
            // Snapshots can't be traced back to their instance from this event
            "ModifyDBSnapshotAttribute" => {
                vec![ResourceChange::region_scan(account_id, ResourceType::RdsInstance, region, event_name)]
            }
            _ => unknown(SERVICE, event_name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    const DB: &str = "arn:aws:rds:us-west-2:111111111111:db:prod-db";

    #[test]
    fn test_delete_instance() {
        let raw = event("DeleteDBInstance", json!({"dBInstanceIdentifier": "prod-db"}), json!(null));
        let changes = classify(&RdsClassifier, &raw);
        assert_eq!(ids(&changes), vec![DB]);
        assert!(changes[0].delete);
    }

    #[test]
    fn test_read_replica_pair() {
        let raw = event(
            "CreateDBInstanceReadReplica",
            json!({"dBInstanceIdentifier": "replica", "sourcedBInstanceIdentifier": "prod-db"}),
            json!(null),
        );
        assert_eq!(
            ids(&classify(&RdsClassifier, &raw)),
            vec!["arn:aws:rds:us-west-2:111111111111:db:replica", DB]
        );
    }

    #[test]
    fn test_tags_only_for_instances() {
        let raw = event("AddTagsToResource", json!({"resourceName": DB}), json!(null));
        assert_eq!(ids(&classify(&RdsClassifier, &raw)), vec![DB]);

        let raw = event(
            "AddTagsToResource",
            json!({"resourceName": "arn:aws:rds:us-west-2:111111111111:snapshot:snap"}),
            json!(null),
        );
        assert!(classify(&RdsClassifier, &raw).is_empty());

        let raw = event("ApplyPendingMaintenanceAction", json!({"resourceIdentifier": "prod-db"}), json!(null));
        assert!(classify(&RdsClassifier, &raw).is_empty());
    }

    #[test]
    fn test_subnet_group_scans_vpc() {
        let raw = event("CreateDBSubnetGroup", json!({}), json!({"dBSubnetGroup": {"vpcId": "vpc-1"}}));
        let changes = classify(&RdsClassifier, &raw);
        assert_eq!(ids(&changes), vec!["arn:aws:ec2:us-west-2:111111111111:vpc/vpc-1"]);
        assert_eq!(changes[0].resource_type, ResourceType::Ec2Vpc);
    }

    #[test]
    fn test_snapshot_attribute_scans_region() {
        let changes = classify(&RdsClassifier, &event("ModifyDBSnapshotAttribute", json!({}), json!(null)));
        assert_eq!(changes[0].region, REGION);
        assert!(changes[0].is_scope_scan());
    }

    #[test]
    fn test_ignored_by_suffix() {
        for name in ["CreateDBCluster", "ModifyDBParameterGroup", "CreateEventSubscription", "CopyDBClusterSnapshot"] {
            assert!(classify(&RdsClassifier, &event(name, json!({}), json!(null))).is_empty());
        }
    }
}
