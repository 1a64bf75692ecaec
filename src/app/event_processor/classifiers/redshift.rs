//! Amazon Redshift clusters

use super::{ignored, parse_arn, unknown, EventClassifier};
use crate::app::event_processor::event::{str_at, CloudTrailEvent};
use crate::app::event_processor::types::{ResourceChange, ResourceType};

const SERVICE: &str = "redshift";

const IGNORED_EVENTS: &[&str] = &[
    "AcceptReservedNodeExchange",
    "CreateClusterSecurityGroup",
    "CreateHsmClientCertificate",
    "CreateHsmConfiguration",
    "DeleteClusterParameterGroup",
    "DeleteClusterSecurityGroup",
    "DeleteClusterSubnetGroup",
    "DeleteEventSubscription",
    "DeleteHsmClientCertificate",
    "DeleteHsmConfiguration",
    "DeleteSnapshotCopyGrant",
    "DeleteSnapshotSchedule",
    "ModifyClusterParameterGroup",
    "ModifyClusterSubnetGroup",
    "ResetClusterParameterGroup",
    "RevokeClusterSecurityGroupIngress",
    "CreateClusterParameterGroup",
];

const CLUSTER_EVENTS: &[&str] = &[
    "CancelResize",
    "CreateCluster",
    "CreateClusterSnapshot",
    "DeleteCluster",
    "DisableLogging",
    "DisableSnapshotCopy",
    "EnableLogging",
    "EnableSnapshotCopy",
    "ModifyCluster",
    "ModifyClusterDbRevision",
    "ModifyClusterIamRoles",
    "ModifyClusterMaintenance",
    "ModifyClusterSnapshotSchedule",
    "ModifySnapshotCopyRetentionPeriod",
    "RebootCluster",
    "ResizeCluster",
    "RestoreFromClusterSnapshot",
    "ClusterIdentifier",
    "RotateEncryptionKey",
];

pub struct RedshiftClassifier;

impl EventClassifier for RedshiftClassifier {
    fn event_source(&self) -> &'static str {
        "redshift.amazonaws.com"
    }

    fn classify(&self, event: &CloudTrailEvent<'_>, account_id: &str) -> Vec<ResourceChange> {
        let event_name = event.event_name();

        if IGNORED_EVENTS.contains(&event_name) {
            return ignored(SERVICE, event_name);
        }

        // https://docs.aws.amazon.com/IAM/latest/UserGuide/list_amazonredshift.html
        let region = event.region();
        let cluster = |identifier: &str| {
            ResourceChange::new(
                account_id,
                ResourceType::RedshiftCluster,
                format!("arn:aws:redshift:{}:{}:cluster:{}", region, account_id, identifier),
                event_name,
            )
        };

        if CLUSTER_EVENTS.contains(&event_name) {
            return vec![cluster(event.request("clusterIdentifier")).with_delete(event_name == "DeleteCluster")];
        }

        match event_name {
            // Snapshots are tracked as part of their cluster
            "AuthorizeSnapshotAccess" | "CopyClusterSnapshot" | "DeleteClusterSnapshot" | "ModifyClusterSnapshot"
            | "RevokeSnapshotAccess" => vec![cluster(event.response("snapshot.clusterIdentifier"))],
            // No way to tie these back to one cluster
            "AuthorizeClusterSecurityGroupIngress"
            | "BatchDeleteClusterSnapshots"
            | "BatchModifyClusterSnapshots"
            | "CreateSnapshotCopyGrant" => {
                vec![ResourceChange::region_scan(account_id, ResourceType::RedshiftCluster, region, event_name)]
            }
            "CreateClusterSubnetGroup" => vec![ResourceChange::new(
                account_id,
                ResourceType::Ec2Vpc,
                format!(
                    "arn:aws:ec2:{}:{}:vpc/{}",
                    region,
                    account_id,
                    event.response("clusterSubnetGroup.vpcId")
                ),
                event_name,
            )],
            "CreateEventSubscription" | "ModifyEventSubscription" => {
                let source_type = event.request("sourceType");
                let source_ids = event.array_at("requestParameters.sourceIds");

                match source_type {
                    "" => vec![ResourceChange::account_scan(account_id, ResourceType::RedshiftCluster, event_name)],
                    "cluster" if source_ids.is_empty() => {
                        vec![ResourceChange::account_scan(account_id, ResourceType::RedshiftCluster, event_name)]
                    }
                    "cluster" => source_ids
                        .iter()
                        .map(|id| cluster(id.as_str().unwrap_or("")))
                        .collect(),
                    // Subscriptions for snapshots, parameter groups etc.
                    _ => Vec::new(),
                }
            }
            "CreateSnapshotSchedule" | "ModifySnapshotSchedule" => event
                .array_at("responseElements.associatedClusters")
                .iter()
                .map(|associated| cluster(str_at(associated, "clusterIdentifier")))
                .collect(),
            "CreateTags" | "DeleteTags" => match parse_arn(SERVICE, event_name, event.request("resourceName")) {
                Some(tagged) if tagged.resource.starts_with("cluster:") => vec![ResourceChange::new(
                    account_id,
                    ResourceType::RedshiftCluster,
                    tagged.to_string(),
                    event_name,
                )],
                _ => Vec::new(),
            },
            _ => unknown(SERVICE, event_name),
        }
    }
}
