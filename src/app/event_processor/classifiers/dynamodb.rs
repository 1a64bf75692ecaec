//! Amazon DynamoDB tables
//!
//! Global table calls fan out to one change per replica region, all sharing
//! the global table name.

use super::{ignored, parse_arn, unknown, EventClassifier};
use crate::app::event_processor::event::{str_at, CloudTrailEvent};
use crate::app::event_processor::types::{ResourceChange, ResourceType};

const SERVICE: &str = "dynamodb";

const IGNORED_EVENTS: &[&str] = &[
    "BatchGetItem",
    "ConditionCheckItem",
    "DeleteBackup",
    "DeleteItem",
    "PutItem",
    "Query",
    "Scan",
    "UpdateItem",
    "BatchWriteItem",
];

pub struct DynamoDbClassifier;

fn table_arn(region: &str, account_id: &str, table_name: &str) -> String {
    format!("arn:aws:dynamodb:{}:{}:table/{}", region, account_id, table_name)
}

/// One change per replica region of a global table
fn replicas<'a>(
    account_id: &str,
    event_name: &str,
    table_name: &str,
    regions: impl Iterator<Item = &'a str>,
) -> Vec<ResourceChange> {
    regions
        .map(|region| {
            ResourceChange::new(
                account_id,
                ResourceType::DynamoDbTable,
                table_arn(region, account_id, table_name),
                event_name,
            )
        })
        .collect()
}

impl EventClassifier for DynamoDbClassifier {
    fn event_source(&self) -> &'static str {
        "dynamodb.amazonaws.com"
    }

    fn classify(&self, event: &CloudTrailEvent<'_>, account_id: &str) -> Vec<ResourceChange> {
        let event_name = event.event_name();

        // https://docs.aws.amazon.com/IAM/latest/UserGuide/list_amazondynamodb.html
        if IGNORED_EVENTS.contains(&event_name) {
            return ignored(SERVICE, event_name);
        }

        let region = event.region();
        let global_table = event.request("globalTableName");

        let table_id = match event_name {
            "CreateBackup" | "CreateTable" | "DeleteTable" | "UpdateContinuousBackups" | "UpdateTable"
            | "UpdateTimeToLive" => table_arn(region, account_id, event.request("tableName")),
            "CreateGlobalTable" => {
                let regions = event
                    .array_at("requestParameters.replicationGroup")
                    .iter()
                    .map(|replica| str_at(replica, "regionName"));
                return replicas(account_id, event_name, global_table, regions);
            }
            // Each update either creates or deletes one replica
            "UpdateGlobalTable" => {
                let regions = event
                    .array_at("requestParameters.replicaUpdates")
                    .iter()
                    .flat_map(|update| [str_at(update, "create.regionName"), str_at(update, "delete.regionName")])
                    .filter(|region| !region.is_empty());
                return replicas(account_id, event_name, global_table, regions);
            }
            "UpdateGlobalTableSettings" => {
                let regions = event
                    .array_at("responseElements.replicaSettings")
                    .iter()
                    .map(|replica| str_at(replica, "regionName"));
                return replicas(account_id, event_name, global_table, regions);
            }
            "RestoreTableFromBackup" | "RestoreTableToPointInTime" => {
                table_arn(region, account_id, event.request("targetTableName"))
            }
            "TagResource" | "UntagResource" => {
                match parse_arn(SERVICE, event_name, event.request("resourceArn")) {
                    Some(arn) => arn.to_string(),
                    None => return Vec::new(),
                }
            }
            _ => return unknown(SERVICE, event_name),
        };

        vec![ResourceChange::new(account_id, ResourceType::DynamoDbTable, table_id, event_name)
            .with_delete(event_name == "DeleteTable")]
    }
}
