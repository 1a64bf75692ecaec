//! Amazon EC2 instances, volumes, images, VPCs, security groups and network ACLs
//!
//! EC2 has by far the largest API surface of any supported service. Calls that
//! name a single resource are tabulated in [`SINGLE_RESOURCE_RULES`]; calls
//! against sub-resources we only track through their parent (routes, subnets,
//! snapshots, network interfaces) escalate to a region scan of the parent type.
//! Anything not listed gets a best-effort guess from identifier fields found
//! anywhere in the payload.

use serde_json::Value;
use tracing::{debug, error, info, warn};

use super::EventClassifier;
use crate::app::event_processor::event::{str_at, CloudTrailEvent};
use crate::app::event_processor::types::{ResourceChange, ResourceType};

const SERVICE: &str = "ec2";

/// EC2 resource kinds we build ARNs for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Ec2Kind {
    Image,
    Instance,
    NetworkAcl,
    SecurityGroup,
    Volume,
    Vpc,
}

impl Ec2Kind {
    fn resource_type(self) -> ResourceType {
        match self {
            Ec2Kind::Image => ResourceType::Ec2Ami,
            Ec2Kind::Instance => ResourceType::Ec2Instance,
            Ec2Kind::NetworkAcl => ResourceType::Ec2NetworkAcl,
            Ec2Kind::SecurityGroup => ResourceType::Ec2SecurityGroup,
            Ec2Kind::Volume => ResourceType::Ec2Volume,
            Ec2Kind::Vpc => ResourceType::Ec2Vpc,
        }
    }

    fn arn_prefix(self) -> &'static str {
        match self {
            Ec2Kind::Image => "image/",
            Ec2Kind::Instance => "instance/",
            Ec2Kind::NetworkAcl => "network-acl/",
            Ec2Kind::SecurityGroup => "security-group/",
            Ec2Kind::Volume => "volume/",
            Ec2Kind::Vpc => "vpc/",
        }
    }

    /// Resource kind implied by an EC2 id prefix, as used by the tagging APIs
    fn from_resource_id(id: &str) -> Option<Self> {
        if id.starts_with("image-") {
            Some(Ec2Kind::Image)
        } else if id.starts_with("instance-") || id.starts_with("i-") {
            Some(Ec2Kind::Instance)
        } else if id.starts_with("acl-") {
            Some(Ec2Kind::NetworkAcl)
        } else if id.starts_with("sg-") {
            Some(Ec2Kind::SecurityGroup)
        } else if id.starts_with("volume-") {
            Some(Ec2Kind::Volume)
        } else if id.starts_with("vpc-") {
            Some(Ec2Kind::Vpc)
        } else {
            None
        }
    }
}

/// Event name, path of the resource id within the event, kind of resource, delete flag
type SingleResourceRule = (&'static str, &'static str, Ec2Kind, bool);

const SINGLE_RESOURCE_RULES: &[SingleResourceRule] = &[
    ("AssociateAddress", "requestParameters.instanceId", Ec2Kind::Instance, false),
    ("ModifyInstanceAttribute", "requestParameters.instanceId", Ec2Kind::Instance, false),
    ("AttachNetworkInterface", "requestParameters.instanceId", Ec2Kind::Instance, false),
    ("ModifyInstanceCapacityReservationAttributes", "requestParameters.instanceId", Ec2Kind::Instance, false),
    ("ModifyInstanceCreditSpecificationResponse", "requestParameters.instanceId", Ec2Kind::Instance, false),
    ("ResetInstanceAttribute", "requestParameters.instanceId", Ec2Kind::Instance, false),
    ("CreateNetworkAclEntry", "requestParameters.networkAclId", Ec2Kind::NetworkAcl, false),
    ("DeleteNetworkAclEntry", "requestParameters.networkAclId", Ec2Kind::NetworkAcl, false),
    ("ReplaceNetworkAclAssociation", "requestParameters.networkAclId", Ec2Kind::NetworkAcl, false),
    ("ReplaceNetworkAclEntry", "requestParameters.networkAclId", Ec2Kind::NetworkAcl, false),
    ("AuthorizeSecurityGroupEgress", "requestParameters.groupId", Ec2Kind::SecurityGroup, false),
    ("AuthorizeSecurityGroupIngress", "requestParameters.groupId", Ec2Kind::SecurityGroup, false),
    ("RevokeSecurityGroupEgress", "requestParameters.groupId", Ec2Kind::SecurityGroup, false),
    ("RevokeSecurityGroupIngress", "requestParameters.groupId", Ec2Kind::SecurityGroup, false),
    ("CreateRouteTable", "requestParameters.vpcId", Ec2Kind::Vpc, false),
    ("AttachInternetGateway", "requestParameters.vpcId", Ec2Kind::Vpc, false),
    ("CreateSubnet", "requestParameters.vpcId", Ec2Kind::Vpc, false),
    ("AssociateDhcpOptions", "requestParameters.vpcId", Ec2Kind::Vpc, false),
    ("ModifyVpcAttribute", "requestParameters.vpcId", Ec2Kind::Vpc, false),
    ("ModifyVpcTenancy", "requestParameters.vpcId", Ec2Kind::Vpc, false),
    ("CreateSnapshot", "requestParameters.volumeId", Ec2Kind::Volume, false),
    ("ModifyVolume", "requestParameters.volumeId", Ec2Kind::Volume, false),
    ("ModifyVolumeAttribute", "requestParameters.volumeId", Ec2Kind::Volume, false),
    ("ModifyImageAttribute", "requestParameters.imageId", Ec2Kind::Image, false),
    ("ResetImageAttribute", "requestParameters.imageId", Ec2Kind::Image, false),
    ("DeleteSecurityGroup", "requestParameters.groupId", Ec2Kind::SecurityGroup, true),
    ("DeleteNetworkAcl", "requestParameters.networkAclId", Ec2Kind::NetworkAcl, true),
    ("DeleteVolume", "requestParameters.volumeId", Ec2Kind::Volume, true),
    ("CreateFlowLogs", "requestParameters.CreateFlowLogsRequest.ResourceId.content", Ec2Kind::Vpc, false),
    ("AssociateIamInstanceProfile", "requestParameters.AssociateIamInstanceProfileRequest.InstanceId", Ec2Kind::Instance, false),
    ("AssociateVpcCidrBlock", "requestParameters.AssociateVpcCidrBlockRequest.VpcId", Ec2Kind::Vpc, false),
    ("DisassociateVpcCidrBlock", "responseElements.DisassociateVpcCidrBlockResponse.vpcId", Ec2Kind::Vpc, false),
    ("CreateVolume", "responseElements.volumeId", Ec2Kind::Volume, false),
    ("CreateDefaultSubnet", "responseElements.subnet.vpcId", Ec2Kind::Vpc, false),
    ("CreateDefaultVpc", "responseElements.vpc.vpcId", Ec2Kind::Vpc, false),
    ("ImportImage", "responseElements.imageId", Ec2Kind::Image, false),
    ("ImportInstance", "responseElements.conversionTask.instanceId", Ec2Kind::Instance, false),
    ("ImportVolume", "responseElements.conversionTask.volume.id", Ec2Kind::Volume, false),
    ("ReplaceIamInstanceProfileAssociation", "responseElements.iamInstanceProfileAssociation.instanceId", Ec2Kind::Instance, false),
];

/// Calls on sub-resources tracked as part of a parent; the whole region of the parent type is rescanned
const REGION_SCAN_RULES: &[(&str, ResourceType)] = &[
    ("DisassociateRouteTable", ResourceType::Ec2Vpc),
    ("AssociateRouteTable", ResourceType::Ec2Vpc),
    ("DeleteRouteTable", ResourceType::Ec2Vpc),
    ("ReplaceRoute", ResourceType::Ec2Vpc),
    ("CreateRoute", ResourceType::Ec2Vpc),
    ("DeleteRoute", ResourceType::Ec2Vpc),
    ("AssociateSubnetCidrBlock", ResourceType::Ec2Vpc),
    ("DeleteSubnet", ResourceType::Ec2Vpc),
    ("DisassociateSubnetCidrBlock", ResourceType::Ec2Vpc),
    ("ModifySubnetAttribute", ResourceType::Ec2Vpc),
    ("ModifyVpcPeeringConnectionOptions", ResourceType::Ec2Vpc),
    ("DeleteFlowLogs", ResourceType::Ec2Vpc),
    ("CreateNetworkInterface", ResourceType::Ec2Vpc),
    ("ReplaceRouteTableAssociation", ResourceType::Ec2Vpc),
    ("DeleteSnapshot", ResourceType::Ec2Volume),
    ("ModifySnapshotAttribute", ResourceType::Ec2Volume),
    ("DetachNetworkInterface", ResourceType::Ec2Instance),
];

/// Identifier fields tried, in order, for calls we have no rule for
const GUESS_FIELDS: &[(&str, Ec2Kind)] = &[
    ("instanceId", Ec2Kind::Instance),
    ("networkAclId", Ec2Kind::NetworkAcl),
    ("groupId", Ec2Kind::SecurityGroup),
    ("volumeId", Ec2Kind::Volume),
    ("vpcId", Ec2Kind::Vpc),
];

pub struct Ec2Classifier;

/// Builds EC2 ARNs for one event
struct Ec2Event<'e, 'a> {
    event: &'e CloudTrailEvent<'a>,
    account_id: &'e str,
    event_name: &'a str,
    region: &'a str,
}

impl Ec2Event<'_, '_> {
    fn arn(&self, account_id: &str, kind: Ec2Kind, id: &str) -> String {
        format!("arn:aws:ec2:{}:{}:{}{}", self.region, account_id, kind.arn_prefix(), id)
    }

    fn change(&self, kind: Ec2Kind, id: &str) -> ResourceChange {
        ResourceChange::new(
            self.account_id,
            kind.resource_type(),
            self.arn(self.account_id, kind, id),
            self.event_name,
        )
    }

    fn region_scan(&self, resource_type: ResourceType) -> Vec<ResourceChange> {
        vec![ResourceChange::region_scan(self.account_id, resource_type, self.region, self.event_name)]
    }

    /// One change per `instanceId` in a list of instance items
    fn instances(&self, items: &[Value]) -> Vec<ResourceChange> {
        items
            .iter()
            .map(|item| self.change(Ec2Kind::Instance, str_at(item, "instanceId")))
            .collect()
    }

    /// Both VPCs in a peering connection; a VPC owned by another account is not ours to scan
    fn peering(&self) -> Vec<ResourceChange> {
        ["requesterVpcInfo", "accepterVpcInfo"]
            .iter()
            .filter_map(|side| {
                let info = self.event.get(&format!("responseElements.vpcPeeringConnection.{}", side))?;
                let owner = str_at(info, "ownerId");
                if owner != self.account_id {
                    info!(owner, account_id = self.account_id, "ec2: discarding resource from another account");
                    return None;
                }
                let vpc_arn = format!("arn:aws:ec2:{}:{}:vpc/{}", str_at(info, "region"), owner, str_at(info, "vpcId"));
                Some(ResourceChange::new(owner, ResourceType::Ec2Vpc, vpc_arn, self.event_name))
            })
            .collect()
    }

    /// Tag calls can touch any mix of EC2 resources; the id prefix tells them apart
    fn tagged_resources(&self) -> Vec<ResourceChange> {
        self.event
            .array_at("requestParameters.resourcesSet.items")
            .iter()
            .filter_map(|item| {
                let id = str_at(item, "resourceId");
                match Ec2Kind::from_resource_id(id) {
                    Some(kind) => Some(self.change(kind, id)),
                    None => {
                        debug!(resource_id = id, "ec2: unsupported resource");
                        None
                    }
                }
            })
            .collect()
    }

    /// Launches report the owning account alongside the instances
    fn launched_instances(&self) -> Vec<ResourceChange> {
        let owner = match self.event.response("ownerId") {
            "" => self.account_id,
            owner => owner,
        };
        self.event
            .array_at("responseElements.instancesSet.items")
            .iter()
            .map(|item| {
                ResourceChange::new(
                    owner,
                    ResourceType::Ec2Instance,
                    self.arn(owner, Ec2Kind::Instance, str_at(item, "instanceId")),
                    self.event_name,
                )
            })
            .collect()
    }

    /// Unlisted call: guess from the first known identifier field in the payload
    fn guess(&self) -> Vec<ResourceChange> {
        info!(event_name = self.event_name, "ec2: unknown API call, making a guess...");
        for (field, kind) in GUESS_FIELDS {
            if let Some(id) = self.event.find_str(field) {
                return vec![self.change(*kind, id)];
            }
        }
        warn!(event_name = self.event_name, "ec2: encountered unknown event name");
        Vec::new()
    }
}

impl EventClassifier for Ec2Classifier {
    fn event_source(&self) -> &'static str {
        "ec2.amazonaws.com"
    }

    fn classify(&self, event: &CloudTrailEvent<'_>, account_id: &str) -> Vec<ResourceChange> {
        // https://docs.aws.amazon.com/IAM/latest/UserGuide/list_amazonec2.html
        let ec2 = Ec2Event {
            event,
            account_id,
            event_name: event.event_name(),
            region: event.region(),
        };
        let event_name = ec2.event_name;

        if let Some((_, path, kind, delete)) = SINGLE_RESOURCE_RULES.iter().find(|rule| rule.0 == event_name) {
            let id = event.str_at(path);
            if id.is_empty() {
                error!(event_name, path, "ec2: missing resource id");
                return Vec::new();
            }
            return vec![ec2.change(*kind, id).with_delete(*delete)];
        }

        if let Some((_, resource_type)) = REGION_SCAN_RULES.iter().find(|rule| rule.0 == event_name) {
            return ec2.region_scan(*resource_type);
        }

        match event_name {
            "AttachVolume" | "DetachVolume" => vec![
                ec2.change(Ec2Kind::Instance, event.request("instanceId")),
                ec2.change(Ec2Kind::Volume, event.request("volumeId")),
            ],
            "ModifyInstanceCreditSpecification" => {
                ec2.instances(event.array_at("responseElements.ModifyInstanceCreditSpecificationResponse.items"))
            }
            "TerminateInstances" => ec2
                .instances(event.array_at("requestParameters.instancesSet.items"))
                .into_iter()
                .map(|change| change.with_delete(true))
                .collect(),
            "MonitorInstances" | "UnmonitorInstances" | "StartInstances" | "StopInstances" => {
                ec2.instances(event.array_at("requestParameters.instancesSet.items"))
            }
            "RunInstances" | "RunScheduledInstances" => ec2.launched_instances(),
            // New ACL plus the VPC that now references it
            "CreateNetworkAcl" => vec![
                ec2.change(Ec2Kind::Vpc, event.response("networkAcl.vpcId")),
                ec2.change(Ec2Kind::NetworkAcl, event.response("networkAcl.networkAclId")),
            ],
            "CreateSecurityGroup" => vec![
                ec2.change(Ec2Kind::Vpc, event.request("vpcId")),
                ec2.change(Ec2Kind::SecurityGroup, event.response("groupId")),
            ],
            "AcceptVpcPeeringConnection" => ec2.peering(),
            "CreateTags" | "DeleteTags" => ec2.tagged_resources(),
            "CreateVpc" => {
                let owner = match event.response("vpc.ownerId") {
                    "" => account_id,
                    owner => owner,
                };
                vec![ResourceChange::new(
                    owner,
                    ResourceType::Ec2Vpc,
                    ec2.arn(owner, Ec2Kind::Vpc, event.response("vpc.vpcId")),
                    event_name,
                )]
            }
            // Default-VPC requests may name the group instead of its id
            "UpdateSecurityGroupRuleDescriptionsEgress" | "UpdateSecurityGroupRuleDescriptionsIngress" => {
                match event.request("groupId") {
                    "" => ec2.region_scan(ResourceType::Ec2SecurityGroup),
                    group_id => vec![ec2.change(Ec2Kind::SecurityGroup, group_id)],
                }
            }
            // Without an association id this is an EC2-Classic address, which isn't tracked
            "DisassociateAddress" => {
                if event.request("associationId").is_empty() {
                    Vec::new()
                } else {
                    ec2.region_scan(ResourceType::Ec2Vpc)
                }
            }
            // Either side of the connection may be in any region
            "DeleteVpcPeeringConnection" => {
                vec![ResourceChange::account_scan(account_id, ResourceType::Ec2Vpc, event_name)]
            }
            _ => ec2.guess(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    const BASE: &str = "arn:aws:ec2:us-west-2:111111111111:";

    fn arn(resource: &str) -> String {
        format!("{}{}", BASE, resource)
    }

    #[test]
    fn test_single_resource_rules() {
        let raw = event("AuthorizeSecurityGroupIngress", json!({"groupId": "sg-1"}), json!(null));
        let changes = classify(&Ec2Classifier, &raw);
        assert_eq!(ids(&changes), vec![arn("security-group/sg-1")]);
        assert_eq!(changes[0].resource_type, ResourceType::Ec2SecurityGroup);

        let raw = event("ImportVolume", json!({}), json!({"conversionTask": {"volume": {"id": "vol-9"}}}));
        assert_eq!(ids(&classify(&Ec2Classifier, &raw)), vec![arn("volume/vol-9")]);
    }

    #[test]
    fn test_delete_rules() {
        let raw = event("DeleteNetworkAcl", json!({"networkAclId": "acl-1"}), json!(null));
        let changes = classify(&Ec2Classifier, &raw);
        assert_eq!(ids(&changes), vec![arn("network-acl/acl-1")]);
        assert!(changes[0].delete);
    }

    #[test]
    fn test_missing_id_dropped() {
        let raw = event("ModifyVolume", json!({}), json!(null));
        assert!(classify(&Ec2Classifier, &raw).is_empty());
    }

    #[test]
    fn test_terminate_instances_fan_out() {
        let raw = event(
            "TerminateInstances",
            json!({"instancesSet": {"items": [{"instanceId": "i-1"}, {"instanceId": "i-2"}]}}),
            json!(null),
        );
        let changes = classify(&Ec2Classifier, &raw);
        assert_eq!(ids(&changes), vec![arn("instance/i-1"), arn("instance/i-2")]);
        assert!(changes.iter().all(|c| c.delete));
    }

    #[test]
    fn test_run_instances_uses_owner() {
        let raw = event(
            "RunInstances",
            json!({}),
            json!({"ownerId": "111111111111", "instancesSet": {"items": [{"instanceId": "i-7"}]}}),
        );
        let changes = classify(&Ec2Classifier, &raw);
        assert_eq!(ids(&changes), vec![arn("instance/i-7")]);
        assert!(!changes[0].delete);
    }

    #[test]
    fn test_attach_volume_pair() {
        let raw = event("AttachVolume", json!({"instanceId": "i-1", "volumeId": "vol-1"}), json!(null));
        let changes = classify(&Ec2Classifier, &raw);
        assert_eq!(ids(&changes), vec![arn("instance/i-1"), arn("volume/vol-1")]);
        assert_eq!(changes[1].resource_type, ResourceType::Ec2Volume);
    }

    #[test]
    fn test_create_tags_by_prefix() {
        let raw = event(
            "CreateTags",
            json!({"resourcesSet": {"items": [
                {"resourceId": "i-0abc"},
                {"resourceId": "sg-1"},
                {"resourceId": "vpc-2"},
                {"resourceId": "subnet-3"},
                {"resourceId": "image-4"},
            ]}}),
            json!(null),
        );
        let changes = classify(&Ec2Classifier, &raw);
        assert_eq!(
            ids(&changes),
            vec![
                arn("instance/i-0abc"),
                arn("security-group/sg-1"),
                arn("vpc/vpc-2"),
                arn("image/image-4"),
            ]
        );
        assert_eq!(changes[3].resource_type, ResourceType::Ec2Ami);
    }

    #[test]
    fn test_sub_resources_scan_region() {
        let changes = classify(&Ec2Classifier, &event("CreateRoute", json!({"routeTableId": "rtb-1"}), json!(null)));
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].resource_type, ResourceType::Ec2Vpc);
        assert_eq!(changes[0].region, REGION);
        assert!(changes[0].is_scope_scan());

        let changes = classify(&Ec2Classifier, &event("DeleteSnapshot", json!({}), json!(null)));
        assert_eq!(changes[0].resource_type, ResourceType::Ec2Volume);
    }

    #[test]
    fn test_peering_drops_foreign_vpc() {
        let raw = event(
            "AcceptVpcPeeringConnection",
            json!({"vpcPeeringConnectionId": "pcx-1"}),
            json!({"vpcPeeringConnection": {
                "requesterVpcInfo": {"ownerId": "222222222222", "region": "us-east-1", "vpcId": "vpc-r"},
                "accepterVpcInfo": {"ownerId": "111111111111", "region": "us-west-2", "vpcId": "vpc-a"},
            }}),
        );
        assert_eq!(ids(&classify(&Ec2Classifier, &raw)), vec![arn("vpc/vpc-a")]);
    }

    #[test]
    fn test_security_group_descriptions_without_id() {
        let raw = event("UpdateSecurityGroupRuleDescriptionsIngress", json!({"groupName": "default"}), json!(null));
        let changes = classify(&Ec2Classifier, &raw);
        assert_eq!(changes[0].resource_type, ResourceType::Ec2SecurityGroup);
        assert_eq!(changes[0].region, REGION);
        assert!(changes[0].is_scope_scan());
    }

    #[test]
    fn test_disassociate_address() {
        let raw = event("DisassociateAddress", json!({"publicIp": "1.2.3.4"}), json!(null));
        assert!(classify(&Ec2Classifier, &raw).is_empty());

        let raw = event("DisassociateAddress", json!({"associationId": "eipassoc-1"}), json!(null));
        assert_eq!(classify(&Ec2Classifier, &raw)[0].resource_type, ResourceType::Ec2Vpc);
    }

    #[test]
    fn test_delete_peering_scans_account() {
        let changes = classify(&Ec2Classifier, &event("DeleteVpcPeeringConnection", json!({}), json!(null)));
        assert!(changes[0].is_scope_scan());
        assert_eq!(changes[0].region, "");
    }

    #[test]
    fn test_guess_priority() {
        let raw = event(
            "EnableVolumeIO",
            json!({"nested": {"deeper": {"vpcId": "vpc-1", "volumeId": "vol-1"}}}),
            json!(null),
        );
        let changes = classify(&Ec2Classifier, &raw);
        assert_eq!(ids(&changes), vec![arn("volume/vol-1")]);
        assert_eq!(changes[0].resource_type, ResourceType::Ec2Volume);

        let raw = event("SomethingNew", json!({"vpcId": "vpc-1"}), json!(null));
        assert_eq!(classify(&Ec2Classifier, &raw)[0].resource_type, ResourceType::Ec2Vpc);
    }

    #[test]
    fn test_guess_gives_up() {
        let raw = event("SomethingNew", json!({"keyName": "k"}), json!(null));
        assert!(classify(&Ec2Classifier, &raw).is_empty());
    }
}
