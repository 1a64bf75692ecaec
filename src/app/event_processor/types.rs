//! Data types for CloudTrail event processing
//!
//! [`ResourceChange`] is what every classifier produces. [`ScanMsg`] and
//! [`DeleteResources`] are the wire shapes handed to the snapshot poller queue
//! and the resources API respectively.

#![warn(clippy::all, rust_2018_idioms)]

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Pseudo-region used for resources that live outside any AWS region (global WAF)
pub const GLOBAL_REGION: &str = "global";

/// Delay applied to CloudFormation stack scans so drift detection sees settled state
pub const CLOUDFORMATION_SCAN_DELAY_SECS: i64 = 120;

/// Closed set of resource type tags understood by the snapshot pollers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ResourceType {
    #[serde(rename = "AWS.ACM.Certificate")]
    AcmCertificate,
    #[serde(rename = "AWS.CloudFormation.Stack")]
    CloudFormationStack,
    #[serde(rename = "AWS.CloudTrail")]
    CloudTrail,
    #[serde(rename = "AWS.CloudTrail.Meta")]
    CloudTrailMeta,
    #[serde(rename = "AWS.Config.Recorder")]
    ConfigRecorder,
    #[serde(rename = "AWS.Config.Recorder.Meta")]
    ConfigRecorderMeta,
    #[serde(rename = "AWS.DynamoDB.Table")]
    DynamoDbTable,
    #[serde(rename = "AWS.EC2.AMI")]
    Ec2Ami,
    #[serde(rename = "AWS.EC2.Instance")]
    Ec2Instance,
    #[serde(rename = "AWS.EC2.NetworkACL")]
    Ec2NetworkAcl,
    #[serde(rename = "AWS.EC2.SecurityGroup")]
    Ec2SecurityGroup,
    #[serde(rename = "AWS.EC2.Snapshot")]
    Ec2Snapshot,
    #[serde(rename = "AWS.EC2.Volume")]
    Ec2Volume,
    #[serde(rename = "AWS.EC2.VPC")]
    Ec2Vpc,
    #[serde(rename = "AWS.ELBV2.ApplicationLoadBalancer")]
    Elbv2ApplicationLoadBalancer,
    #[serde(rename = "AWS.GuardDuty.Detector")]
    GuardDutyDetector,
    #[serde(rename = "AWS.GuardDuty.Detector.Meta")]
    GuardDutyDetectorMeta,
    #[serde(rename = "AWS.IAM.Group")]
    IamGroup,
    #[serde(rename = "AWS.IAM.Policy")]
    IamPolicy,
    #[serde(rename = "AWS.IAM.Role")]
    IamRole,
    #[serde(rename = "AWS.IAM.RootUser")]
    IamRootUser,
    #[serde(rename = "AWS.IAM.User")]
    IamUser,
    #[serde(rename = "AWS.PasswordPolicy")]
    PasswordPolicy,
    #[serde(rename = "AWS.KMS.Key")]
    KmsKey,
    #[serde(rename = "AWS.Lambda.Function")]
    LambdaFunction,
    #[serde(rename = "AWS.CloudWatch.LogGroup")]
    CloudWatchLogGroup,
    #[serde(rename = "AWS.RDS.Instance")]
    RdsInstance,
    #[serde(rename = "AWS.Redshift.Cluster")]
    RedshiftCluster,
    #[serde(rename = "AWS.S3.Bucket")]
    S3Bucket,
    #[serde(rename = "AWS.WAF.WebACL")]
    WafWebAcl,
    #[serde(rename = "AWS.WAF.Regional.WebACL")]
    WafRegionalWebAcl,
}

impl ResourceType {
    /// Every tag, in declaration order
    pub const ALL: [ResourceType; 31] = [
        ResourceType::AcmCertificate,
        ResourceType::CloudFormationStack,
        ResourceType::CloudTrail,
        ResourceType::CloudTrailMeta,
        ResourceType::ConfigRecorder,
        ResourceType::ConfigRecorderMeta,
        ResourceType::DynamoDbTable,
        ResourceType::Ec2Ami,
        ResourceType::Ec2Instance,
        ResourceType::Ec2NetworkAcl,
        ResourceType::Ec2SecurityGroup,
        ResourceType::Ec2Snapshot,
        ResourceType::Ec2Volume,
        ResourceType::Ec2Vpc,
        ResourceType::Elbv2ApplicationLoadBalancer,
        ResourceType::GuardDutyDetector,
        ResourceType::GuardDutyDetectorMeta,
        ResourceType::IamGroup,
        ResourceType::IamPolicy,
        ResourceType::IamRole,
        ResourceType::IamRootUser,
        ResourceType::IamUser,
        ResourceType::PasswordPolicy,
        ResourceType::KmsKey,
        ResourceType::LambdaFunction,
        ResourceType::CloudWatchLogGroup,
        ResourceType::RdsInstance,
        ResourceType::RedshiftCluster,
        ResourceType::S3Bucket,
        ResourceType::WafWebAcl,
        ResourceType::WafRegionalWebAcl,
    ];

    /// Wire tag as the snapshot pollers expect it
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceType::AcmCertificate => "AWS.ACM.Certificate",
            ResourceType::CloudFormationStack => "AWS.CloudFormation.Stack",
            ResourceType::CloudTrail => "AWS.CloudTrail",
            ResourceType::CloudTrailMeta => "AWS.CloudTrail.Meta",
            ResourceType::ConfigRecorder => "AWS.Config.Recorder",
            ResourceType::ConfigRecorderMeta => "AWS.Config.Recorder.Meta",
            ResourceType::DynamoDbTable => "AWS.DynamoDB.Table",
            ResourceType::Ec2Ami => "AWS.EC2.AMI",
            ResourceType::Ec2Instance => "AWS.EC2.Instance",
            ResourceType::Ec2NetworkAcl => "AWS.EC2.NetworkACL",
            ResourceType::Ec2SecurityGroup => "AWS.EC2.SecurityGroup",
            ResourceType::Ec2Snapshot => "AWS.EC2.Snapshot",
            ResourceType::Ec2Volume => "AWS.EC2.Volume",
            ResourceType::Ec2Vpc => "AWS.EC2.VPC",
            ResourceType::Elbv2ApplicationLoadBalancer => "AWS.ELBV2.ApplicationLoadBalancer",
            ResourceType::GuardDutyDetector => "AWS.GuardDuty.Detector",
            ResourceType::GuardDutyDetectorMeta => "AWS.GuardDuty.Detector.Meta",
            ResourceType::IamGroup => "AWS.IAM.Group",
            ResourceType::IamPolicy => "AWS.IAM.Policy",
            ResourceType::IamRole => "AWS.IAM.Role",
            ResourceType::IamRootUser => "AWS.IAM.RootUser",
            ResourceType::IamUser => "AWS.IAM.User",
            ResourceType::PasswordPolicy => "AWS.PasswordPolicy",
            ResourceType::KmsKey => "AWS.KMS.Key",
            ResourceType::LambdaFunction => "AWS.Lambda.Function",
            ResourceType::CloudWatchLogGroup => "AWS.CloudWatch.LogGroup",
            ResourceType::RdsInstance => "AWS.RDS.Instance",
            ResourceType::RedshiftCluster => "AWS.Redshift.Cluster",
            ResourceType::S3Bucket => "AWS.S3.Bucket",
            ResourceType::WafWebAcl => "AWS.WAF.WebACL",
            ResourceType::WafRegionalWebAcl => "AWS.WAF.Regional.WebACL",
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ResourceType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| anyhow::anyhow!("unknown resource type: {}", s))
    }
}

/// A single "this resource may have changed" signal
///
/// Exactly one of these holds:
/// - `resource_id` non-empty: scan (or delete) that resource
/// - `resource_id` and `region` empty: scan every resource of this type in the account
/// - `region` non-empty, `resource_id` empty: scan every resource of this type in the region
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceChange {
    /// The 12-digit AWS account ID which owns the resource
    pub aws_account_id: String,
    /// Seconds to delay the resulting scan request
    #[serde(rename = "delay")]
    pub delay_seconds: i64,
    /// True if the resource should be removed from inventory instead of rescanned
    pub delete: bool,
    /// CloudTrail event name (diagnostics only)
    pub event_name: String,
    /// RFC3339 event timestamp, stamped by the dispatcher
    pub event_time: String,
    /// Account integration ID, stamped by the dispatcher
    pub integration_id: String,
    /// Region, for region-wide scans only
    pub region: String,
    /// e.g. "arn:aws:s3:::my-bucket"
    pub resource_id: String,
    pub resource_type: ResourceType,
}

impl ResourceChange {
    /// Single-resource change
    pub fn new(
        account_id: impl Into<String>,
        resource_type: ResourceType,
        resource_id: impl Into<String>,
        event_name: impl Into<String>,
    ) -> Self {
        Self {
            aws_account_id: account_id.into(),
            delay_seconds: 0,
            delete: false,
            event_name: event_name.into(),
            event_time: String::new(),
            integration_id: String::new(),
            region: String::new(),
            resource_id: resource_id.into(),
            resource_type,
        }
    }

    /// Scan of every resource of this type in the account
    pub fn account_scan(
        account_id: impl Into<String>,
        resource_type: ResourceType,
        event_name: impl Into<String>,
    ) -> Self {
        Self::new(account_id, resource_type, String::new(), event_name)
    }

    /// Scan of every resource of this type in one region
    pub fn region_scan(
        account_id: impl Into<String>,
        resource_type: ResourceType,
        region: impl Into<String>,
        event_name: impl Into<String>,
    ) -> Self {
        Self::account_scan(account_id, resource_type, event_name).with_region(region)
    }

    pub fn with_delete(mut self, delete: bool) -> Self {
        self.delete = delete;
        self
    }

    pub fn with_delay_seconds(mut self, delay_seconds: i64) -> Self {
        self.delay_seconds = delay_seconds;
        self
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }

    /// True when this change names no specific resource
    pub fn is_scope_scan(&self) -> bool {
        self.resource_id.is_empty()
    }
}

/// One entry of a poller scan request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanEntry {
    pub aws_account_id: String,
    pub integration_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_id: Option<String>,
    pub resource_type: ResourceType,
    pub scan_all_resources: bool,
}

impl From<&ResourceChange> for ScanEntry {
    fn from(change: &ResourceChange) -> Self {
        let non_empty = |s: &str| (!s.is_empty()).then(|| s.to_string());
        Self {
            aws_account_id: change.aws_account_id.clone(),
            integration_id: change.integration_id.clone(),
            region: non_empty(&change.region),
            resource_id: non_empty(&change.resource_id),
            resource_type: change.resource_type,
            scan_all_resources: false,
        }
    }
}

/// Message body sent to the poller queue, one per delay bucket
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanMsg {
    pub entries: Vec<ScanEntry>,
}

/// One resource to remove from inventory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteEntry {
    pub id: String,
}

/// Bulk delete request body for the resources API
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteResources {
    pub resources: Vec<DeleteEntry>,
}

impl DeleteResources {
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}
