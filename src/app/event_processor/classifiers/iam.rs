//! AWS IAM users, groups, roles, policies and the account password policy
//!
//! IAM is global, so synthesized ARNs have no region. The root user appears in
//! request parameters under the literal name [`ROOT_USER_NAME`].

use super::{ignored, parse_arn, unknown, EventClassifier};
use crate::app::event_processor::arn::Arn;
use crate::app::event_processor::event::CloudTrailEvent;
use crate::app::event_processor::types::{ResourceChange, ResourceType};

const SERVICE: &str = "iam";

/// How CloudTrail names the root user in IAM request parameters
pub const ROOT_USER_NAME: &str = "AWS ROOT USER";

const IGNORED_EVENTS: &[&str] = &[
    "ChangePassword",
    "ResetServiceSpecificCredential",
    "GenerateCredentialReport",
    // Virtual MFA devices are unrelated to users until (Enable|Deactivate)MFADevice
    "CreateVirtualMFADevice",
    "DeleteVirtualMFADevice",
    "CreateInstanceProfile",
];

const USER_CREDENTIAL_EVENTS: &[&str] = &[
    "CreateAccessKey",
    "CreateLoginProfile",
    "CreateServiceSpecificCredential",
    "CreateUser",
    "DeactivateMFADevice",
    "DeleteLoginProfile",
    "DeleteSSHPublicKey",
    "DeleteServiceSpecificCredential",
    "DeleteSigningCertificate",
    "DeleteUserPermissionsBoundary",
    "DeleteUserPolicy",
    "EnableMFADevice",
    "PutUserPermissionsBoundary",
    "PutUserPolicy",
    "TagUser",
    "UntagUser",
    "UpdateAccessKey",
    "UpdateLoginProfile",
    "UpdateSSHPublicKey",
    "UpdateServiceSpecificCredential",
    "UpdateSigningCertificate",
    "UploadSSHPublicKey",
    "UploadSigningCertificate",
    "DeleteAccessKey",
];

const ROLE_EVENTS: &[&str] = &[
    "AddRoleToInstanceProfile",
    "DeleteRolePermissionsBoundary",
    "DeleteRolePolicy",
    "PutRolePermissionsBoundary",
    "PutRolePolicy",
    "RemoveRoleFromInstanceProfile",
    "TagRole",
    "UntagRole",
    "UpdateAssumeRolePolicy",
    "UpdateRole",
    "UpdateRoleDescription",
];

pub struct IamClassifier;

struct IamEvent<'e, 'a> {
    event: &'e CloudTrailEvent<'a>,
    account_id: &'e str,
    event_name: &'a str,
}

impl IamEvent<'_, '_> {
    fn arn(&self, resource: &str) -> String {
        format!("arn:aws:iam::{}:{}", self.account_id, resource)
    }

    fn change(&self, resource_type: ResourceType, resource: &str) -> ResourceChange {
        ResourceChange::new(self.account_id, resource_type, self.arn(resource), self.event_name)
    }

    fn group(&self, name: &str) -> ResourceChange {
        self.change(ResourceType::IamGroup, &format!("group/{}", name))
    }

    fn role(&self, name: &str) -> ResourceChange {
        self.change(ResourceType::IamRole, &format!("role/{}", name))
    }

    /// Named user, or the root user
    fn user(&self, name: &str) -> ResourceChange {
        if name == ROOT_USER_NAME {
            self.change(ResourceType::IamRootUser, "root")
        } else {
            self.change(ResourceType::IamUser, &format!("user/{}", name))
        }
    }

    /// Managed policy, named verbatim by its ARN
    fn policy(&self) -> ResourceChange {
        ResourceChange::new(
            self.account_id,
            ResourceType::IamPolicy,
            self.event.request("policyArn"),
            self.event_name,
        )
    }

    /// Change for a resource given by full ARN; the owning account comes from the ARN
    fn from_arn(&self, resource_type: ResourceType, raw: &str) -> Option<ResourceChange> {
        let arn = parse_arn(SERVICE, self.event_name, raw)?;
        Some(ResourceChange::new(arn.account_id.clone(), resource_type, arn.to_string(), self.event_name))
    }

    /// Credential calls may omit userName, meaning the caller acts on itself
    fn credential_owner(&self) -> Option<ResourceChange> {
        match self.event.request("userName") {
            "" => {}
            name => return Some(self.user(name)),
        }

        let identity = match Arn::parse(self.event.str_at("userIdentity.arn")) {
            Ok(identity) => identity,
            Err(e) => {
                tracing::error!(event_name = self.event_name, error = %e, "iam: error handling iam user event");
                return None;
            }
        };
        let resource_type = if identity.resource == "root" {
            ResourceType::IamRootUser
        } else {
            ResourceType::IamUser
        };
        Some(ResourceChange::new(
            identity.account_id.clone(),
            resource_type,
            identity.to_string(),
            self.event_name,
        ))
    }
}

impl EventClassifier for IamClassifier {
    fn event_source(&self) -> &'static str {
        "iam.amazonaws.com"
    }

    fn classify(&self, event: &CloudTrailEvent<'_>, account_id: &str) -> Vec<ResourceChange> {
        let event_name = event.event_name();

        // https://docs.aws.amazon.com/IAM/latest/UserGuide/list_identityandaccessmanagement.html
        if IGNORED_EVENTS.contains(&event_name) {
            return ignored(SERVICE, event_name);
        }

        let iam = IamEvent {
            event,
            account_id,
            event_name,
        };
        let group_name = event.request("groupName");
        let role_name = event.request("roleName");
        let user_name = event.request("userName");

        if ROLE_EVENTS.contains(&event_name) {
            return vec![iam.role(role_name)];
        }
        if USER_CREDENTIAL_EVENTS.contains(&event_name) {
            return iam.credential_owner().into_iter().collect();
        }

        match event_name {
            "AddUserToGroup" | "RemoveUserFromGroup" => vec![iam.group(group_name), iam.user(user_name)],
            "AttachGroupPolicy" | "DetachGroupPolicy" => vec![iam.policy(), iam.group(group_name)],
            "AttachRolePolicy" | "DetachRolePolicy" => vec![iam.policy(), iam.role(role_name)],
            "AttachUserPolicy" | "DetachUserPolicy" => vec![iam.policy(), iam.user(user_name)],
            "CreateGroup" => iam
                .from_arn(ResourceType::IamGroup, event.response("group.arn"))
                .into_iter()
                .collect(),
            "CreatePolicy" => iam
                .from_arn(ResourceType::IamPolicy, event.response("policy.arn"))
                .into_iter()
                .collect(),
            "CreatePolicyVersion" | "DeletePolicyVersion" | "SetDefaultPolicyVersion" => iam
                .from_arn(ResourceType::IamPolicy, event.request("policyArn"))
                .into_iter()
                .collect(),
            "CreateRole" | "CreateServiceLinkedRole" => iam
                .from_arn(ResourceType::IamRole, event.response("role.arn"))
                .into_iter()
                .collect(),
            // Accounts always have a password policy resource, deleting one only changes its attributes
            "DeleteAccountPasswordPolicy" | "UpdateAccountPasswordPolicy" => vec![ResourceChange::new(
                account_id,
                ResourceType::PasswordPolicy,
                format!("{}::{}", account_id, ResourceType::PasswordPolicy),
                event_name,
            )],
            "DeleteGroup" => vec![iam.group(group_name).with_delete(true)],
            // Inline policies are part of the group
            "DeleteGroupPolicy" | "PutGroupPolicy" => vec![iam.group(group_name)],
            "DeletePolicy" => iam
                .from_arn(ResourceType::IamPolicy, event.request("policyArn"))
                .map(|change| change.with_delete(true))
                .into_iter()
                .collect(),
            "DeleteRole" | "DeleteServiceLinkedRole" => vec![iam.role(role_name).with_delete(true)],
            "DeleteUser" => vec![iam
                .change(ResourceType::IamUser, &format!("user/{}", user_name))
                .with_delete(true)],
            // A rename changes the ARN; the old resource is left to expire
            "UpdateGroup" => match event.request("newGroupName") {
                "" => vec![iam.group(group_name)],
                new_name => vec![iam.group(new_name)],
            },
            "UpdateUser" => match event.request("newUserName") {
                "" => vec![iam.user(user_name)],
                new_name => vec![iam.change(ResourceType::IamUser, &format!("user/{}", new_name))],
            },
            _ => unknown(SERVICE, event_name),
        }
    }
}
