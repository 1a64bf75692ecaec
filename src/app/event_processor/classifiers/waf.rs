//! AWS WAF web ACLs, both the global (CloudFront) and regional flavours
//!
//! The two services share an API. Only web ACLs are tracked; rules, rule
//! groups and match sets can be attached to any number of ACLs so changes to
//! them rescan every web ACL instead.

use super::{ignored, parse_arn, unknown, EventClassifier};
use crate::app::event_processor::event::CloudTrailEvent;
use crate::app::event_processor::types::{ResourceChange, ResourceType, GLOBAL_REGION};

const IGNORED_SUFFIXES: &[&str] = &["Set", "Rule", "RuleGroup"];

pub struct WafClassifier;

pub struct WafRegionalClassifier;

#[derive(Clone, Copy, PartialEq, Eq)]
enum Flavor {
    Global,
    Regional,
}

impl Flavor {
    fn service(self) -> &'static str {
        match self {
            Flavor::Global => "waf",
            Flavor::Regional => "waf-regional",
        }
    }

    /// Web ACL ARN; the global service has no region component
    fn web_acl_arn(self, region: &str, account_id: &str, web_acl_id: &str) -> String {
        match self {
            Flavor::Global => format!("arn:aws:waf::{}:webacl/{}", account_id, web_acl_id),
            Flavor::Regional => format!("arn:aws:waf-regional:{}:{}:webacl/{}", region, account_id, web_acl_id),
        }
    }
}

impl EventClassifier for WafClassifier {
    fn event_source(&self) -> &'static str {
        "waf.amazonaws.com"
    }

    // https://docs.aws.amazon.com/IAM/latest/UserGuide/list_awswaf.html
    fn classify(&self, event: &CloudTrailEvent<'_>, account_id: &str) -> Vec<ResourceChange> {
        classify_web_acl(Flavor::Global, event, account_id)
    }
}

impl EventClassifier for WafRegionalClassifier {
    fn event_source(&self) -> &'static str {
        "waf-regional.amazonaws.com"
    }

    // https://docs.aws.amazon.com/IAM/latest/UserGuide/list_awswafregional.html
    fn classify(&self, event: &CloudTrailEvent<'_>, account_id: &str) -> Vec<ResourceChange> {
        classify_web_acl(Flavor::Regional, event, account_id)
    }
}

fn classify_web_acl(flavor: Flavor, event: &CloudTrailEvent<'_>, account_id: &str) -> Vec<ResourceChange> {
    let service = flavor.service();
    let event_name = event.event_name();

    if event_name.starts_with("Update") && event_name != "UpdateWebACL" {
        return vec![ResourceChange::region_scan(
            account_id,
            ResourceType::WafWebAcl,
            GLOBAL_REGION,
            event_name,
        )];
    }

    if IGNORED_SUFFIXES.iter().any(|suffix| event_name.ends_with(suffix))
        || matches!(event_name, "DeletePermissionPolicy" | "PutPermissionPolicy")
    {
        return ignored(service, event_name);
    }

    let web_acl_arn = match event_name {
        "CreateWebACL" => event.response("webACL.webACLArn").to_string(),
        "DeleteLoggingConfiguration" => event.request("resourceArn").to_string(),
        "PutLoggingConfiguration" => event.request("loggingConfiguration.resourceArn").to_string(),
        "DeleteWebACL" | "UpdateWebACL" => {
            flavor.web_acl_arn(event.region(), account_id, event.request("webACLId"))
        }
        "AssociateWebACL" | "DisassociateWebACL" if flavor == Flavor::Regional => {
            return associations(event, account_id);
        }
        // The global service has no association API, so these land here too
        _ => return unknown(service, event_name),
    };

    match parse_arn(service, event_name, &web_acl_arn) {
        Some(parsed) => vec![ResourceChange::new(
            account_id,
            ResourceType::WafWebAcl,
            parsed.to_string(),
            event_name,
        )
        .with_delete(event_name == "DeleteWebACL")],
        None => Vec::new(),
    }
}

/// Regional web ACLs attach to load balancers and API gateways. Only load
/// balancers are tracked, so the ACL side is always rescanned.
fn associations(event: &CloudTrailEvent<'_>, account_id: &str) -> Vec<ResourceChange> {
    let event_name = event.event_name();
    let region = event.region();
    let mut changes = Vec::new();

    if let Some(resource) = parse_arn(Flavor::Regional.service(), event_name, event.request("resourceArn")) {
        if resource.resource.starts_with("loadbalancer/") {
            changes.push(ResourceChange::new(
                account_id,
                ResourceType::Elbv2ApplicationLoadBalancer,
                resource.to_string(),
                event_name,
            ));
        }
    }

    if event_name == "AssociateWebACL" {
        changes.push(ResourceChange::new(
            account_id,
            ResourceType::WafRegionalWebAcl,
            Flavor::Regional.web_acl_arn(region, account_id, event.request("webAclId")),
            event_name,
        ));
    } else {
        // A resource has at most one web ACL, so the request doesn't name it
        changes.push(ResourceChange::region_scan(
            account_id,
            ResourceType::WafRegionalWebAcl,
            region,
            event_name,
        ));
    }

    changes
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    const LOAD_BALANCER: &str = "arn:aws:elasticloadbalancing:us-west-2:111111111111:loadbalancer/app/web/50dc6c495c0c9188";

    #[test]
    fn test_delete_global_web_acl() {
        let raw = event("DeleteWebACL", json!({"webACLId": "acl-1"}), json!(null));
        let changes = classify(&WafClassifier, &raw);
        assert_eq!(ids(&changes), vec!["arn:aws:waf::111111111111:webacl/acl-1"]);
        assert!(changes[0].delete);
        assert_eq!(changes[0].resource_type, ResourceType::WafWebAcl);
    }

    #[test]
    fn test_regional_update_web_acl_has_region() {
        let raw = event("UpdateWebACL", json!({"webACLId": "acl-1"}), json!(null));
        let changes = classify(&WafRegionalClassifier, &raw);
        assert_eq!(ids(&changes), vec!["arn:aws:waf-regional:us-west-2:111111111111:webacl/acl-1"]);
        assert!(!changes[0].delete);
    }

    #[test]
    fn test_update_rule_scans_global_web_acls() {
        for classifier in [&WafClassifier as &dyn EventClassifier, &WafRegionalClassifier] {
            let changes = classify(classifier, &event("UpdateRule", json!({"ruleId": "r"}), json!(null)));
            assert_eq!(changes.len(), 1);
            assert!(changes[0].is_scope_scan());
            assert_eq!(changes[0].region, GLOBAL_REGION);
            assert_eq!(changes[0].resource_type, ResourceType::WafWebAcl);
        }
    }

    #[test]
    fn test_ignored_events() {
        for name in ["CreateIPSet", "DeleteRule", "CreateRuleGroup", "PutPermissionPolicy"] {
            assert!(classify(&WafClassifier, &event(name, json!({}), json!(null))).is_empty());
        }
    }

    #[test]
    fn test_associate_with_load_balancer() {
        let raw = event(
            "AssociateWebACL",
            json!({"resourceArn": LOAD_BALANCER, "webAclId": "acl-1"}),
            json!(null),
        );
        let changes = classify(&WafRegionalClassifier, &raw);
        assert_eq!(
            ids(&changes),
            vec![LOAD_BALANCER, "arn:aws:waf-regional:us-west-2:111111111111:webacl/acl-1"]
        );
        assert_eq!(changes[0].resource_type, ResourceType::Elbv2ApplicationLoadBalancer);
        assert_eq!(changes[1].resource_type, ResourceType::WafRegionalWebAcl);
    }

    #[test]
    fn test_disassociate_from_api_gateway() {
        let raw = event(
            "DisassociateWebACL",
            json!({"resourceArn": "arn:aws:apigateway:us-west-2::/restapis/a1/stages/prod"}),
            json!(null),
        );
        let changes = classify(&WafRegionalClassifier, &raw);
        assert_eq!(changes.len(), 1);
        assert!(changes[0].is_scope_scan());
        assert_eq!(changes[0].region, REGION);
        assert_eq!(changes[0].resource_type, ResourceType::WafRegionalWebAcl);
    }

    #[test]
    fn test_global_has_no_associations() {
        let raw = event("AssociateWebACL", json!({"resourceArn": LOAD_BALANCER}), json!(null));
        assert!(classify(&WafClassifier, &raw).is_empty());
    }
}
