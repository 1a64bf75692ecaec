//! Elastic Load Balancing v2 (application and network load balancers)
//!
//! Listeners and rules are tracked as part of their load balancer. Their ARNs
//! embed the load balancer's:
//!
//! ```text
//! arn:aws:elasticloadbalancing:region:account-id:loadbalancer/app/lb-name/lb-id
//! arn:aws:elasticloadbalancing:region:account-id:listener/app/lb-name/lb-id/listener-id
//! arn:aws:elasticloadbalancing:region:account-id:listener-rule/app/lb-name/lb-id/listener-id/rule-id
//! ```

use tracing::error;

use super::{ignored, parse_arn, unknown, EventClassifier};
use crate::app::event_processor::event::{str_at, CloudTrailEvent};
use crate::app::event_processor::types::{ResourceChange, ResourceType};

const SERVICE: &str = "elbv2";

const IGNORED_EVENTS: &[&str] = &[
    "DeleteTargetGroup",
    "CreateTargetGroup",
    "ModifyTargetGroup",
    "ModifyTargetGroupAttributes",
    "RegisterTargets",
    "DeregisterTargets",
];

pub struct Elbv2Classifier;

/// Load balancer ARN owning a listener or listener rule ARN
pub(crate) fn load_balancer_arn(component_arn: &str, region: &str, account_id: &str) -> Option<String> {
    let parts: Vec<&str> = component_arn.split('/').collect();
    if parts.len() < 4 {
        return None;
    }
    Some(format!(
        "arn:aws:elasticloadbalancing:{}:{}:loadbalancer/{}/{}/{}",
        region, account_id, parts[1], parts[2], parts[3]
    ))
}

fn load_balancer(account_id: &str, event_name: &str, lb_arn: String) -> ResourceChange {
    ResourceChange::new(account_id, ResourceType::Elbv2ApplicationLoadBalancer, lb_arn, event_name)
}

impl EventClassifier for Elbv2Classifier {
    fn event_source(&self) -> &'static str {
        "elasticloadbalancing.amazonaws.com"
    }

    fn classify(&self, event: &CloudTrailEvent<'_>, account_id: &str) -> Vec<ResourceChange> {
        let event_name = event.event_name();

        // https://docs.aws.amazon.com/IAM/latest/UserGuide/list_elasticloadbalancingv2.html
        if IGNORED_EVENTS.contains(&event_name) {
            return ignored(SERVICE, event_name);
        }

        let region = event.region();
        let from_component = |component_arn: &str| match load_balancer_arn(component_arn, region, account_id) {
            Some(lb_arn) => Some(load_balancer(account_id, event_name, lb_arn)),
            None => {
                error!(event_name, component_arn, "elbv2: unexpected listener or rule ARN");
                None
            }
        };

        match event_name {
            "AddListenerCertificates" | "CreateRule" | "DeleteListener" | "ModifyListener"
            | "RemoveListenerCertificates" => from_component(event.request("listenerArn")).into_iter().collect(),
            "DeleteRule" | "ModifyRule" => from_component(event.request("ruleArn")).into_iter().collect(),
            "SetRulePriorities" => event
                .array_at("requestParameters.rulePriorities")
                .iter()
                .filter_map(|rule| from_component(str_at(rule, "ruleArn")))
                .collect(),
            // Target groups share the tagging API but aren't tracked
            "AddTags" | "RemoveTags" => {
                // One unparseable ARN drops the whole event
                let arns: Option<Vec<_>> = event
                    .array_at("requestParameters.resourceArns")
                    .iter()
                    .map(|resource| parse_arn(SERVICE, event_name, resource.as_str().unwrap_or("")))
                    .collect();
                arns.unwrap_or_default()
                    .into_iter()
                    .filter(|arn| !arn.resource.starts_with("targetgroup/"))
                    .map(|arn| load_balancer(account_id, event_name, arn.to_string()))
                    .collect()
            }
            "CreateListener" | "DeleteLoadBalancer" | "ModifyLoadBalancerAttributes" | "SetIpAddressType"
            | "SetSecurityGroups" | "SetSubnets" => {
                match parse_arn(SERVICE, event_name, event.request("loadBalancerArn")) {
                    Some(lb_arn) => vec![load_balancer(account_id, event_name, lb_arn.to_string())
                        .with_delete(event_name == "DeleteLoadBalancer")],
                    None => Vec::new(),
                }
            }
            "CreateLoadBalancer" => {
                let arns: Option<Vec<_>> = event
                    .array_at("responseElements.loadBalancers")
                    .iter()
                    .map(|lb| parse_arn(SERVICE, event_name, str_at(lb, "loadBalancerArn")))
                    .collect();
                arns.unwrap_or_default()
                    .into_iter()
                    .map(|arn| load_balancer(account_id, event_name, arn.to_string()))
                    .collect()
            }
            _ => unknown(SERVICE, event_name),
        }
    }
}
