//! AWS Lambda functions
//!
//! `functionName` accepts a bare name (`my-function`), a qualified name
//! (`my-function:v1`), a partial ARN (`123456789012:function:my-function`) or a
//! full ARN. Only the unqualified function is tracked, so aliases and versions
//! collapse to the function itself.

use once_cell::sync::Lazy;
use regex::Regex;

use super::{ignored, parse_arn, unknown, EventClassifier};
use crate::app::event_processor::event::CloudTrailEvent;
use crate::app::event_processor::types::{ResourceChange, ResourceType};

const SERVICE: &str = "lambda";

/// Function name grammar from the Lambda API reference; capture 7 is the bare name
static FUNCTION_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(arn:(aws[a-zA-Z-]*)?:lambda:)?([a-z]{2}(-gov)?-[a-z]+-\d{1}:)?(\d{12}:)?(function:)?([a-zA-Z0-9_-]+)(:(\$LATEST|[a-zA-Z0-9_-]+))?",
    )
    .expect("lambda function name pattern is valid")
});

const NAMED_FUNCTION_EVENTS: &[&str] = &[
    "AddPermission",
    "CreateAlias",
    "CreateEventSourceMapping",
    "CreateFunction",
    "DeleteAlias",
    "DeleteFunction",
    "DeleteFunctionConcurrency",
    "PublishVersion",
    "PutFunctionConcurrency",
    "RemovePermission",
    "UpdateAlias",
    "UpdateAlias20150331",
    "UpdateEventSourceMapping",
    "UpdateFunctionCode",
    "UpdateFunctionConfiguration",
    "UpdateFunctionCode20150331v2",
    "PublishVersion20150331",
    "UpdateEventSourceMapping20150331",
    "CreateAlias20150331",
];

pub struct LambdaClassifier;

/// Bare function name from any accepted `functionName` form
pub(crate) fn function_name(raw: &str) -> Option<&str> {
    FUNCTION_NAME
        .captures(raw)
        .and_then(|captures| captures.get(7))
        .map(|name| name.as_str())
}

impl EventClassifier for LambdaClassifier {
    fn event_source(&self) -> &'static str {
        "lambda.amazonaws.com"
    }

    fn classify(&self, event: &CloudTrailEvent<'_>, account_id: &str) -> Vec<ResourceChange> {
        let event_name = event.event_name();

        // https://docs.aws.amazon.com/IAM/latest/UserGuide/list_awslambda.html
        if matches!(event_name, "AddLayerVersionPermission" | "InvokeAsync" | "InvokeFunction") {
            return ignored(SERVICE, event_name);
        }

        let raw_name = if NAMED_FUNCTION_EVENTS.contains(&event_name) {
            event.request("functionName")
        } else if event_name == "DeleteEventSourceMapping" {
            event.response("functionArn")
        } else if matches!(
            event_name,
            "TagResource" | "UntagResource" | "TagResource20170331v2" | "UntagResource20170331v2"
        ) {
            return match parse_arn(SERVICE, event_name, event.request("resource")) {
                Some(function_arn) => vec![ResourceChange::new(
                    account_id,
                    ResourceType::LambdaFunction,
                    function_arn.to_string(),
                    event_name,
                )],
                None => Vec::new(),
            };
        } else {
            return unknown(SERVICE, event_name);
        };

        let Some(name) = function_name(raw_name) else {
            tracing::error!(event_name, function_name = raw_name, "lambda: unable to parse function name");
            return Vec::new();
        };

        vec![ResourceChange::new(
            account_id,
            ResourceType::LambdaFunction,
            format!("arn:aws:lambda:{}:{}:function:{}", event.region(), account_id, name),
            event_name,
        )
        .with_delete(event_name == "DeleteFunction")]
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    const FUNCTION: &str = "arn:aws:lambda:us-west-2:111111111111:function:my-function";

    #[test]
    fn test_function_name_forms() {
        assert_eq!(function_name("my-function"), Some("my-function"));
        assert_eq!(function_name("my-function:v1"), Some("my-function"));
        assert_eq!(function_name("my_function:$LATEST"), Some("my_function"));
        assert_eq!(function_name("123456789012:function:my-function"), Some("my-function"));
        assert_eq!(
            function_name("arn:aws:lambda:us-west-2:123456789012:function:my-function:PROD"),
            Some("my-function")
        );
        assert_eq!(function_name(""), None);
    }

    #[test]
    fn test_update_code_with_full_arn() {
        let raw = event(
            "UpdateFunctionCode20150331v2",
            json!({"functionName": "arn:aws:lambda:us-west-2:111111111111:function:my-function"}),
            json!(null),
        );
        let changes = classify(&LambdaClassifier, &raw);
        assert_eq!(ids(&changes), vec![FUNCTION]);
        assert!(!changes[0].delete);
    }

    #[test]
    fn test_delete_function() {
        let raw = event("DeleteFunction", json!({"functionName": "my-function"}), json!(null));
        let changes = classify(&LambdaClassifier, &raw);
        assert_eq!(ids(&changes), vec![FUNCTION]);
        assert!(changes[0].delete);
    }

    #[test]
    fn test_delete_event_source_mapping_uses_response() {
        let raw = event("DeleteEventSourceMapping", json!({"uUID": "abc"}), json!({"functionArn": FUNCTION}));
        assert_eq!(ids(&classify(&LambdaClassifier, &raw)), vec![FUNCTION]);
    }

    #[test]
    fn test_tag_resource() {
        let raw = event("TagResource20170331v2", json!({"resource": FUNCTION}), json!(null));
        assert_eq!(ids(&classify(&LambdaClassifier, &raw)), vec![FUNCTION]);
    }

    #[test]
    fn test_missing_name_dropped() {
        assert!(classify(&LambdaClassifier, &event("CreateFunction", json!({}), json!(null))).is_empty());
        assert!(classify(&LambdaClassifier, &event("InvokeFunction", json!({"functionName": "f"}), json!(null))).is_empty());
        assert!(classify(&LambdaClassifier, &event("PutProvisionedConcurrencyConfig", json!({}), json!(null))).is_empty());
    }
}
