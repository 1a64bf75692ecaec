//! AWS Certificate Manager

use super::{ignored, parse_arn, unknown, EventClassifier};
use crate::app::event_processor::event::CloudTrailEvent;
use crate::app::event_processor::types::{ResourceChange, ResourceType};

const SERVICE: &str = "acm";

pub struct AcmClassifier;

impl EventClassifier for AcmClassifier {
    fn event_source(&self) -> &'static str {
        "acm.amazonaws.com"
    }

    fn classify(&self, event: &CloudTrailEvent<'_>, account_id: &str) -> Vec<ResourceChange> {
        let event_name = event.event_name();

        // https://docs.aws.amazon.com/IAM/latest/UserGuide/list_awscertificatemanager.html
        if matches!(event_name, "ExportCertificate" | "ResendValidationEmail") {
            return ignored(SERVICE, event_name);
        }

        let raw_arn = match event_name {
            "AddTagsToCertificate"
            | "DeleteCertificate"
            | "RemoveTagsFromCertificate"
            | "RenewCertificate"
            | "UpdateCertificateOptions" => event.request("certificateArn"),
            // Re-imports name the certificate in the request, first imports only in the response
            "ImportCertificate" => match event.request("certificateArn") {
                "" => event.response("certificateArn"),
                requested => requested,
            },
            "RequestCertificate" => event.response("certificateArn"),
            _ => return unknown(SERVICE, event_name),
        };

        let Some(cert_arn) = parse_arn(SERVICE, event_name, raw_arn) else {
            return Vec::new();
        };

        vec![ResourceChange::new(
            account_id,
            ResourceType::AcmCertificate,
            cert_arn.to_string(),
            event_name,
        )
        .with_delete(event_name == "DeleteCertificate")]
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    const CERT: &str = "arn:aws:acm:us-west-2:111111111111:certificate/2c3d4e5f";

    #[test]
    fn test_request_certificate() {
        let raw = event("RequestCertificate", json!({"domainName": "example.com"}), json!({"certificateArn": CERT}));
        let changes = classify(&AcmClassifier, &raw);

        assert_eq!(ids(&changes), vec![CERT]);
        assert_eq!(changes[0].resource_type, ResourceType::AcmCertificate);
        assert_eq!(changes[0].aws_account_id, ACCOUNT);
        assert!(!changes[0].delete);
    }

    #[test]
    fn test_delete_certificate() {
        let raw = event("DeleteCertificate", json!({"certificateArn": CERT}), json!(null));
        let changes = classify(&AcmClassifier, &raw);

        assert_eq!(ids(&changes), vec![CERT]);
        assert!(changes[0].delete);
    }

    #[test]
    fn test_import_falls_back_to_response() {
        let raw = event("ImportCertificate", json!({}), json!({"certificateArn": CERT}));
        assert_eq!(ids(&classify(&AcmClassifier, &raw)), vec![CERT]);
    }

    #[test]
    fn test_ignored_and_unknown() {
        assert!(classify(&AcmClassifier, &event("ExportCertificate", json!({}), json!({}))).is_empty());
        assert!(classify(&AcmClassifier, &event("ShinyNewCall", json!({}), json!({}))).is_empty());
        assert!(classify(&AcmClassifier, &event("RenewCertificate", json!({"certificateArn": "bad"}), json!({}))).is_empty());
    }
}
