//! Amazon S3 buckets

use super::{ignored, EventClassifier};
use crate::app::event_processor::event::CloudTrailEvent;
use crate::app::event_processor::types::{ResourceChange, ResourceType};

const SERVICE: &str = "s3";

pub struct S3Classifier;

impl EventClassifier for S3Classifier {
    fn event_source(&self) -> &'static str {
        "s3.amazonaws.com"
    }

    fn classify(&self, event: &CloudTrailEvent<'_>, account_id: &str) -> Vec<ResourceChange> {
        let event_name = event.event_name();

        // https://docs.aws.amazon.com/IAM/latest/UserGuide/list_amazons3.html
        if matches!(
            event_name,
            "UploadPart" | "CreateMultipartUpload" | "CompleteMultipartUpload" | "HeadBucket" | "PutObject"
        ) {
            return ignored(SERVICE, event_name);
        }

        let bucket_name = event.request("bucketName");
        if bucket_name.is_empty() {
            tracing::error!(event_name, "s3: empty bucket name");
            return Vec::new();
        }

        // CloudTrail never says which account owns the bucket. Assume the caller's account does,
        // which is usually true; when it isn't the poller fails to describe the bucket.
        vec![ResourceChange::new(
            account_id,
            ResourceType::S3Bucket,
            format!("arn:aws:s3:::{}", bucket_name),
            event_name,
        )
        .with_delete(event_name == "DeleteBucket")]
    }
}
