//! CloudTrail event processing
//!
//! Turns CloudTrail API-call records into "this resource may have changed"
//! signals for the snapshot pipeline.
//!
//! ```text
//! records -> handler -> dispatcher -> classifiers -> aggregator -> submission
//!                                                                 |-> resources-api (deletes)
//!                                                                 '-> poller queue (scans)
//! ```
//!
//! - [`dispatcher`] unwraps the envelope and drops failed, read-only and
//!   unauthorized events
//! - [`classifiers`] map one event to the resources it touched, per service
//! - [`aggregator`] keeps the newest change per resource and groups scans by delay
//! - [`submission`] / [`sqs_batch`] deliver the results
//! - [`accounts`] maps account IDs to integrations with a TTL cache
//! - [`confirmation`] confirms SNS topic subscriptions from onboarded accounts

pub mod accounts;
pub mod aggregator;
pub mod arn;
pub mod classifiers;
pub mod confirmation;
pub mod dispatcher;
pub mod event;
pub mod handler;
pub mod sqs_batch;
pub mod submission;
pub mod types;

pub use handler::EventProcessor;
pub use types::{ResourceChange, ResourceType};
