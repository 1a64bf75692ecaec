//! awsevents - real-time CloudTrail change detection
//!
//! Consumes batches of CloudTrail API-call records (delivered directly, via
//! EventBridge, or wrapped in SNS notifications) and works out which AWS
//! resources each call may have changed. The result feeds a resource
//! snapshot pipeline:
//!
//! - deleted resources are removed through the resources API
//! - everything else is queued for the snapshot pollers to rescan, grouped by
//!   the delay the change needs before its new state is visible
//!
//! # Architecture Overview
//!
//! - **Dispatcher** ([`app::event_processor::dispatcher`]): envelope detection and noise filtering
//! - **Classifiers** ([`app::event_processor::classifiers`]): one rule table per AWS service
//! - **Aggregator** ([`app::event_processor::aggregator`]): newest change per resource wins
//! - **Submission** ([`app::event_processor::submission`], [`app::event_processor::sqs_batch`]):
//!   resources API deletes and batched SQS sends with backoff
//! - **Accounts** ([`app::event_processor::accounts`]): TTL cache of onboarded accounts
//!
//! The batch entry point is [`EventProcessor::handle_batch`].

#![warn(clippy::all, rust_2018_idioms)]

pub mod app;
pub use app::{EventProcessor, ProcessorConfig};
