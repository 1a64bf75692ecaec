//! Application modules for the event processor.
//!
//! # Module Organization
//!
//! - [`event_processor`] - CloudTrail classification, de-duplication and submission
//! - [`config`] - environment-driven settings
//! - [`logging`] - tracing subscriber setup
//!
//! # Architecture
//!
//! [`event_processor::EventProcessor`] owns the classifier registry and talks
//! to the outside world only through collaborator traits (account source,
//! inventory API, scan queue, SNS). The binary wires the AWS-backed
//! implementations; tests substitute in-memory ones.

pub mod config;
pub mod event_processor;
pub mod logging;

pub use config::ProcessorConfig;
pub use event_processor::EventProcessor;
