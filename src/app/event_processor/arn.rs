//! Amazon Resource Name parsing
//!
//! Follows the provider grammar `arn:partition:service:region:account-id:resource`.
//! The resource section keeps any further `:` or `/` separators verbatim.

#![warn(clippy::all, rust_2018_idioms)]

use anyhow::{bail, Result};
use std::fmt;
use std::str::FromStr;

const ARN_PREFIX: &str = "arn:";
const ARN_SECTIONS: usize = 6;

/// Parsed ARN
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Arn {
    pub partition: String,
    pub service: String,
    pub region: String,
    pub account_id: String,
    pub resource: String,
}

impl Arn {
    /// Parse an ARN, failing on anything that does not have all six sections
    pub fn parse(arn: &str) -> Result<Self> {
        if !arn.starts_with(ARN_PREFIX) {
            bail!("arn: invalid prefix: {:?}", arn);
        }

        let sections: Vec<&str> = arn.splitn(ARN_SECTIONS, ':').collect();
        if sections.len() != ARN_SECTIONS {
            bail!("arn: not enough sections: {:?}", arn);
        }

        Ok(Self {
            partition: sections[1].to_string(),
            service: sections[2].to_string(),
            region: sections[3].to_string(),
            account_id: sections[4].to_string(),
            resource: sections[5].to_string(),
        })
    }
}

impl FromStr for Arn {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Arn::parse(s)
    }
}

impl fmt::Display for Arn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "arn:{}:{}:{}:{}:{}",
            self.partition, self.service, self.region, self.account_id, self.resource
        )
    }
}
