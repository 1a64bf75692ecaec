//! Read-only view over a decoded CloudTrail event
//!
//! CloudTrail request and response payloads are loosely shaped and differ per
//! API call, so classifiers read them by dotted path. Missing or mistyped
//! values read as empty strings / empty slices instead of errors.

#![warn(clippy::all, rust_2018_idioms)]

use serde_json::Value;

/// Look up a dotted path (`requestParameters.instancesSet.items`) in a JSON value.
/// Numeric segments index into arrays.
pub fn value_at<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(value, |current, segment| match current {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

/// String at `path`, or "" when absent or not a string
pub fn str_at<'a>(value: &'a Value, path: &str) -> &'a str {
    value_at(value, path).and_then(Value::as_str).unwrap_or("")
}

/// Array at `path`, or an empty slice when absent or not an array
pub fn array_at<'a>(value: &'a Value, path: &str) -> &'a [Value] {
    value_at(value, path)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

/// Depth-first search for the first non-empty string stored under `key`, at any depth
pub fn find_str<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    match value {
        Value::Object(map) => {
            if let Some(found) = map.get(key).and_then(Value::as_str).filter(|s| !s.is_empty()) {
                return Some(found);
            }
            map.values().find_map(|child| find_str(child, key))
        }
        Value::Array(items) => items.iter().find_map(|child| find_str(child, key)),
        _ => None,
    }
}

/// A single CloudTrail event (the `detail` of an EventBridge notification,
/// or the whole body of a direct delivery)
#[derive(Debug, Clone, Copy)]
pub struct CloudTrailEvent<'a> {
    raw: &'a Value,
}

impl<'a> CloudTrailEvent<'a> {
    pub fn new(raw: &'a Value) -> Self {
        Self { raw }
    }

    pub fn raw(&self) -> &'a Value {
        self.raw
    }

    pub fn get(&self, path: &str) -> Option<&'a Value> {
        value_at(self.raw, path)
    }

    pub fn str_at(&self, path: &str) -> &'a str {
        str_at(self.raw, path)
    }

    pub fn array_at(&self, path: &str) -> &'a [Value] {
        array_at(self.raw, path)
    }

    /// Shorthand for `requestParameters.<path>`
    pub fn request(&self, path: &str) -> &'a str {
        self.str_at(&format!("requestParameters.{}", path))
    }

    /// Shorthand for `responseElements.<path>`
    pub fn response(&self, path: &str) -> &'a str {
        self.str_at(&format!("responseElements.{}", path))
    }

    pub fn event_name(&self) -> &'a str {
        self.str_at("eventName")
    }

    pub fn event_source(&self) -> &'a str {
        self.str_at("eventSource")
    }

    pub fn event_time(&self) -> &'a str {
        self.str_at("eventTime")
    }

    pub fn error_code(&self) -> &'a str {
        self.str_at("errorCode")
    }

    pub fn region(&self) -> &'a str {
        self.str_at("awsRegion")
    }

    pub fn find_str(&self, key: &str) -> Option<&'a str> {
        find_str(self.raw, key)
    }
}
