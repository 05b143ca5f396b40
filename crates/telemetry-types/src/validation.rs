//! Field validation for inbound sensor data.
//!
//! Validation collects every failing field instead of stopping at the first
//! one, so a client gets the full list in a single round trip. Each failure is
//! keyed by a dotted field path (`location.latitude`), and
//! [`ValidationErrors::details`] folds those paths into the nested map the
//! HTTP API returns.
//!
//! Only the first failing rule of a field is reported, and the messages use
//! the same wording for every payload type:
//!
//! | Rule | Message |
//! |------|---------|
//! | required | `cannot be blank` |
//! | minimum | `must be no less than N` |
//! | maximum | `must be no greater than N` |
//!
//! # Example
//!
//! ```
//! use telemetry_types::{Location, Validate};
//!
//! let location = Location { longitude: 200.0, latitude: 10.0 };
//! let errors = location.validate().unwrap_err();
//! assert_eq!(errors.fields(), vec!["longitude"]);
//! ```

use std::collections::BTreeMap;
use std::fmt;

#[cfg(feature = "serde")]
use serde::Serialize;

use crate::types::Location;

/// Message for a missing or zero value.
pub const BLANK: &str = "cannot be blank";

/// Types that can check their own fields.
pub trait Validate {
    /// Validate every field, returning all failures.
    fn validate(&self) -> Result<(), ValidationErrors>;
}

/// A single failing field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// The field path (e.g., `name` or `location.latitude`).
    pub field: String,
    /// Description of the validation failure.
    pub message: String,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// All failing fields of one value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors(Vec<ValidationError>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a failure for `field`.
    pub fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.push(ValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Record a failure if `check` produced one.
    pub fn check(&mut self, field: &str, check: Option<String>) {
        if let Some(message) = check {
            self.push(field, message);
        }
    }

    /// Merge the failures of a nested value under `prefix`.
    pub fn nest(&mut self, prefix: &str, nested: ValidationErrors) {
        for error in nested.0 {
            self.push(format!("{}.{}", prefix, error.field), error.message);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ValidationError> {
        self.0.iter()
    }

    /// Sorted list of failing field paths.
    pub fn fields(&self) -> Vec<&str> {
        let mut fields: Vec<&str> = self.0.iter().map(|e| e.field.as_str()).collect();
        fields.sort_unstable();
        fields
    }

    /// `Ok(())` when nothing failed.
    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }

    /// Fold dotted field paths into a nested map.
    pub fn details(&self) -> BTreeMap<String, FieldDetail> {
        let mut root = BTreeMap::new();
        for error in &self.0 {
            insert_path(&mut root, &error.field, &error.message);
        }
        root
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined = self
            .0
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ");
        f.write_str(&joined)
    }
}

impl std::error::Error for ValidationErrors {}

/// One node of the nested details map.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize), serde(untagged))]
pub enum FieldDetail {
    Message(String),
    Nested(BTreeMap<String, FieldDetail>),
}

fn insert_path(node: &mut BTreeMap<String, FieldDetail>, path: &str, message: &str) {
    match path.split_once('.') {
        None => {
            node.insert(path.to_string(), FieldDetail::Message(message.to_string()));
        }
        Some((head, rest)) => {
            let child = node
                .entry(head.to_string())
                .or_insert_with(|| FieldDetail::Nested(BTreeMap::new()));
            if let FieldDetail::Message(_) = child {
                *child = FieldDetail::Nested(BTreeMap::new());
            }
            if let FieldDetail::Nested(map) = child {
                insert_path(map, rest, message);
            }
        }
    }
}

// Rules. Each returns the failure message, if any.

/// A string must not be empty.
pub fn required_str(value: &str) -> Option<String> {
    value.is_empty().then(|| BLANK.to_string())
}

/// A string must not contain control characters such as line breaks.
pub fn printable(value: &str) -> Option<String> {
    value
        .chars()
        .any(char::is_control)
        .then(|| "must not contain control characters".to_string())
}

/// A list must have at least one entry.
pub fn required_list<T>(value: &[T]) -> Option<String> {
    value.is_empty().then(|| BLANK.to_string())
}

/// A number must be present and non-zero.
pub fn required_number(value: f64) -> Option<String> {
    (value == 0.0 || value.is_nan()).then(|| BLANK.to_string())
}

/// A number must be `>= min`.
pub fn min(value: f64, min: f64) -> Option<String> {
    (value < min).then(|| format!("must be no less than {}", min))
}

/// A number must be `<= max`.
pub fn max(value: f64, max: f64) -> Option<String> {
    (value > max).then(|| format!("must be no greater than {}", max))
}

impl Validate for Location {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        errors.check(
            "longitude",
            required_number(self.longitude)
                .or_else(|| min(self.longitude, -180.0))
                .or_else(|| max(self.longitude, 180.0)),
        );
        errors.check(
            "latitude",
            required_number(self.latitude)
                .or_else(|| min(self.latitude, -90.0))
                .or_else(|| max(self.latitude, 90.0)),
        );

        errors.into_result()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_valid() {
        let location = Location {
            longitude: -46.6,
            latitude: -23.5,
        };
        assert!(location.validate().is_ok());
    }

    #[test]
    fn test_location_zero_is_blank() {
        let errors = Location::default().validate().unwrap_err();
        assert_eq!(errors.fields(), vec!["latitude", "longitude"]);
        assert!(errors.iter().all(|e| e.message == BLANK));
    }

    #[test]
    fn test_location_bounds() {
        let location = Location {
            longitude: -181.0,
            latitude: 90.5,
        };
        let errors = location.validate().unwrap_err();
        let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
        assert_eq!(
            messages,
            vec![
                "longitude: must be no less than -180",
                "latitude: must be no greater than 90",
            ]
        );
    }

    #[test]
    fn test_only_first_rule_reported() {
        assert_eq!(required_number(0.0), Some(BLANK.to_string()));
        assert_eq!(
            required_number(0.0).or_else(|| min(0.0, 1.0)),
            Some(BLANK.to_string())
        );
    }

    #[test]
    fn test_nest_and_details() {
        let mut errors = ValidationErrors::new();
        errors.push("name", BLANK);
        errors.nest("location", Location::default().validate().unwrap_err());

        assert_eq!(
            errors.fields(),
            vec!["location.latitude", "location.longitude", "name"]
        );

        let details = serde_json::to_value(errors.details()).unwrap();
        assert_eq!(
            details,
            serde_json::json!({
                "name": "cannot be blank",
                "location": {
                    "latitude": "cannot be blank",
                    "longitude": "cannot be blank",
                },
            })
        );
    }

    #[test]
    fn test_printable() {
        assert_eq!(printable("deg C"), None);
        assert_eq!(printable("℃"), None);
        assert!(printable("c\ntemperature").is_some());
        assert!(printable("c\r").is_some());
        assert!(printable("tab\there").is_some());
    }

    #[test]
    fn test_into_result() {
        assert!(ValidationErrors::new().into_result().is_ok());

        let mut errors = ValidationErrors::new();
        errors.check("tags", required_list::<String>(&[]));
        errors.check("name", required_str("sensor"));
        let err = errors.into_result().unwrap_err();
        assert_eq!(err.len(), 1);
        assert_eq!(err.to_string(), "tags: cannot be blank");
    }
}
