//! Shared types for the sensor telemetry service.
//!
//! This crate holds the domain model used by both the storage layer
//! (telemetry-store) and the HTTP service (telemetry-service).
//!
//! # Features
//!
//! - Sensor and measurement entities, split into "new" and "stored" forms so
//!   identifiers and timestamps can only come from the store
//! - GeoJSON points with great-circle distance
//! - Field validation that reports every failing field at once
//!
//! # Example
//!
//! ```
//! use telemetry_types::{GeoPoint, NewSensor};
//!
//! let sensor = NewSensor {
//!     name: "greenhouse".to_string(),
//!     location: GeoPoint::new(-46.63, -23.55),
//!     tags: vec!["outdoor".to_string()],
//! };
//! assert_eq!(sensor.location.latitude(), -23.55);
//! ```

pub mod error;
pub mod types;
pub mod validation;

pub use error::ParseError;
pub use types::{
    EARTH_RADIUS_METERS, GeoPoint, Location, Measurement, MeasurementSummary, NewMeasurement,
    NewSensor, Sensor, SensorId,
};
pub use validation::{FieldDetail, Validate, ValidationError, ValidationErrors};
