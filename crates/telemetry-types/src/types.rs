//! Core types for sensors and their measurements.

use core::fmt;
use core::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::ParseError;

/// Mean Earth radius, in meters, used for great-circle distances.
///
/// Matches the radius document stores use for spherical `$near` queries, so
/// distances computed here agree with a `2dsphere` index.
pub const EARTH_RADIUS_METERS: f64 = 6_378_100.0;

/// Opaque identifier assigned to a sensor by the store.
///
/// Identifiers are random (v4) UUIDs rendered in hyphenated form. They are
/// generated exactly once, when a sensor is created, and never change.
///
/// # Examples
///
/// ```
/// use telemetry_types::SensorId;
///
/// let id = SensorId::new();
/// let parsed: SensorId = id.to_string().parse().unwrap();
/// assert_eq!(id, parsed);
///
/// assert!("not-an-id".parse::<SensorId>().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(transparent))]
pub struct SensorId(Uuid);

impl SensorId {
    /// Generate a fresh identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SensorId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SensorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

impl FromStr for SensorId {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|_| ParseError::InvalidId(s.to_string()))
    }
}

/// A GeoJSON point: `{"type": "Point", "coordinates": [lon, lat]}`.
///
/// Coordinate order is fixed, longitude first. Any other geometry `type` is
/// rejected on deserialization.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(from = "GeoJsonPoint", into = "GeoJsonPoint")
)]
pub struct GeoPoint {
    /// `[longitude, latitude]` in decimal degrees.
    pub coordinates: [f64; 2],
}

/// Wire form of [`GeoPoint`]; the internal tag enforces `"type": "Point"`.
#[cfg(feature = "serde")]
#[derive(Serialize, Deserialize)]
#[serde(tag = "type")]
enum GeoJsonPoint {
    Point { coordinates: [f64; 2] },
}

#[cfg(feature = "serde")]
impl From<GeoJsonPoint> for GeoPoint {
    fn from(point: GeoJsonPoint) -> Self {
        let GeoJsonPoint::Point { coordinates } = point;
        Self { coordinates }
    }
}

#[cfg(feature = "serde")]
impl From<GeoPoint> for GeoJsonPoint {
    fn from(point: GeoPoint) -> Self {
        GeoJsonPoint::Point {
            coordinates: point.coordinates,
        }
    }
}

impl GeoPoint {
    /// Create a point from longitude and latitude.
    #[must_use]
    pub fn new(longitude: f64, latitude: f64) -> Self {
        Self {
            coordinates: [longitude, latitude],
        }
    }

    /// Longitude in decimal degrees.
    #[must_use]
    pub fn longitude(&self) -> f64 {
        self.coordinates[0]
    }

    /// Latitude in decimal degrees.
    #[must_use]
    pub fn latitude(&self) -> f64 {
        self.coordinates[1]
    }

    /// Whether both coordinates are within their valid ranges.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        (-180.0..=180.0).contains(&self.longitude()) && (-90.0..=90.0).contains(&self.latitude())
    }

    /// Great-circle distance to `other` in meters (haversine formula).
    ///
    /// # Examples
    ///
    /// ```
    /// use telemetry_types::GeoPoint;
    ///
    /// let a = GeoPoint::new(0.0, 0.0);
    /// let b = GeoPoint::new(1.0, 0.0);
    /// let d = a.distance_to(&b);
    /// assert!((d - 111_319.0).abs() < 100.0);
    /// ```
    #[must_use]
    pub fn distance_to(&self, other: &GeoPoint) -> f64 {
        let lat1 = self.latitude().to_radians();
        let lat2 = other.latitude().to_radians();
        let dlat = lat2 - lat1;
        let dlon = (other.longitude() - self.longitude()).to_radians();

        let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
        let c = 2.0 * a.sqrt().min(1.0).asin();

        EARTH_RADIUS_METERS * c
    }
}

impl From<Location> for GeoPoint {
    fn from(location: Location) -> Self {
        GeoPoint::new(location.longitude, location.latitude)
    }
}

/// Flat longitude/latitude pair as exchanged over the HTTP API.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(default))]
pub struct Location {
    pub longitude: f64,
    pub latitude: f64,
}

impl From<GeoPoint> for Location {
    fn from(point: GeoPoint) -> Self {
        Self {
            longitude: point.longitude(),
            latitude: point.latitude(),
        }
    }
}

/// A sensor that has not been persisted yet.
///
/// Carries everything a [`Sensor`] has except the identifier, which only the
/// store can assign.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct NewSensor {
    pub name: String,
    pub location: GeoPoint,
    pub tags: Vec<String>,
}

/// A registered sensor.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Sensor {
    /// Store-assigned identifier.
    pub id: SensorId,
    /// Human-readable name.
    pub name: String,
    /// Where the sensor is installed.
    pub location: GeoPoint,
    /// Free-form labels, in the order they were supplied.
    pub tags: Vec<String>,
}

impl Sensor {
    /// Attach an identifier to a new sensor.
    #[must_use]
    pub fn from_new(id: SensorId, sensor: NewSensor) -> Self {
        Self {
            id,
            name: sensor.name,
            location: sensor.location,
            tags: sensor.tags,
        }
    }
}

/// A measurement that has not been written yet.
///
/// There is no timestamp: the store stamps every sample with its own clock at
/// write time.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct NewMeasurement {
    /// Metric name, e.g. `temperature`.
    pub name: String,
    /// Identifier of the sensor that produced the sample.
    pub sensor_id: String,
    /// Unit of `value`, e.g. `Celsius`.
    pub unit: String,
    pub value: f64,
}

/// A written measurement.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Measurement {
    pub name: String,
    pub sensor_id: String,
    pub unit: String,
    pub value: f64,
    /// When the store accepted the sample.
    #[cfg_attr(feature = "serde", serde(with = "time::serde::rfc3339"))]
    pub timestamp: OffsetDateTime,
}

impl Measurement {
    /// Stamp a new measurement with `timestamp`.
    #[must_use]
    pub fn stamped(measurement: NewMeasurement, timestamp: OffsetDateTime) -> Self {
        Self {
            name: measurement.name,
            sensor_id: measurement.sensor_id,
            unit: measurement.unit,
            value: measurement.value,
            timestamp,
        }
    }
}

/// Statistical summary of one metric of one sensor over a time range.
///
/// `mean_value` is the mean of the daily means and `median_value` the median
/// of the daily medians. On the wire the median is published as
/// `average_value`, the name existing clients read it under.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MeasurementSummary {
    pub min_value: f64,
    pub max_value: f64,
    #[cfg_attr(feature = "serde", serde(rename = "average_value"))]
    pub median_value: f64,
    pub mean_value: f64,
    pub unit: String,
    pub count: u64,
}

impl MeasurementSummary {
    /// Whether no samples matched the query.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}
