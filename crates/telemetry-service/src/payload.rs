//! JSON request and response bodies.
//!
//! Request bodies default every missing field to a blank value so that
//! validation, not JSON decoding, reports what is missing.

use serde::{Deserialize, Serialize};

use telemetry_types::validation::{printable, required_list, required_str};
use telemetry_types::{Location, NewMeasurement, NewSensor, Sensor, SensorId, Validate, ValidationErrors};

/// Body of `POST /sensors` and `PUT /sensors/{id}`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct SensorPayload {
    pub name: String,
    pub location: Location,
    pub tags: Vec<String>,
}

impl Validate for SensorPayload {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        errors.check("name", required_str(&self.name));
        if let Err(nested) = self.location.validate() {
            errors.nest("location", nested);
        }
        errors.check("tags", required_list(&self.tags));

        errors.into_result()
    }
}

impl From<SensorPayload> for NewSensor {
    fn from(payload: SensorPayload) -> Self {
        Self {
            name: payload.name,
            location: payload.location.into(),
            tags: payload.tags,
        }
    }
}

/// Sensor as returned by the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorResponse {
    pub id: String,
    pub name: String,
    pub location: Location,
    pub tags: Vec<String>,
}

impl From<Sensor> for SensorResponse {
    fn from(sensor: Sensor) -> Self {
        Self {
            id: sensor.id.to_string(),
            name: sensor.name,
            location: sensor.location.into(),
            tags: sensor.tags,
        }
    }
}

/// Body of `POST /sensors/{id}/measurements`.
///
/// `sensor_id` and `timestamp` are accepted but ignored; the sensor comes
/// from the path and the timestamp from the store.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct MeasurementPayload {
    pub name: String,
    pub unit: String,
    pub value: Option<f64>,
}

impl Validate for MeasurementPayload {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        errors.check("name", required_str(&self.name).or_else(|| printable(&self.name)));
        errors.check("unit", required_str(&self.unit).or_else(|| printable(&self.unit)));
        match self.value {
            None => errors.push("value", telemetry_types::validation::BLANK),
            Some(v) if !v.is_finite() => errors.push("value", "must be a finite number"),
            Some(_) => {}
        }

        errors.into_result()
    }
}

impl MeasurementPayload {
    /// Attach the sensor the measurement belongs to.
    pub fn into_new_measurement(self, sensor_id: &SensorId) -> NewMeasurement {
        NewMeasurement {
            name: self.name,
            sensor_id: sensor_id.to_string(),
            unit: self.unit,
            value: self.value.unwrap_or_default(),
        }
    }
}
