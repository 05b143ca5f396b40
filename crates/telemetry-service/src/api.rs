//! REST API endpoints for the telemetry service.
//!
//! # Concurrency and Lock Acquisition
//!
//! - **`state.sensors`** (Mutex): Acquired for each sensor store call and
//!   released before the measurement store is touched.
//! - **`state.measurements`**: Shared trait object; backends do their own
//!   synchronization.
//!
//! ## Error Handling
//!
//! All endpoints return structured JSON errors via [`AppError`]. Validation
//! failures carry a `details` map keyed by field. Store failures return HTTP
//! 500 with a generic message; the cause is only logged.
//!
//! # Example
//!
//! ```ignore
//! use telemetry_service::api;
//!
//! let app = api::router().with_state(state);
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::{error, warn};

use telemetry_store::SummaryQuery;
use telemetry_types::{FieldDetail, Measurement, MeasurementSummary, Sensor, Validate, ValidationErrors};

use crate::payload::{MeasurementPayload, SensorPayload, SensorResponse};
use crate::state::AppState;

/// Create the API router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(health))
        .route("/sensors", post(create_sensor))
        .route("/sensors/nearest", get(get_nearest_sensor))
        .route("/sensors/name/{name}", get(get_sensor_by_name))
        .route("/sensors/{id}", get(get_sensor).put(update_sensor))
        .route("/sensors/{id}/measurements", post(create_measurement))
        .route(
            "/sensors/{id}/measurements/summary",
            get(get_measurement_summary),
        )
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

/// Health check endpoint.
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        timestamp: OffsetDateTime::now_utc(),
    })
}

/// Register a sensor.
async fn create_sensor(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<SensorPayload>, JsonRejection>,
) -> Result<(StatusCode, Json<SensorResponse>), AppError> {
    let payload = decode(payload)?;
    payload.validate().map_err(AppError::validation("invalid sensor"))?;

    let sensor = state
        .sensors
        .lock()
        .await
        .create_sensor(payload.into())
        .map_err(AppError::store("failed to create sensor"))?;

    Ok((StatusCode::CREATED, Json(sensor.into())))
}

/// Get a sensor by id.
async fn get_sensor(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<SensorResponse>, AppError> {
    let sensor = find_sensor(&state, &id).await?;
    Ok(Json(sensor.into()))
}

/// Get the first sensor registered under a name.
async fn get_sensor_by_name(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Json<SensorResponse>, AppError> {
    let sensor = state
        .sensors
        .lock()
        .await
        .get_sensor_by_name(&name)
        .map_err(sensor_error("failed to get sensor"))?;
    Ok(Json(sensor.into()))
}

/// Query parameters for the nearest sensor search.
#[derive(Debug, Deserialize)]
pub struct NearestQuery {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(rename = "maxDistance")]
    pub max_distance: f64,
}

/// Find the sensor closest to a point.
async fn get_nearest_sensor(
    State(state): State<Arc<AppState>>,
    query: Result<Query<NearestQuery>, QueryRejection>,
) -> Result<Json<SensorResponse>, AppError> {
    let Query(query) = query.map_err(|e| AppError::BadRequest(e.body_text()))?;

    let sensor = state
        .sensors
        .lock()
        .await
        .get_nearest_sensor(query.latitude, query.longitude, query.max_distance)
        .map_err(AppError::store("failed to get nearest sensor"))?
        .ok_or_else(|| {
            AppError::NotFound("no sensor found within the specified distance".to_string())
        })?;

    Ok(Json(sensor.into()))
}

/// Replace a sensor's name, location and tags.
async fn update_sensor(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    payload: Result<Json<SensorPayload>, JsonRejection>,
) -> Result<Json<SensorResponse>, AppError> {
    let payload = decode(payload)?;
    payload.validate().map_err(AppError::validation("invalid sensor"))?;

    let sensor = state
        .sensors
        .lock()
        .await
        .update_sensor(&id, payload.into())
        .map_err(sensor_error("failed to update sensor"))?;

    Ok(Json(sensor.into()))
}

/// Append a measurement to a sensor.
///
/// The sensor is looked up first; its id, not the one in the body, is
/// written with the measurement.
async fn create_measurement(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    payload: Result<Json<MeasurementPayload>, JsonRejection>,
) -> Result<(StatusCode, Json<Measurement>), AppError> {
    let payload = decode(payload)?;
    payload
        .validate()
        .map_err(AppError::validation("invalid measurement"))?;

    let sensor = find_sensor(&state, &id).await?;

    let measurement = state
        .measurements
        .create_measurement(payload.into_new_measurement(&sensor.id))
        .await
        .map_err(AppError::store("failed to create measurement"))?;

    Ok((StatusCode::CREATED, Json(measurement)))
}

/// Query parameters for a measurement summary.
#[derive(Debug, Default, Deserialize)]
pub struct SummaryParams {
    pub measurement: Option<String>,
    pub unit: Option<String>,
    pub start: Option<String>,
    pub end: Option<String>,
}

impl SummaryParams {
    /// Check presence and parse the time range.
    pub fn into_query(self, sensor: &Sensor) -> Result<SummaryQuery, AppError> {
        let measurement = required_param("measurement", self.measurement)?;
        let unit = required_param("unit", self.unit)?;
        let start = required_param("start", self.start)?;
        let end = required_param("end", self.end)?;

        let query = SummaryQuery::new(
            sensor.id.to_string(),
            measurement,
            unit,
            parse_time("start", &start)?,
            parse_time("end", &end)?,
        );
        query
            .validate_range()
            .map_err(|e| AppError::BadRequest(e.to_string()))?;

        Ok(query)
    }
}

fn required_param(name: &str, value: Option<String>) -> Result<String, AppError> {
    value
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::BadRequest(format!("{} query parameter is required", name)))
}

fn parse_time(name: &str, value: &str) -> Result<OffsetDateTime, AppError> {
    OffsetDateTime::parse(value, &Rfc3339)
        .map_err(|_| AppError::BadRequest(format!("failed to parse {} query parameter", name)))
}

/// Summarize one metric of a sensor over a time range.
///
/// A range without samples yields a zeroed summary.
async fn get_measurement_summary(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(params): Query<SummaryParams>,
) -> Result<Json<MeasurementSummary>, AppError> {
    let sensor = find_sensor(&state, &id).await?;
    let query = params.into_query(&sensor)?;

    let summary = state
        .measurements
        .get_measurement_summary(&query)
        .await
        .map_err(AppError::store("failed to get measurement summary"))?;

    Ok(Json(summary))
}

/// Look up a sensor by path id.
async fn find_sensor(state: &AppState, id: &str) -> Result<Sensor, AppError> {
    state
        .sensors
        .lock()
        .await
        .get_sensor_by_id(id)
        .map_err(sensor_error("failed to get sensor"))
}

/// Like [`AppError::store`], but a missing or malformed sensor id is a plain
/// "sensor not found", so both answer 404.
fn sensor_error(message: &'static str) -> impl FnOnce(telemetry_store::Error) -> AppError {
    move |e| match e {
        telemetry_store::Error::NotFound(_) | telemetry_store::Error::InvalidId(_) => {
            AppError::NotFound("sensor not found".to_string())
        }
        e => AppError::store(message)(e),
    }
}

fn decode<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    payload
        .map(|Json(body)| body)
        .map_err(|e| AppError::BadRequest(format!("invalid request body: {}", e.body_text())))
}

/// Application error type.
#[derive(Debug)]
pub enum AppError {
    Validation {
        message: String,
        details: BTreeMap<String, FieldDetail>,
    },
    BadRequest(String),
    NotFound(String),
    Store {
        message: String,
        source: telemetry_store::Error,
    },
}

impl AppError {
    /// Map validation failures to a 400 carrying per-field details.
    pub fn validation(message: &'static str) -> impl FnOnce(ValidationErrors) -> AppError {
        move |errors| AppError::Validation {
            message: message.to_string(),
            details: errors.details(),
        }
    }

    /// Map a store error, keeping `message` for the response when the store
    /// itself failed.
    pub fn store(message: &'static str) -> impl FnOnce(telemetry_store::Error) -> AppError {
        move |e| match e {
            telemetry_store::Error::NotFound(_) => AppError::NotFound(e.to_string()),
            e if e.is_client_error() => AppError::BadRequest(e.to_string()),
            e => AppError::Store {
                message: message.to_string(),
                source: e,
            },
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            AppError::Validation { .. } | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Store { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();

        let body = match self {
            AppError::Validation { message, details } => {
                warn!("{}: {:?}", message, details);
                serde_json::json!({
                    "error": message,
                    "details": details,
                })
            }
            AppError::BadRequest(message) | AppError::NotFound(message) => {
                warn!("{}", message);
                serde_json::json!({
                    "error": message,
                })
            }
            AppError::Store { message, source } => {
                error!("{}: {}", message, source);
                serde_json::json!({
                    "error": message,
                })
            }
        };

        (status, Json(body)).into_response()
    }
}
