//! HTTP REST API for geolocated sensors and their measurements.
//!
//! This crate provides a service that:
//! - Registers sensors and looks them up by id, name or proximity
//! - Accepts measurements and stamps them on arrival
//! - Summarizes a metric over a time range (min, max, mean, median, count)
//!
//! # REST API Endpoints
//!
//! - `GET /health` - Service health check
//! - `POST /sensors` - Register a sensor
//! - `GET /sensors/nearest?latitude=&longitude=&maxDistance=` - Closest sensor
//! - `GET /sensors/name/{name}` - Sensor by name
//! - `GET /sensors/{id}` / `PUT /sensors/{id}` - Get or replace a sensor
//! - `POST /sensors/{id}/measurements` - Append a measurement
//! - `GET /sensors/{id}/measurements/summary?measurement=&unit=&start=&end=` -
//!   Summary over an RFC 3339 range
//!
//! # Configuration
//!
//! The service reads configuration from `~/.config/telemetry/server.toml`:
//!
//! ```toml
//! [server]
//! bind = "127.0.0.1:3000"
//! dev_mode = false
//!
//! [storage]
//! path = "~/.local/share/telemetry/telemetry.db"
//!
//! [measurements]
//! backend = "influxdb"   # or "local"
//!
//! [measurements.influxdb]
//! server_url = "http://localhost:8086"
//! org = "acme"
//! bucket = "sensors"
//! token = "..."
//! ```

pub mod api;
pub mod config;
pub mod payload;
pub mod state;

pub use config::{Config, ConfigError, InfluxDbConfig, MeasurementsConfig, ServerConfig, StorageConfig};
pub use state::AppState;
