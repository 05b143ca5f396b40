//! Telemetry Service - HTTP API for sensors and their measurements.
//!
//! Run with: `cargo run -p telemetry-service`

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use axum::Router;
use clap::Parser;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use telemetry_service::config::Backend;
use telemetry_service::{AppState, Config, api};
use telemetry_store::{InfluxMeasurementStore, LocalMeasurementStore, MeasurementStore, SensorStore};

/// Telemetry Service - HTTP REST API for geolocated sensors.
#[derive(Parser, Debug)]
#[command(name = "telemetry-service")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Bind address (overrides config).
    #[arg(short, long, env = "API__ADDRESS")]
    bind: Option<String>,

    /// Database path (overrides config).
    #[arg(short, long, env = "STORAGE__PATH")]
    database: Option<PathBuf>,

    /// Measurement backend (overrides config).
    #[arg(long, env = "MEASUREMENTS__BACKEND", value_enum)]
    backend: Option<Backend>,

    /// InfluxDB server URL.
    #[arg(long, env = "INFLUXDB__SERVER_URL")]
    influxdb_url: Option<String>,

    /// InfluxDB organization.
    #[arg(long, env = "INFLUXDB__ORG")]
    influxdb_org: Option<String>,

    /// InfluxDB bucket.
    #[arg(long, env = "INFLUXDB__BUCKET")]
    influxdb_bucket: Option<String>,

    /// InfluxDB API token.
    #[arg(long, env = "INFLUXDB__TOKEN", hide_env_values = true)]
    influxdb_token: Option<String>,

    /// Human-readable log output.
    #[arg(long, env = "DEV_MODE")]
    dev_mode: bool,
}

impl Args {
    /// Apply command-line and environment overrides on top of the file config.
    fn apply(self, config: &mut Config) {
        if let Some(bind) = self.bind {
            config.server.bind = bind;
        }
        if let Some(path) = self.database {
            config.storage.path = path;
        }
        if let Some(backend) = self.backend {
            config.measurements.backend = backend;
        }

        let influx = &mut config.measurements.influxdb;
        if let Some(url) = self.influxdb_url {
            influx.server_url = url;
        }
        if let Some(org) = self.influxdb_org {
            influx.org = org;
        }
        if let Some(bucket) = self.influxdb_bucket {
            influx.bucket = bucket;
        }
        if let Some(token) = self.influxdb_token {
            influx.token = token;
        }

        config.server.dev_mode |= self.dev_mode;
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Load configuration
    let mut config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::load_default().unwrap_or_default(),
    };
    args.apply(&mut config);

    init_logging(config.server.dev_mode)?;
    config.validate()?;

    // Open the stores
    let sensors = SensorStore::open(&config.storage.path)
        .with_context(|| format!("opening sensor store at {:?}", config.storage.path))?;
    let measurements = open_measurement_store(&config)?;
    info!("Using {} measurement backend", measurements.backend());

    let state = AppState::new(sensors, measurements);

    // Build the router
    let app = Router::new()
        .merge(api::router())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(Arc::clone(&state));

    let addr: SocketAddr = config.server.bind.parse()?;
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    match Arc::try_unwrap(state) {
        Ok(state) => state.close().await,
        Err(_) => warn!("State still in use at shutdown; stores not closed explicitly"),
    }

    Ok(())
}

fn init_logging(dev_mode: bool) -> anyhow::Result<()> {
    let filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive("telemetry_service=info".parse()?)
        .add_directive("telemetry_store=info".parse()?)
        .add_directive("tower_http=debug".parse()?);

    if dev_mode {
        tracing_subscriber::fmt()
            .pretty()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    Ok(())
}

fn open_measurement_store(config: &Config) -> anyhow::Result<Arc<dyn MeasurementStore>> {
    let store: Arc<dyn MeasurementStore> = match config.measurements.backend {
        Backend::Local => Arc::new(LocalMeasurementStore::open(&config.storage.path)?),
        Backend::InfluxDb => Arc::new(InfluxMeasurementStore::new(
            (&config.measurements.influxdb).into(),
        )?),
    };
    Ok(store)
}

/// Resolve on Ctrl-C, or SIGTERM on Unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
