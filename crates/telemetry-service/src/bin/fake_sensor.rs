//! Fake temperature sensor.
//!
//! Registers a sensor with a random name and location, then posts a
//! temperature reading at a fixed interval until interrupted.
//!
//! Run with: `cargo run -p telemetry-service --bin fake-sensor`

use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use rand::Rng;
use rand::seq::IndexedRandom;
use reqwest::Client;
use serde_json::json;
use tracing::{info, warn};

use telemetry_service::payload::SensorResponse;
use telemetry_types::Measurement;

const WORDS: &[&str] = &[
    "amber", "basil", "cedar", "delta", "ember", "fjord", "granite", "harbor", "iris", "juniper",
    "kestrel", "lagoon", "maple", "nova", "orchid", "pine", "quartz", "river", "sierra", "tundra",
];

/// Fake temperature sensor that feeds the telemetry service.
#[derive(Parser, Debug)]
#[command(name = "fake-sensor")]
#[command(version, about, long_about = None)]
struct Args {
    /// Base URL of the telemetry service.
    #[arg(long, env = "API__URL", default_value = "http://localhost:3000")]
    url: String,

    /// Milliseconds between readings.
    #[arg(long, default_value_t = 100)]
    interval_ms: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("fake_sensor=info".parse()?),
        )
        .init();

    let args = Args::parse();
    let client = Client::new();
    let base = args.url.trim_end_matches('/');

    let sensor = create_sensor(&client, base).await?;
    info!("Sensor created: {} ({})", sensor.name, sensor.id);

    let mut interval = tokio::time::interval(Duration::from_millis(args.interval_ms.max(1)));
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Stopping");
                return Ok(());
            }
            _ = interval.tick() => {
                match post_reading(&client, base, &sensor.id).await {
                    Ok(measurement) => info!("Measurement posted: {} {}", measurement.value, measurement.unit),
                    Err(e) => warn!("Failed to post measurement: {:#}", e),
                }
            }
        }
    }
}

async fn create_sensor(client: &Client, base: &str) -> anyhow::Result<SensorResponse> {
    let body = {
        let mut rng = rand::rng();
        let pick = |rng: &mut rand::rngs::ThreadRng| *WORDS.choose(rng).unwrap_or(&"sensor");
        json!({
            "name": format!("{}-{}", pick(&mut rng), rng.random_range(1000..10000)),
            "location": {
                "longitude": rng.random_range(-180.0..180.0),
                "latitude": rng.random_range(-90.0..90.0),
            },
            "tags": [pick(&mut rng), pick(&mut rng)],
        })
    };

    let sensor = client
        .post(format!("{}/sensors", base))
        .json(&body)
        .send()
        .await
        .context("failed to create sensor")?
        .error_for_status()
        .context("error returned by the API")?
        .json()
        .await?;

    Ok(sensor)
}

async fn post_reading(client: &Client, base: &str, sensor_id: &str) -> anyhow::Result<Measurement> {
    // Uniform in [15, 45) degrees Celsius
    let value: f64 = rand::rng().random_range(15.0..45.0);

    let measurement = client
        .post(format!("{}/sensors/{}/measurements", base, sensor_id))
        .json(&json!({
            "name": "temperature",
            "unit": "Celsius",
            "value": value,
        }))
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;

    Ok(measurement)
}
