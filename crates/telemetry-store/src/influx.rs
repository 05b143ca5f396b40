//! InfluxDB 2.x measurement backend.
//!
//! Writes go through the v2 line-protocol endpoint, one point per request.
//! Summaries run a single Flux script that yields the five summary streams
//! and are read back as annotated CSV.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use serde::Deserialize;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::{debug, info};

use telemetry_types::{Measurement, MeasurementSummary, NewMeasurement};

use crate::error::{Error, Result};
use crate::measurements::{
    MeasurementStore, RESULT_COUNT, RESULT_MAX, RESULT_MEAN, RESULT_MEDIAN, RESULT_MIN,
    ResultRow, RowValue, SummaryAccumulator, SummaryQuery,
};

/// Default timeout for requests to the InfluxDB server.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Connection settings for an InfluxDB 2.x server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InfluxConfig {
    /// Base URL, e.g. `http://localhost:8086`.
    pub server_url: String,
    pub org: String,
    pub bucket: String,
    /// API token sent as `Authorization: Token <token>`.
    pub token: String,
}

/// Measurement store backed by an InfluxDB 2.x server.
pub struct InfluxMeasurementStore {
    client: Client,
    config: InfluxConfig,
}

impl InfluxMeasurementStore {
    /// Create a store for the given server.
    ///
    /// No request is made until the first write or query.
    pub fn new(config: InfluxConfig) -> Result<Self> {
        let client = Client::builder().timeout(DEFAULT_TIMEOUT).build()?;
        info!(
            "Using InfluxDB at {} (org {}, bucket {})",
            config.server_url, config.org, config.bucket
        );
        Ok(Self { client, config })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.server_url.trim_end_matches('/'), path)
    }

    fn auth(&self) -> String {
        format!("Token {}", self.config.token)
    }
}

#[async_trait]
impl MeasurementStore for InfluxMeasurementStore {
    fn backend(&self) -> &'static str {
        "influxdb"
    }

    async fn create_measurement(&self, measurement: NewMeasurement) -> Result<Measurement> {
        let measurement = Measurement::stamped(measurement, OffsetDateTime::now_utc());
        let line = line_protocol(&measurement)?;
        debug!("Writing point: {line}");

        let response = self
            .client
            .post(self.url("/api/v2/write"))
            .query(&[
                ("org", self.config.org.as_str()),
                ("bucket", self.config.bucket.as_str()),
                ("precision", "ns"),
            ])
            .header(AUTHORIZATION, self.auth())
            .header(CONTENT_TYPE, "text/plain; charset=utf-8")
            .body(line)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(server_error("failed to write the measurement point", response).await);
        }

        Ok(measurement)
    }

    async fn get_measurement_summary(&self, query: &SummaryQuery) -> Result<MeasurementSummary> {
        query.validate_range()?;

        let flux = build_flux(&self.config.bucket, query)?;
        debug!("Executing query:\n{flux}");

        let body = serde_json::json!({
            "query": flux,
            "type": "flux",
            "dialect": {
                "header": true,
                "annotations": ["datatype", "group", "default"],
            },
        });

        let response = self
            .client
            .post(self.url("/api/v2/query"))
            .query(&[("org", self.config.org.as_str())])
            .header(AUTHORIZATION, self.auth())
            .header(ACCEPT, "application/csv")
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(server_error("failed to query measurement summary", response).await);
        }

        let text = response.text().await?;
        let mut acc = SummaryAccumulator::new();
        acc.extend(parse_annotated_csv(&text)?)?;
        Ok(acc.finish())
    }

    async fn close(&self) -> Result<()> {
        // reqwest releases pooled connections when the last client handle drops
        info!("Closing InfluxDB client");
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

async fn server_error(context: &str, response: reqwest::Response) -> Error {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ApiError>(&body)
        .map(|e| e.message)
        .unwrap_or(body);
    Error::Query(format!("{context}: {status}: {message}"))
}

/// Render a measurement as one line of InfluxDB line protocol.
///
/// `<name>,sensor_id=<id>,unit=<unit> value=<v> <ns>`
///
/// Line protocol has no escape for line breaks, so any control character in
/// the name or a tag is rejected with [`Error::InvalidInput`].
pub fn line_protocol(measurement: &Measurement) -> Result<String> {
    for (field, value) in [
        ("name", &measurement.name),
        ("sensor_id", &measurement.sensor_id),
        ("unit", &measurement.unit),
    ] {
        if value.chars().any(char::is_control) {
            return Err(Error::InvalidInput(format!(
                "{field} must not contain control characters"
            )));
        }
    }

    Ok(format!(
        "{},sensor_id={},unit={} value={} {}",
        escape_measurement(&measurement.name),
        escape_tag(&measurement.sensor_id),
        escape_tag(&measurement.unit),
        measurement.value,
        measurement.timestamp.unix_timestamp_nanos(),
    ))
}

fn escape_measurement(s: &str) -> String {
    escape(s, &[',', ' '])
}

fn escape_tag(s: &str) -> String {
    escape(s, &[',', '=', ' '])
}

fn escape(s: &str, special: &[char]) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if special.contains(&c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Quote a value as a Flux string literal.
pub fn flux_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '$' => out.push_str("\\$"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Build the Flux script for a summary query.
pub fn build_flux(bucket: &str, query: &SummaryQuery) -> Result<String> {
    let start = query
        .start
        .format(&Rfc3339)
        .map_err(|e| Error::InvalidInput(format!("invalid start time: {e}")))?;
    let stop = query
        .end
        .format(&Rfc3339)
        .map_err(|e| Error::InvalidInput(format!("invalid end time: {e}")))?;

    Ok(format!(
        r#"result = from(bucket: {bucket})
    |> range(start: {start}, stop: {stop})
    |> filter(fn: (r) => r["_measurement"] == {measurement})
    |> filter(fn: (r) => r["_field"] == "value")
    |> filter(fn: (r) => r["sensor_id"] == {sensor_id})
    |> filter(fn: (r) => r["unit"] == {unit})

result
    |> aggregateWindow(every: 1d, fn: mean, createEmpty: false)
    |> mean()
    |> yield(name: "{RESULT_MEAN}")

result
    |> aggregateWindow(every: 1d, fn: median, createEmpty: false)
    |> median()
    |> yield(name: "{RESULT_MEDIAN}")

result
    |> count()
    |> yield(name: "{RESULT_COUNT}")

result
    |> min()
    |> yield(name: "{RESULT_MIN}")

result
    |> max()
    |> yield(name: "{RESULT_MAX}")
"#,
        bucket = flux_string(bucket),
        measurement = flux_string(&query.measurement),
        sensor_id = flux_string(&query.sensor_id),
        unit = flux_string(&query.unit),
    ))
}

/// Column layout of the table block currently being read.
#[derive(Debug, Default)]
struct TableBlock {
    datatypes: Vec<String>,
    defaults: Vec<String>,
    header: Option<Vec<String>>,
}

impl TableBlock {
    fn column(&self, name: &str) -> Option<usize> {
        self.header.as_ref()?.iter().position(|c| c == name)
    }
}

/// Parse an annotated CSV query response into result rows.
///
/// Each table block starts with optional `#datatype`, `#group` and
/// `#default` annotation rows followed by a header row. Blocks are separated
/// by blank lines. An `error` table is turned into [`Error::Query`].
pub fn parse_annotated_csv(body: &str) -> Result<Vec<ResultRow>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(body.as_bytes());

    let mut rows = Vec::new();
    let mut block = TableBlock::default();
    let mut in_annotations = false;

    for record in reader.records() {
        let record = record?;
        let first = record.get(0).unwrap_or_default();

        if record.iter().all(str::is_empty) {
            block = TableBlock::default();
            in_annotations = false;
            continue;
        }

        if let Some(annotation) = first.strip_prefix('#') {
            if !in_annotations {
                block = TableBlock::default();
                in_annotations = true;
            }
            let cells = record.iter().map(str::to_string).collect();
            match annotation {
                "datatype" => block.datatypes = cells,
                "default" => block.defaults = cells,
                _ => {}
            }
            continue;
        }
        in_annotations = false;

        if block.header.is_none() {
            block.header = Some(record.iter().map(str::to_string).collect());
            continue;
        }

        if let Some(idx) = block.column("error") {
            let message = record.get(idx).unwrap_or_default();
            return Err(Error::Query(format!("query failed: {message}")));
        }

        let value_idx = block
            .column("_value")
            .ok_or_else(|| Error::Query("response table has no _value column".to_string()))?;
        let raw = record.get(value_idx).unwrap_or_default();
        if raw.is_empty() {
            continue;
        }

        let result = block
            .column("result")
            .and_then(|idx| {
                record
                    .get(idx)
                    .filter(|s| !s.is_empty())
                    .or_else(|| block.defaults.get(idx).map(String::as_str))
            })
            .unwrap_or_default()
            .to_string();

        let unit = block
            .column("unit")
            .and_then(|idx| record.get(idx))
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        let datatype = block.datatypes.get(value_idx).map(String::as_str);
        let value = parse_value(raw, datatype)?;

        rows.push(ResultRow {
            result,
            value,
            unit,
        });
    }

    Ok(rows)
}

fn parse_value(raw: &str, datatype: Option<&str>) -> Result<RowValue> {
    let invalid = || Error::Query(format!("invalid {} value: {raw}", datatype.unwrap_or("untyped")));

    match datatype {
        Some("double") => raw.parse().map(RowValue::Float).map_err(|_| invalid()),
        Some("long") => raw.parse().map(RowValue::Integer).map_err(|_| invalid()),
        Some("unsignedLong") => raw
            .parse::<u64>()
            .ok()
            .and_then(|n| i64::try_from(n).ok())
            .map(RowValue::Integer)
            .ok_or_else(invalid),
        Some(other) => Err(Error::Query(format!("unsupported value datatype: {other}"))),
        None => raw
            .parse()
            .map(RowValue::Integer)
            .or_else(|_| raw.parse().map(RowValue::Float))
            .map_err(|_| invalid()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn query() -> SummaryQuery {
        SummaryQuery::new(
            "3f2c1e8a-0000-4000-8000-000000000001",
            "temperature",
            "Celsius",
            datetime!(2024-03-01 00:00 UTC),
            datetime!(2024-03-08 00:00 UTC),
        )
    }

    #[test]
    fn test_line_protocol_escaping() {
        let measurement = Measurement::stamped(
            NewMeasurement {
                name: "air temp,inside".to_string(),
                sensor_id: "abc".to_string(),
                unit: "deg C=x".to_string(),
                value: 21.5,
            },
            datetime!(2024-03-01 00:00:01 UTC),
        );

        assert_eq!(
            line_protocol(&measurement).unwrap(),
            r"air\ temp\,inside,sensor_id=abc,unit=deg\ C\=x value=21.5 1709251201000000000"
        );
    }

    #[test]
    fn test_line_protocol_rejects_line_breaks() {
        let measurement = Measurement::stamped(
            NewMeasurement {
                name: "temperature".to_string(),
                sensor_id: "victim".to_string(),
                unit: "c value=1 0\ntemperature,sensor_id=other,unit=c value=999".to_string(),
                value: 21.5,
            },
            datetime!(2024-03-01 00:00:01 UTC),
        );

        let err = line_protocol(&measurement).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(msg) if msg.starts_with("unit")));
    }

    #[test]
    fn test_flux_string_escaping() {
        assert_eq!(flux_string("plain"), r#""plain""#);
        assert_eq!(
            flux_string(r#"a"b\c${d}"#),
            r#""a\"b\\c\${d}""#
        );
    }

    #[test]
    fn test_build_flux() {
        let flux = build_flux("sensors", &query()).unwrap();

        assert!(flux.starts_with(r#"result = from(bucket: "sensors")"#));
        assert!(flux.contains("range(start: 2024-03-01T00:00:00Z, stop: 2024-03-08T00:00:00Z)"));
        assert!(flux.contains(r#"r["_measurement"] == "temperature""#));
        assert!(flux.contains(r#"r["sensor_id"] == "3f2c1e8a-0000-4000-8000-000000000001""#));
        assert!(flux.contains(r#"r["unit"] == "Celsius""#));
        assert_eq!(
            flux.matches("aggregateWindow(every: 1d").count(),
            2,
        );
        assert_eq!(flux.matches("createEmpty: false").count(), 2);

        for name in [RESULT_MEAN, RESULT_MEDIAN, RESULT_COUNT, RESULT_MIN, RESULT_MAX] {
            assert!(flux.contains(&format!(r#"yield(name: "{name}")"#)));
        }

        // The max stream must use the max reducer
        let max_pass = flux.split("\n\n").last().unwrap();
        assert!(max_pass.contains("|> max()"));
        assert!(!max_pass.contains("|> min()"));
    }

    #[test]
    fn test_build_flux_escapes_parameters() {
        let mut q = query();
        q.measurement = r#"x") |> drop(columns: ["a"]"#.to_string();
        let flux = build_flux("sensors", &q).unwrap();
        assert!(flux.contains(r#"== "x\") |> drop(columns: [\"a\"]""#));
    }

    const RESPONSE: &str = "\
#datatype,string,long,dateTime:RFC3339,dateTime:RFC3339,double,string,string,string,string
#group,false,false,true,true,false,true,true,true,true
#default,mean,,,,,,,,
,result,table,_start,_stop,_value,_field,_measurement,sensor_id,unit
,,0,2024-03-01T00:00:00Z,2024-03-08T00:00:00Z,24.5,value,temperature,abc,Celsius

#datatype,string,long,dateTime:RFC3339,dateTime:RFC3339,double,string,string,string,string
#group,false,false,true,true,false,true,true,true,true
#default,median,,,,,,,,
,result,table,_start,_stop,_value,_field,_measurement,sensor_id,unit
,,0,2024-03-01T00:00:00Z,2024-03-08T00:00:00Z,23,value,temperature,abc,Celsius

#datatype,string,long,dateTime:RFC3339,dateTime:RFC3339,long,string,string,string,string
#group,false,false,true,true,false,true,true,true,true
#default,count,,,,,,,,
,result,table,_start,_stop,_value,_field,_measurement,sensor_id,unit
,,0,2024-03-01T00:00:00Z,2024-03-08T00:00:00Z,120,value,temperature,abc,Celsius

#datatype,string,long,dateTime:RFC3339,dateTime:RFC3339,dateTime:RFC3339,double,string,string,string,string
#group,false,false,true,true,false,false,true,true,true,true
#default,_result,,,,,,,,,
,result,table,_start,_stop,_time,_value,_field,_measurement,sensor_id,unit
,min,0,2024-03-01T00:00:00Z,2024-03-08T00:00:00Z,2024-03-02T10:00:00Z,15.25,value,temperature,abc,Celsius
,max,1,2024-03-01T00:00:00Z,2024-03-08T00:00:00Z,2024-03-05T14:00:00Z,44.75,value,temperature,abc,Celsius

";

    #[test]
    fn test_parse_annotated_csv() {
        let rows = parse_annotated_csv(RESPONSE).unwrap();
        assert_eq!(
            rows,
            vec![
                ResultRow::float(RESULT_MEAN, 24.5, Some("Celsius")),
                ResultRow::float(RESULT_MEDIAN, 23.0, Some("Celsius")),
                ResultRow::integer(RESULT_COUNT, 120, Some("Celsius")),
                ResultRow::float(RESULT_MIN, 15.25, Some("Celsius")),
                ResultRow::float(RESULT_MAX, 44.75, Some("Celsius")),
            ]
        );

        let mut acc = SummaryAccumulator::new();
        acc.extend(rows).unwrap();
        let summary = acc.finish();
        assert_eq!(summary.count, 120);
        assert_eq!(summary.median_value, 23.0);
        assert_eq!(summary.unit, "Celsius");
    }

    #[test]
    fn test_parse_empty_response() {
        assert!(parse_annotated_csv("").unwrap().is_empty());
        assert!(parse_annotated_csv("\r\n").unwrap().is_empty());
    }

    #[test]
    fn test_parse_error_table() {
        let body = "\
#datatype,string,string
#group,true,true
#default,,
,error,reference
,\"failed to initialize execute state: bucket not found\",897
";
        let err = parse_annotated_csv(body).unwrap_err();
        assert!(matches!(err, Error::Query(msg) if msg.contains("bucket not found")));
    }

    #[test]
    fn test_parse_value_types() {
        assert_eq!(parse_value("1.5", Some("double")).unwrap(), RowValue::Float(1.5));
        assert_eq!(parse_value("7", Some("long")).unwrap(), RowValue::Integer(7));
        assert_eq!(
            parse_value("7", Some("unsignedLong")).unwrap(),
            RowValue::Integer(7)
        );
        assert_eq!(parse_value("7", None).unwrap(), RowValue::Integer(7));
        assert_eq!(parse_value("7.5", None).unwrap(), RowValue::Float(7.5));
        assert!(parse_value("x", Some("double")).is_err());
        assert!(parse_value("true", Some("boolean")).is_err());
    }

    #[tokio::test]
    async fn test_empty_range_rejected_before_request() {
        // Unroutable address; the range check must fail first
        let store = InfluxMeasurementStore::new(InfluxConfig {
            server_url: "http://127.0.0.1:9".to_string(),
            org: "org".to_string(),
            bucket: "bucket".to_string(),
            token: "token".to_string(),
        })
        .unwrap();

        let mut q = query();
        q.end = q.start;
        let err = store.get_measurement_summary(&q).await.unwrap_err();
        assert!(matches!(err, Error::EmptyRange { .. }));
    }
    mod server {
        use super::*;
        use std::collections::HashMap;
        use std::sync::{Arc, Mutex};

        use axum::Router;
        use axum::extract::{Query, State};
        use axum::http::{HeaderMap, StatusCode, Uri};

        /// One request as seen by the fake InfluxDB server.
        #[derive(Debug, Clone)]
        struct Recorded {
            path: String,
            params: HashMap<String, String>,
            authorization: Option<String>,
            accept: Option<String>,
            content_type: Option<String>,
            body: String,
        }

        struct FakeInflux {
            status: StatusCode,
            response: &'static str,
            requests: Mutex<Vec<Recorded>>,
        }

        impl FakeInflux {
            fn requests(&self) -> Vec<Recorded> {
                self.requests.lock().unwrap().clone()
            }
        }

        async fn record(
            State(fake): State<Arc<FakeInflux>>,
            uri: Uri,
            Query(params): Query<HashMap<String, String>>,
            headers: HeaderMap,
            body: String,
        ) -> (StatusCode, &'static str) {
            let header = |name: &str| {
                headers
                    .get(name)
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string)
            };
            fake.requests.lock().unwrap().push(Recorded {
                path: uri.path().to_string(),
                params,
                authorization: header("authorization"),
                accept: header("accept"),
                content_type: header("content-type"),
                body,
            });
            (fake.status, fake.response)
        }

        /// Start a fake server answering every request with `status` and
        /// `response`, and a store pointed at it.
        async fn start(
            status: StatusCode,
            response: &'static str,
        ) -> (InfluxMeasurementStore, Arc<FakeInflux>) {
            let fake = Arc::new(FakeInflux {
                status,
                response,
                requests: Mutex::new(Vec::new()),
            });
            let app = Router::new().fallback(record).with_state(Arc::clone(&fake));

            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            let addr = listener.local_addr().unwrap();
            tokio::spawn(async move {
                axum::serve(listener, app).await.unwrap();
            });

            let store = InfluxMeasurementStore::new(InfluxConfig {
                server_url: format!("http://{addr}/"),
                org: "acme".to_string(),
                bucket: "sensors".to_string(),
                token: "s3cret".to_string(),
            })
            .unwrap();
            (store, fake)
        }

        fn temperature(unit: &str) -> NewMeasurement {
            NewMeasurement {
                name: "temperature".to_string(),
                sensor_id: "3f2c1e8a-0000-4000-8000-000000000001".to_string(),
                unit: unit.to_string(),
                value: 21.5,
            }
        }

        #[tokio::test]
        async fn test_write_posts_one_point() {
            let (store, fake) = start(StatusCode::NO_CONTENT, "").await;

            let written = store.create_measurement(temperature("Celsius")).await.unwrap();
            assert_eq!(written.value, 21.5);

            let requests = fake.requests();
            assert_eq!(requests.len(), 1);
            let request = &requests[0];
            assert_eq!(request.path, "/api/v2/write");
            assert_eq!(request.params["org"], "acme");
            assert_eq!(request.params["bucket"], "sensors");
            assert_eq!(request.params["precision"], "ns");
            assert_eq!(request.authorization.as_deref(), Some("Token s3cret"));
            assert!(
                request
                    .content_type
                    .as_deref()
                    .is_some_and(|ct| ct.starts_with("text/plain"))
            );
            assert_eq!(request.body, line_protocol(&written).unwrap());
            assert_eq!(request.body.lines().count(), 1);
        }

        #[tokio::test]
        async fn test_write_with_line_break_sends_nothing() {
            let (store, fake) = start(StatusCode::NO_CONTENT, "").await;

            let err = store
                .create_measurement(temperature("c\ntemperature,sensor_id=other value=999"))
                .await
                .unwrap_err();
            assert!(matches!(err, Error::InvalidInput(_)));
            assert!(fake.requests().is_empty());
        }

        #[tokio::test]
        async fn test_summary_query() {
            let (store, fake) = start(StatusCode::OK, RESPONSE).await;

            let summary = store.get_measurement_summary(&query()).await.unwrap();
            assert_eq!(
                summary,
                MeasurementSummary {
                    min_value: 15.25,
                    max_value: 44.75,
                    median_value: 23.0,
                    mean_value: 24.5,
                    unit: "Celsius".to_string(),
                    count: 120,
                }
            );

            let requests = fake.requests();
            assert_eq!(requests.len(), 1);
            let request = &requests[0];
            assert_eq!(request.path, "/api/v2/query");
            assert_eq!(request.params.get("org").map(String::as_str), Some("acme"));
            assert!(!request.params.contains_key("bucket"));
            assert_eq!(request.authorization.as_deref(), Some("Token s3cret"));
            assert_eq!(request.accept.as_deref(), Some("application/csv"));
            assert_eq!(request.content_type.as_deref(), Some("application/json"));

            let body: serde_json::Value = serde_json::from_str(&request.body).unwrap();
            assert_eq!(body["type"], "flux");
            assert_eq!(body["query"], build_flux("sensors", &query()).unwrap());
            assert_eq!(
                body["dialect"]["annotations"],
                serde_json::json!(["datatype", "group", "default"])
            );
        }

        #[tokio::test]
        async fn test_summary_server_error_message() {
            let (store, _fake) = start(
                StatusCode::BAD_REQUEST,
                r#"{"code":"invalid","message":"bucket \"sensors\" not found"}"#,
            )
            .await;

            let err = store.get_measurement_summary(&query()).await.unwrap_err();
            assert!(matches!(
                &err,
                Error::Query(msg) if msg.contains("400") && msg.contains(r#"bucket "sensors" not found"#)
            ));
            assert!(!err.is_client_error());
        }

        #[tokio::test]
        async fn test_write_server_error_plain_body() {
            let (store, _fake) = start(StatusCode::UNAUTHORIZED, "unauthorized access").await;

            let err = store
                .create_measurement(temperature("Celsius"))
                .await
                .unwrap_err();
            assert!(matches!(
                err,
                Error::Query(msg) if msg.starts_with("failed to write the measurement point")
                    && msg.ends_with("unauthorized access")
            ));
        }
    }
}
