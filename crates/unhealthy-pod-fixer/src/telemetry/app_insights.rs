//! Application Insights trace sink.
//!
//! Traces are posted to the classic ingestion endpoint as `MessageData`
//! envelopes, one request per trace.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use tracing::debug;

use super::{Severity, TelemetrySink};
use crate::error::TelemetryError;

/// Environment variable holding the instrumentation key.
const ENV_INSTRUMENTATION_KEY: &str = "APPINSIGHTS_INSTRUMENTATIONKEY";

/// Environment variable overriding the ingestion endpoint.
const ENV_ENDPOINT_URL: &str = "APPINSIGHTS_ENDPOINTURL";

/// Public ingestion endpoint.
pub const DEFAULT_ENDPOINT_URL: &str = "https://dc.services.visualstudio.com/v2/track";

/// Upper bound on one ingestion request, connect included.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Connection settings for the Application Insights sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppInsightsConfig {
    pub instrumentation_key: String,
    pub endpoint_url: String,
    pub role_name: String,
    pub request_timeout: Duration,
}

impl AppInsightsConfig {
    #[must_use]
    pub fn new(instrumentation_key: impl Into<String>, role_name: impl Into<String>) -> Self {
        Self {
            instrumentation_key: instrumentation_key.into(),
            endpoint_url: DEFAULT_ENDPOINT_URL.to_string(),
            role_name: role_name.into(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_request_timeout(mut self, request_timeout: Duration) -> Self {
        self.request_timeout = request_timeout;
        self
    }

    #[must_use]
    pub fn with_endpoint(mut self, endpoint_url: impl Into<String>) -> Self {
        self.endpoint_url = endpoint_url.into();
        self
    }

    /// Read settings from the process environment.
    ///
    /// Returns `None` unless `APPINSIGHTS_INSTRUMENTATIONKEY` is non-empty.
    #[must_use]
    pub fn from_env(role_name: &str) -> Option<Self> {
        Self::from_lookup(role_name, |key| std::env::var(key).ok())
    }

    fn from_lookup(role_name: &str, lookup: impl Fn(&str) -> Option<String>) -> Option<Self> {
        let key = lookup(ENV_INSTRUMENTATION_KEY).filter(|v| !v.is_empty())?;
        let config = Self::new(key, role_name);

        match lookup(ENV_ENDPOINT_URL).filter(|v| !v.is_empty()) {
            Some(endpoint) => Some(config.with_endpoint(endpoint)),
            None => Some(config),
        }
    }
}

/// Sink posting traces to Application Insights.
///
/// Requests are bounded by the configured timeout so a slow endpoint only
/// costs that long per trace.
pub struct AppInsightsSink {
    config: AppInsightsConfig,
    client: reqwest::Client,
}

impl AppInsightsSink {
    #[must_use]
    pub fn new(config: AppInsightsConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self { config, client }
    }

    /// Create a sink from environment variables, if configured.
    #[must_use]
    pub fn from_env(role_name: &str) -> Option<Self> {
        AppInsightsConfig::from_env(role_name).map(Self::new)
    }

    pub fn endpoint_url(&self) -> &str {
        &self.config.endpoint_url
    }

    fn envelope(&self, message: &str, severity: Severity, time: DateTime<Utc>) -> Envelope {
        let key = &self.config.instrumentation_key;
        let role = &self.config.role_name;

        Envelope {
            name: format!("Microsoft.ApplicationInsights.{}.Message", key.replace('-', "")),
            time: time.to_rfc3339_opts(SecondsFormat::Millis, true),
            i_key: key.clone(),
            tags: BTreeMap::from([("ai.cloud.role".to_string(), role.clone())]),
            data: EnvelopeData {
                base_type: "MessageData",
                base_data: MessageData {
                    ver: 2,
                    message: message.to_string(),
                    severity_level: severity.level(),
                    properties: BTreeMap::from([("RoleName".to_string(), role.clone())]),
                },
            },
        }
    }
}

#[async_trait]
impl TelemetrySink for AppInsightsSink {
    fn name(&self) -> &'static str {
        "app-insights"
    }

    async fn track_trace(&self, message: &str, severity: Severity) -> Result<(), TelemetryError> {
        let batch = [self.envelope(message, severity, Utc::now())];

        let response = self
            .client
            .post(&self.config.endpoint_url)
            .json(&batch)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            debug!(sink = "app-insights", "Trace sent");
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(TelemetryError::Rejected {
                status: status.as_u16(),
                body,
            })
        }
    }
}

// =============================================================================
// Ingestion API types
// =============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Envelope {
    name: String,
    time: String,
    i_key: String,
    tags: BTreeMap<String, String>,
    data: EnvelopeData,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EnvelopeData {
    base_type: &'static str,
    base_data: MessageData,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct MessageData {
    ver: u8,
    message: String,
    severity_level: u8,
    properties: BTreeMap<String, String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;
    use serial_test::serial;
    use std::collections::HashMap;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const KEY: &str = "0a1b2c3d-0000-1111-2222-333344445555";

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_config_requires_instrumentation_key() {
        assert!(AppInsightsConfig::from_lookup("role", lookup(&[])).is_none());
        assert!(
            AppInsightsConfig::from_lookup("role", lookup(&[(ENV_INSTRUMENTATION_KEY, "")]))
                .is_none()
        );
        assert!(AppInsightsConfig::from_lookup(
            "role",
            lookup(&[(ENV_ENDPOINT_URL, "http://localhost/v2/track")])
        )
        .is_none());
    }

    #[test]
    fn test_config_endpoint_override() {
        let config = AppInsightsConfig::from_lookup("role", lookup(&[(ENV_INSTRUMENTATION_KEY, KEY)]))
            .unwrap();
        assert_eq!(config.endpoint_url, DEFAULT_ENDPOINT_URL);
        assert_eq!(config.instrumentation_key, KEY);
        assert_eq!(config.request_timeout, DEFAULT_REQUEST_TIMEOUT);

        let config = AppInsightsConfig::from_lookup(
            "role",
            lookup(&[
                (ENV_INSTRUMENTATION_KEY, KEY),
                (ENV_ENDPOINT_URL, "https://eu.example.com/v2/track"),
            ]),
        )
        .unwrap();
        assert_eq!(config.endpoint_url, "https://eu.example.com/v2/track");
        assert_eq!(config.role_name, "role");
    }

    #[test]
    #[serial]
    fn test_from_env() {
        // SAFETY: This test runs serially via #[serial] to avoid env var races
        unsafe {
            std::env::set_var(ENV_INSTRUMENTATION_KEY, KEY);
            std::env::remove_var(ENV_ENDPOINT_URL);
        }
        let sink = AppInsightsSink::from_env("k8s-fix-unhealthy-pod");
        unsafe {
            std::env::remove_var(ENV_INSTRUMENTATION_KEY);
        }

        let sink = sink.unwrap();
        assert_eq!(sink.endpoint_url(), DEFAULT_ENDPOINT_URL);
        assert!(AppInsightsSink::from_env("k8s-fix-unhealthy-pod").is_none());
    }

    #[test]
    fn test_envelope_shape() {
        let sink = AppInsightsSink::new(AppInsightsConfig::new(KEY, "k8s-fix-unhealthy-pod"));
        let time = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();

        let envelope = sink.envelope("k8s-fix-unhealthy-pod: hello", Severity::Information, time);
        let value = serde_json::to_value(&envelope).unwrap();

        assert_eq!(
            value,
            json!({
                "name": "Microsoft.ApplicationInsights.0a1b2c3d000011112222333344445555.Message",
                "time": "2024-03-01T12:00:00.000Z",
                "iKey": KEY,
                "tags": { "ai.cloud.role": "k8s-fix-unhealthy-pod" },
                "data": {
                    "baseType": "MessageData",
                    "baseData": {
                        "ver": 2,
                        "message": "k8s-fix-unhealthy-pod: hello",
                        "severityLevel": 1,
                        "properties": { "RoleName": "k8s-fix-unhealthy-pod" }
                    }
                }
            })
        );
    }

    #[tokio::test]
    async fn test_track_trace_posts_envelope() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v2/track"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let config = AppInsightsConfig::new(KEY, "k8s-fix-unhealthy-pod")
            .with_endpoint(format!("{}/v2/track", server.uri()));
        let sink = AppInsightsSink::new(config);

        sink.track_trace("processed unhealthy pod", Severity::Information)
            .await
            .unwrap();

        let requests = server.received_requests().await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
        assert_eq!(body[0]["iKey"], KEY);
        assert_eq!(body[0]["data"]["baseData"]["message"], "processed unhealthy pod");
    }

    #[tokio::test]
    async fn test_track_trace_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_string("invalid key"))
            .mount(&server)
            .await;

        let config = AppInsightsConfig::new(KEY, "role").with_endpoint(server.uri());
        let err = AppInsightsSink::new(config)
            .track_trace("message", Severity::Error)
            .await
            .unwrap_err();

        match err {
            TelemetryError::Rejected { status, body } => {
                assert_eq!(status, 400);
                assert_eq!(body, "invalid key");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_track_trace_times_out_on_unresponsive_endpoint() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3600)))
            .mount(&server)
            .await;

        let config = AppInsightsConfig::new(KEY, "role")
            .with_endpoint(server.uri())
            .with_request_timeout(Duration::from_millis(200));

        let result = tokio::time::timeout(
            Duration::from_secs(10),
            AppInsightsSink::new(config).track_trace("message", Severity::Information),
        )
        .await
        .expect("trace delivery should give up before the outer deadline");

        assert!(matches!(result, Err(TelemetryError::Http(_))));
    }
}
