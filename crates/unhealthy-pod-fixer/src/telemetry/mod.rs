//! Optional trace sink for operator-facing remediation messages.
//!
//! The engine always logs through `tracing`; when a sink is configured the
//! same messages are also forwarded to it. Delivery failures are logged and
//! dropped.

pub mod app_insights;

pub use app_insights::{AppInsightsConfig, AppInsightsSink};

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::error::TelemetryError;

/// Trace severity levels, numbered as the ingestion API expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Verbose,
    Information,
    Warning,
    Error,
    Critical,
}

impl Severity {
    /// Numeric severity level.
    #[must_use]
    pub const fn level(self) -> u8 {
        match self {
            Self::Verbose => 0,
            Self::Information => 1,
            Self::Warning => 2,
            Self::Error => 3,
            Self::Critical => 4,
        }
    }
}

/// Destination for trace messages.
#[async_trait]
pub trait TelemetrySink: Send + Sync {
    /// Get the name of this sink.
    fn name(&self) -> &'static str;

    /// Record one trace message.
    async fn track_trace(&self, message: &str, severity: Severity) -> Result<(), TelemetryError>;
}

/// Sink that discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

#[async_trait]
impl TelemetrySink for NoopSink {
    fn name(&self) -> &'static str {
        "noop"
    }

    async fn track_trace(&self, _message: &str, _severity: Severity) -> Result<(), TelemetryError> {
        Ok(())
    }
}

/// Trace dispatcher handed to the engine.
///
/// Messages are prefixed with the role name before they reach the sink.
pub struct Telemetry {
    sink: Arc<dyn TelemetrySink>,
    role_name: String,
    enabled: bool,
}

impl Telemetry {
    /// Telemetry backed by the no-op sink.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            sink: Arc::new(NoopSink),
            role_name: String::new(),
            enabled: false,
        }
    }

    /// Telemetry backed by a specific sink.
    #[must_use]
    pub fn with_sink(sink: Arc<dyn TelemetrySink>, role_name: impl Into<String>) -> Self {
        Self {
            sink,
            role_name: role_name.into(),
            enabled: true,
        }
    }

    /// Application Insights when `APPINSIGHTS_INSTRUMENTATIONKEY` is set, otherwise disabled.
    #[must_use]
    pub fn from_env(role_name: &str) -> Self {
        match AppInsightsSink::from_env(role_name) {
            Some(sink) => {
                info!(endpoint = %sink.endpoint_url(), "Application Insights telemetry enabled");
                Self::with_sink(Arc::new(sink), role_name)
            }
            None => {
                debug!("Telemetry disabled (APPINSIGHTS_INSTRUMENTATIONKEY not set)");
                Self::disabled()
            }
        }
    }

    /// Forward a message to the sink. Never fails.
    pub async fn trace(&self, message: &str, severity: Severity) {
        if !self.enabled {
            return;
        }

        let text = format!("{}: {}", self.role_name, message);
        if let Err(e) = self.sink.track_trace(&text, severity).await {
            warn!(sink = self.sink.name(), error = %e, "Failed to send telemetry trace");
        }
    }
}

impl Default for Telemetry {
    fn default() -> Self {
        Self::disabled()
    }
}
