//! Remediation settings with their defaults.

use std::fmt;

use crate::filter::{EventFilter, CLIENT_TIMEOUT_SIGNATURE};

/// Namespace scanned when none is given.
pub const DEFAULT_NAMESPACE: &str = "default";

/// Seconds a deleted pod's containers get to shut down before they are killed.
pub const DEFAULT_GRACE_PERIOD_SECONDS: u32 = 30;

/// Role name attached to every telemetry trace.
pub const ROLE_NAME: &str = "k8s-fix-unhealthy-pod";

/// How dependents of a deleted pod are garbage collected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum Propagation {
    /// Dependents are left in place
    Orphan,
    /// The pod disappears from the API at once; dependents are removed afterwards
    #[default]
    Background,
    /// Dependents are removed before the pod
    Foreground,
}

impl Propagation {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Orphan => "Orphan",
            Self::Background => "Background",
            Self::Foreground => "Foreground",
        }
    }
}

impl fmt::Display for Propagation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Propagation> for kube::api::PropagationPolicy {
    fn from(value: Propagation) -> Self {
        match value {
            Propagation::Orphan => Self::Orphan,
            Propagation::Background => Self::Background,
            Propagation::Foreground => Self::Foreground,
        }
    }
}

/// Settings for one remediation pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemediationConfig {
    /// Grace period sent with every delete (default 30)
    pub grace_period_seconds: u32,
    /// Propagation policy sent with every delete (default Background)
    pub propagation: Propagation,
    /// Message signatures marking an event as a candidate
    pub signatures: Vec<String>,
    /// Role name for telemetry traces
    pub role_name: String,
}

impl RemediationConfig {
    /// Build the event filter for the configured signatures.
    #[must_use]
    pub fn event_filter(&self) -> EventFilter {
        EventFilter::from_signatures(self.signatures.iter().cloned())
    }
}

impl Default for RemediationConfig {
    fn default() -> Self {
        Self {
            grace_period_seconds: DEFAULT_GRACE_PERIOD_SECONDS,
            propagation: Propagation::Background,
            signatures: vec![CLIENT_TIMEOUT_SIGNATURE.to_string()],
            role_name: ROLE_NAME.to_string(),
        }
    }
}
