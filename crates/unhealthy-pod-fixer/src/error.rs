//! Error types for the remediation pass.

use std::path::PathBuf;

use thiserror::Error;

/// Errors returned by a [`ClusterClient`](crate::ClusterClient) call.
#[derive(Debug, Error)]
pub enum ClusterError {
    /// Kubernetes API error
    #[error("Kubernetes API error: {0}")]
    Kube(#[from] kube::Error),

    /// The requested object does not exist
    #[error("{kind} {namespace}/{name} not found")]
    NotFound {
        kind: String,
        namespace: String,
        name: String,
    },

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ClusterError {
    /// Translate a kube error for a named object, mapping HTTP 404 to [`ClusterError::NotFound`].
    pub fn from_kube(err: kube::Error, kind: &str, namespace: &str, name: &str) -> Self {
        match err {
            kube::Error::Api(response) if response.code == 404 => Self::NotFound {
                kind: kind.to_string(),
                namespace: namespace.to_string(),
                name: name.to_string(),
            },
            other => Self::Kube(other),
        }
    }

    /// Whether the target object was already gone.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Errors resolving cluster credentials or building the client.
#[derive(Debug, Error)]
pub enum CredentialsError {
    /// Not running in a cluster and no home directory to find a kubeconfig in
    #[error("in-cluster configuration unavailable ({in_cluster}) and no home directory for a kubeconfig")]
    NoKubeconfig { in_cluster: String },

    /// Kubeconfig file could not be loaded
    #[error("in-cluster configuration unavailable ({in_cluster}); failed to load kubeconfig {}: {source}", .path.display())]
    Kubeconfig {
        path: PathBuf,
        in_cluster: String,
        #[source]
        source: kube::config::KubeconfigError,
    },

    /// Client construction failed
    #[error("Failed to create Kubernetes client: {0}")]
    Client(#[from] kube::Error),
}

/// Errors delivering a trace to a telemetry sink.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Ingestion endpoint answered with a non-success status
    #[error("Telemetry endpoint returned {status}: {body}")]
    Rejected { status: u16, body: String },
}

/// Fatal errors that abort a remediation pass before any candidate is processed.
#[derive(Debug, Error)]
pub enum RemediationError {
    /// The initial event query failed
    #[error("failed to get events in namespace {namespace}: {source}")]
    ListEvents {
        namespace: String,
        #[source]
        source: ClusterError,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_display() {
        let err = ClusterError::NotFound {
            kind: "Pod".to_string(),
            namespace: "default".to_string(),
            name: "api-7f".to_string(),
        };
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "Pod default/api-7f not found");
    }

    #[test]
    fn test_list_events_error_names_namespace() {
        let err = RemediationError::ListEvents {
            namespace: "payments".to_string(),
            source: ClusterError::Other("connection refused".to_string()),
        };
        assert_eq!(
            err.to_string(),
            "failed to get events in namespace payments: connection refused"
        );
    }
}
