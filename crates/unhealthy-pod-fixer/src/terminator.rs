//! Pod deletion with a fixed grace period and propagation policy.

use std::sync::Arc;

use tracing::{error, info};

use crate::cluster::{ClusterClient, DeletionRequest};
use crate::config::{Propagation, RemediationConfig};

/// Result of one deletion attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeletionOutcome {
    /// The API server accepted the delete
    Terminated,
    /// The delete failed
    Failed { error: String },
}

/// Issues pod deletes and turns their result into log lines.
///
/// A failed delete is reported through the returned [`DeletionOutcome`];
/// it never aborts the caller.
pub struct PodTerminator<C> {
    cluster: Arc<C>,
    grace_period_seconds: u32,
    propagation: Propagation,
}

impl<C: ClusterClient> PodTerminator<C> {
    pub fn new(cluster: Arc<C>, config: &RemediationConfig) -> Self {
        Self {
            cluster,
            grace_period_seconds: config.grace_period_seconds,
            propagation: config.propagation,
        }
    }

    /// Delete request for a pod.
    pub fn deletion_request(&self, pod_name: &str, namespace: &str) -> DeletionRequest {
        DeletionRequest {
            namespace: namespace.to_string(),
            name: pod_name.to_string(),
            grace_period_seconds: self.grace_period_seconds,
            propagation: self.propagation,
        }
    }

    /// Delete the pod. `index` only correlates log lines.
    pub async fn terminate(&self, index: usize, pod_name: &str, namespace: &str) -> DeletionOutcome {
        info!(index, pod = %pod_name, "Pod unhealthy, will be killed");

        let request = self.deletion_request(pod_name, namespace);
        match self.cluster.delete_pod(&request).await {
            Ok(()) => {
                info!(
                    index,
                    pod = %pod_name,
                    grace_period_seconds = request.grace_period_seconds,
                    propagation = %request.propagation,
                    "Pod killed"
                );
                DeletionOutcome::Terminated
            }
            Err(e) => {
                error!(index, pod = %pod_name, error = %e, "Failed to kill pod");
                DeletionOutcome::Failed {
                    error: e.to_string(),
                }
            }
        }
    }
}
