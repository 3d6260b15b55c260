//! Boundary to the Kubernetes API.
//!
//! The remediation pass only needs three calls: list events, get a pod and
//! delete a pod. [`ClusterClient`] captures them so the engine can run
//! against [`KubeCluster`] in production and an in-memory fake in tests.

pub mod credentials;
mod client;

pub use client::KubeCluster;

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Pod;
use kube::api::DeleteParams;

use crate::config::Propagation;
use crate::error::ClusterError;
use crate::event::{ClusterEvent, POD_KIND, UNHEALTHY_REASON};

/// Server-side event filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventSelector {
    pub reason: String,
    pub involved_object_kind: String,
}

impl EventSelector {
    /// `Unhealthy` events about pods.
    #[must_use]
    pub fn unhealthy_pods() -> Self {
        Self {
            reason: UNHEALTHY_REASON.to_string(),
            involved_object_kind: POD_KIND.to_string(),
        }
    }

    /// Field selector string understood by the API server.
    #[must_use]
    pub fn field_selector(&self) -> String {
        format!(
            "reason={},involvedObject.kind={}",
            self.reason, self.involved_object_kind
        )
    }
}

impl Default for EventSelector {
    fn default() -> Self {
        Self::unhealthy_pods()
    }
}

/// Parameters of one pod deletion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletionRequest {
    pub namespace: String,
    pub name: String,
    pub grace_period_seconds: u32,
    pub propagation: Propagation,
}

impl DeletionRequest {
    /// Delete options sent to the API server.
    #[must_use]
    pub fn delete_params(&self) -> DeleteParams {
        DeleteParams {
            grace_period_seconds: Some(self.grace_period_seconds),
            propagation_policy: Some(self.propagation.into()),
            ..Default::default()
        }
    }
}

/// Cluster operations used by the remediation pass.
///
/// Every call is scoped to a single namespace.
#[async_trait]
pub trait ClusterClient: Send + Sync {
    /// List events in `namespace` matching the selector, in server order.
    async fn list_events(
        &self,
        namespace: &str,
        selector: &EventSelector,
    ) -> Result<Vec<ClusterEvent>, ClusterError>;

    /// Fetch the current pod object.
    async fn get_pod(&self, namespace: &str, name: &str) -> Result<Pod, ClusterError>;

    /// Delete a pod.
    async fn delete_pod(&self, request: &DeletionRequest) -> Result<(), ClusterError>;
}
