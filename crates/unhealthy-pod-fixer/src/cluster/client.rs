//! kube-backed [`ClusterClient`].

use std::path::Path;

use async_trait::async_trait;
use k8s_openapi::api::core::v1::{Event, Pod};
use kube::api::{Api, ListParams};
use kube::Client;
use tracing::debug;

use super::{credentials, ClusterClient, DeletionRequest, EventSelector};
use crate::error::{ClusterError, CredentialsError};
use crate::event::{ClusterEvent, POD_KIND};

/// Cluster client talking to the Kubernetes API server.
#[derive(Clone)]
pub struct KubeCluster {
    client: Client,
}

impl KubeCluster {
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Resolve credentials and connect.
    ///
    /// See [`credentials::connect`] for the resolution order.
    pub async fn connect(kubeconfig: Option<&Path>) -> Result<Self, CredentialsError> {
        let client = credentials::connect(kubeconfig).await?;
        Ok(Self::new(client))
    }

    fn pods(&self, namespace: &str) -> Api<Pod> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

#[async_trait]
impl ClusterClient for KubeCluster {
    async fn list_events(
        &self,
        namespace: &str,
        selector: &EventSelector,
    ) -> Result<Vec<ClusterEvent>, ClusterError> {
        let events: Api<Event> = Api::namespaced(self.client.clone(), namespace);
        let params = ListParams::default().fields(&selector.field_selector());

        let list = events.list(&params).await?;
        debug!(namespace = %namespace, count = list.items.len(), "Listed events");

        Ok(list.items.iter().map(ClusterEvent::from).collect())
    }

    async fn get_pod(&self, namespace: &str, name: &str) -> Result<Pod, ClusterError> {
        self.pods(namespace)
            .get(name)
            .await
            .map_err(|e| ClusterError::from_kube(e, POD_KIND, namespace, name))
    }

    async fn delete_pod(&self, request: &DeletionRequest) -> Result<(), ClusterError> {
        self.pods(&request.namespace)
            .delete(&request.name, &request.delete_params())
            .await
            .map(|_| ())
            .map_err(|e| ClusterError::from_kube(e, POD_KIND, &request.namespace, &request.name))
    }
}
