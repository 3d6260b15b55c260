//! Cluster event view consumed by the remediation pass.

use k8s_openapi::api::core::v1::Event;

/// Event reason emitted when a pod probe fails.
pub const UNHEALTHY_REASON: &str = "Unhealthy";

/// Involved object kind for pod events.
pub const POD_KIND: &str = "Pod";

/// The fields of a Kubernetes event the remediation pass looks at.
///
/// Missing fields on the source object are read as empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClusterEvent {
    /// Short reason tag, e.g. "Unhealthy"
    pub reason: String,
    /// Kind of the object the event is about, e.g. "Pod"
    pub involved_object_kind: String,
    /// Name of the object the event is about
    pub involved_object_name: String,
    /// Free-text diagnostic message
    pub message: String,
}

impl ClusterEvent {
    /// Build an `Unhealthy` event for the named pod.
    #[must_use]
    pub fn unhealthy_pod(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            reason: UNHEALTHY_REASON.to_string(),
            involved_object_kind: POD_KIND.to_string(),
            involved_object_name: name.into(),
            message: message.into(),
        }
    }
}

impl From<&Event> for ClusterEvent {
    fn from(event: &Event) -> Self {
        Self {
            reason: event.reason.clone().unwrap_or_default(),
            involved_object_kind: event.involved_object.kind.clone().unwrap_or_default(),
            involved_object_name: event.involved_object.name.clone().unwrap_or_default(),
            message: event.message.clone().unwrap_or_default(),
        }
    }
}
