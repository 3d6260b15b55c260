//! Remediation engine: one sequential scan-and-fix pass over a namespace.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::cluster::{ClusterClient, EventSelector};
use crate::config::RemediationConfig;
use crate::error::RemediationError;
use crate::event::ClusterEvent;
use crate::filter::EventFilter;
use crate::telemetry::{Severity, Telemetry};
use crate::terminator::{DeletionOutcome, PodTerminator};

/// Final stage reached by a candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CandidateStage {
    /// Pod was deleted
    Terminated,
    /// Pod lookup failed; no delete was issued
    ResolveFailed { error: String },
    /// Delete was issued and failed
    DeletionFailed { error: String },
}

impl From<DeletionOutcome> for CandidateStage {
    fn from(outcome: DeletionOutcome) -> Self {
        match outcome {
            DeletionOutcome::Terminated => Self::Terminated,
            DeletionOutcome::Failed { error } => Self::DeletionFailed { error },
        }
    }
}

/// What happened to one matched event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateOutcome {
    /// Position of the event in the listed events
    pub index: usize,
    /// Pod named by the event
    pub pod: String,
    pub stage: CandidateStage,
}

/// Summary of a completed pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub namespace: String,
    /// Events returned by the query, matched or not
    pub events_listed: usize,
    /// One entry per candidate, in event order
    pub outcomes: Vec<CandidateOutcome>,
}

impl RunReport {
    /// Number of candidates processed.
    pub fn candidates(&self) -> usize {
        self.outcomes.len()
    }

    pub fn terminated(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.stage == CandidateStage::Terminated)
            .count()
    }

    pub fn failed(&self) -> usize {
        self.candidates() - self.terminated()
    }
}

/// Drives a remediation pass.
///
/// Events are handled strictly one after another. A failure on one
/// candidate is recorded and the pass moves on; only the initial event
/// query can fail the run.
pub struct RemediationEngine<C> {
    cluster: Arc<C>,
    selector: EventSelector,
    filter: EventFilter,
    terminator: PodTerminator<C>,
    telemetry: Telemetry,
}

impl<C: ClusterClient> RemediationEngine<C> {
    pub fn new(cluster: Arc<C>, config: &RemediationConfig, telemetry: Telemetry) -> Self {
        Self {
            terminator: PodTerminator::new(Arc::clone(&cluster), config),
            cluster,
            selector: EventSelector::unhealthy_pods(),
            filter: config.event_filter(),
            telemetry,
        }
    }

    /// Replace the event filter.
    #[must_use]
    pub fn with_filter(mut self, filter: EventFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Scan `namespace` once and delete every matching pod.
    pub async fn run(&self, namespace: &str) -> Result<RunReport, RemediationError> {
        info!(namespace = %namespace, "Checking unhealthy pods");

        let events = self
            .cluster
            .list_events(namespace, &self.selector)
            .await
            .map_err(|source| RemediationError::ListEvents {
                namespace: namespace.to_string(),
                source,
            })?;

        info!(
            namespace = %namespace,
            count = events.len(),
            "Processing unhealthy pod events"
        );

        let mut report = RunReport {
            namespace: namespace.to_string(),
            events_listed: events.len(),
            outcomes: Vec::new(),
        };

        for (index, event) in events.iter().enumerate() {
            let Some(rule) = self.filter.matching_rule(event) else {
                continue;
            };
            debug!(index, pod = %event.involved_object_name, rule, "Event matched");

            let stage = self.remediate(index, event, namespace).await;
            report.outcomes.push(CandidateOutcome {
                index,
                pod: event.involved_object_name.clone(),
                stage,
            });
        }

        info!(
            namespace = %namespace,
            candidates = report.candidates(),
            terminated = report.terminated(),
            failed = report.failed(),
            "All processed"
        );
        Ok(report)
    }

    async fn remediate(&self, index: usize, event: &ClusterEvent, namespace: &str) -> CandidateStage {
        let name = &event.involved_object_name;

        info!(index, pod = %name, "Will process unhealthy pod");
        self.telemetry
            .trace(
                &format!("will process unhealthy pod. name is [{name}]"),
                Severity::Information,
            )
            .await;

        let pod = match self.cluster.get_pod(namespace, name).await {
            Ok(pod) => pod,
            Err(e) => {
                if e.is_not_found() {
                    warn!(index, pod = %name, error = %e, "Pod already gone, nothing to delete");
                } else {
                    error!(index, pod = %name, error = %e, "Failed to get pod");
                }
                return CandidateStage::ResolveFailed {
                    error: e.to_string(),
                };
            }
        };

        let pod_name = pod.metadata.name.as_deref().unwrap_or(name);
        let outcome = self.terminator.terminate(index, pod_name, namespace).await;

        info!(index, pod = %name, "Processed unhealthy pod");
        self.telemetry
            .trace(
                &format!("processed unhealthy pod. name is [{name}]"),
                Severity::Information,
            )
            .await;

        outcome.into()
    }
}
