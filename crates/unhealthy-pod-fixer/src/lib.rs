//! Remediation pass for pods stuck failing health checks on a client timeout.
//!
//! One invocation lists the `Unhealthy` pod events of a namespace, keeps the
//! ones whose message carries a known transient signature, and deletes the
//! affected pods so their controllers schedule fresh replicas.
//!
//! # Usage
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use unhealthy_pod_fixer::cluster::{credentials, KubeCluster};
//! use unhealthy_pod_fixer::{RemediationConfig, RemediationEngine, Telemetry};
//!
//! # async fn run() -> anyhow::Result<()> {
//! let client = credentials::connect(None).await?;
//! let config = RemediationConfig::default();
//! let telemetry = Telemetry::from_env(&config.role_name);
//!
//! let engine = RemediationEngine::new(Arc::new(KubeCluster::new(client)), &config, telemetry);
//! let report = engine.run("default").await?;
//! println!("processed {} candidates", report.candidates());
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! - [`ClusterClient`] is the seam to the Kubernetes API ([`KubeCluster`] in production)
//! - [`EventFilter`] decides which events are remediation candidates
//! - [`PodTerminator`] issues the delete and absorbs its failure
//! - [`RemediationEngine`] drives one sequential pass and returns a [`RunReport`]
//! - [`Telemetry`] forwards trace messages to an optional sink

pub mod cluster;
pub mod config;
pub mod engine;
pub mod error;
pub mod event;
pub mod filter;
pub mod telemetry;
pub mod terminator;

pub use cluster::{ClusterClient, DeletionRequest, EventSelector, KubeCluster};
pub use config::{Propagation, RemediationConfig};
pub use engine::{CandidateOutcome, CandidateStage, RemediationEngine, RunReport};
pub use error::{ClusterError, CredentialsError, RemediationError, TelemetryError};
pub use event::ClusterEvent;
pub use filter::{EventFilter, EventRule, MessageSignature};
pub use telemetry::{Severity, Telemetry, TelemetrySink};
pub use terminator::{DeletionOutcome, PodTerminator};
