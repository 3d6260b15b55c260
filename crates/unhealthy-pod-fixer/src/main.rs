//! fix-unhealthy-pod CLI
//!
//! Scans one namespace for pods whose probes fail with a client-timeout
//! signature and deletes them so their controllers reschedule them. Runs a
//! single pass and exits; schedule it (e.g. as a CronJob) for retries.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use unhealthy_pod_fixer::cluster::KubeCluster;
use unhealthy_pod_fixer::config::{DEFAULT_GRACE_PERIOD_SECONDS, DEFAULT_NAMESPACE};
use unhealthy_pod_fixer::{Propagation, RemediationConfig, RemediationEngine, Telemetry};

/// Delete pods whose health checks time out awaiting response headers
#[derive(Parser, Debug)]
#[command(name = "fix-unhealthy-pod")]
#[command(about = "Delete pods whose health checks time out awaiting response headers")]
#[command(version)]
struct Cli {
    /// Namespace to scan
    #[arg(
        long = "ns",
        visible_alias = "namespace",
        env = "FIX_UNHEALTHY_NAMESPACE",
        default_value = DEFAULT_NAMESPACE
    )]
    namespace: String,

    /// Grace period for deleted pods, in seconds
    #[arg(
        long,
        env = "FIX_UNHEALTHY_GRACE_PERIOD_SECONDS",
        default_value_t = DEFAULT_GRACE_PERIOD_SECONDS
    )]
    grace_period_seconds: u32,

    /// Propagation policy for deleted pods
    #[arg(
        long,
        env = "FIX_UNHEALTHY_PROPAGATION_POLICY",
        value_enum,
        default_value_t = Propagation::Background
    )]
    propagation_policy: Propagation,

    /// Extra event message substring marking a pod for deletion (repeatable).
    /// The client-timeout signature always applies.
    #[arg(long = "signature")]
    signatures: Vec<String>,

    /// Kubeconfig used when not running in a cluster.
    /// Without it, KUBECONFIG (merged path list) or ~/.kube/config is used
    #[arg(long)]
    kubeconfig: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn remediation_config(&self) -> RemediationConfig {
        let mut config = RemediationConfig {
            grace_period_seconds: self.grace_period_seconds,
            propagation: self.propagation_policy,
            ..Default::default()
        };
        for signature in &self.signatures {
            if !config.signatures.contains(signature) {
                config.signatures.push(signature.clone());
            }
        }
        config
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("info,unhealthy_pod_fixer=debug,fix_unhealthy_pod=debug")
        } else {
            EnvFilter::new("info")
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let config = cli.remediation_config();

    let cluster = KubeCluster::connect(cli.kubeconfig.as_deref())
        .await
        .context("Failed to connect to Kubernetes")?;
    let telemetry = Telemetry::from_env(&config.role_name);

    let engine = RemediationEngine::new(Arc::new(cluster), &config, telemetry);
    let report = engine
        .run(&cli.namespace)
        .await
        .context("Remediation pass aborted")?;

    info!(
        namespace = %report.namespace,
        events = report.events_listed,
        candidates = report.candidates(),
        terminated = report.terminated(),
        failed = report.failed(),
        "Bye"
    );
    Ok(())
}
