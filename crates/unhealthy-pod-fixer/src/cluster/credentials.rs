//! Kubernetes credential resolution.
//!
//! In-cluster service account configuration is tried first. Outside a
//! cluster a kubeconfig is loaded from, in order: an explicit path, the
//! `KUBECONFIG` variable (a path list whose files are merged), or
//! `$HOME/.kube/config`.

use std::path::{Path, PathBuf};

use kube::config::{KubeConfigOptions, Kubeconfig, KubeconfigError};
use kube::{Client, Config};
use tracing::{debug, info};

use crate::error::CredentialsError;

/// Environment variable holding the kubeconfig path list.
const ENV_KUBECONFIG: &str = "KUBECONFIG";

/// Default kubeconfig location under the user's home directory.
pub fn default_kubeconfig_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".kube").join("config"))
}

/// Load the kubeconfig used outside a cluster, with the location it came from.
fn load_kubeconfig(
    explicit: Option<&Path>,
    in_cluster: &str,
) -> Result<(PathBuf, Kubeconfig), CredentialsError> {
    let failed = |path: PathBuf, source: KubeconfigError| CredentialsError::Kubeconfig {
        path,
        in_cluster: in_cluster.to_string(),
        source,
    };

    if let Some(path) = explicit {
        info!(path = %path.display(), "Using kubeconfig file");
        return Kubeconfig::read_from(path)
            .map(|loaded| (path.to_path_buf(), loaded))
            .map_err(|e| failed(path.to_path_buf(), e));
    }

    let from_env = std::env::var_os(ENV_KUBECONFIG).map(PathBuf::from);
    match Kubeconfig::from_env() {
        Ok(Some(loaded)) => {
            let paths = from_env.unwrap_or_default();
            info!(paths = %paths.display(), "Using kubeconfig files from KUBECONFIG");
            return Ok((paths, loaded));
        }
        Ok(None) => {}
        Err(e) => return Err(failed(from_env.unwrap_or_default(), e)),
    }

    let path = default_kubeconfig_path().ok_or_else(|| CredentialsError::NoKubeconfig {
        in_cluster: in_cluster.to_string(),
    })?;
    info!(path = %path.display(), "Using kubeconfig file");
    match Kubeconfig::read_from(&path) {
        Ok(loaded) => Ok((path, loaded)),
        Err(e) => Err(failed(path, e)),
    }
}

/// Resolve a client configuration.
pub async fn resolve_config(kubeconfig: Option<&Path>) -> Result<Config, CredentialsError> {
    let in_cluster = match Config::incluster() {
        Ok(config) => {
            debug!("Using in-cluster configuration");
            return Ok(config);
        }
        Err(e) => e.to_string(),
    };

    let (path, loaded) = load_kubeconfig(kubeconfig, &in_cluster)?;

    Config::from_custom_kubeconfig(loaded, &KubeConfigOptions::default())
        .await
        .map_err(|source| CredentialsError::Kubeconfig {
            path,
            in_cluster,
            source,
        })
}

/// Resolve credentials and build a client.
pub async fn connect(kubeconfig: Option<&Path>) -> Result<Client, CredentialsError> {
    let config = resolve_config(kubeconfig).await?;
    Ok(Client::try_from(config)?)
}
