use std::path::Path;

use anyhow::Result;
use kube::config::{KubeConfigOptions, Kubeconfig};

/// Builds a Kubernetes client from an explicit kubeconfig path, or infers
/// one from the environment: `KUBECONFIG`, `~/.kube/config`, then
/// in-cluster credentials. The delegated deployment Job sets
/// `KUBECONFIG=""` so it always lands on in-cluster credentials.
pub async fn kube_client(kube_config: Option<&Path>) -> Result<kube::Client> {
    let config = match kube_config {
        Some(path) if !path.as_os_str().is_empty() => {
            let kubeconfig = Kubeconfig::read_from(path)?;
            kube::Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default()).await?
        }
        _ => kube::Config::infer().await?,
    };
    Ok(kube::Client::try_from(config)?)
}
