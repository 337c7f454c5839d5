mod helm;
mod hooks;
mod sequence;

pub use helm::*;
pub use hooks::*;
pub use sequence::*;

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use flotilla_chart_fs::Chart;
use flotilla_resolver::{Dependency, Topology};
use tracing::{info, warn};

use crate::context::AppContext;
use crate::errors::InstallerError;
use crate::k8s::{ReadinessMonitor, ReadinessRegistry, ensure_namespace};

const TEST_ATTEMPTS: u32 = 3;
const TEST_RETRY_DELAY: Duration = Duration::from_secs(60);

/// Runs the per-chart deployment pipeline in topology order. Chart N+1
/// begins only after chart N's pipeline completes; within one chart the
/// steps are strictly sequential.
pub struct Orchestrator {
    ctx: AppContext,
    client: kube::Client,
    helm: Helm,
    registry: ReadinessRegistry,
    dry_run: bool,
    deadline: tokio::time::Instant,
}

impl Orchestrator {
    pub fn new(
        ctx: &AppContext,
        client: kube::Client,
        kubeconfig: Option<PathBuf>,
        dry_run: bool,
        timeout: Duration,
    ) -> Self {
        Self {
            ctx: ctx.clone(),
            client,
            helm: Helm::new(kubeconfig, dry_run),
            registry: ReadinessRegistry::default(),
            dry_run,
            deadline: tokio::time::Instant::now() + timeout,
        }
    }

    pub fn readiness_registry_mut(&mut self) -> &mut ReadinessRegistry {
        &mut self.registry
    }

    /// Deploys every chart in the topology with the globally-rendered
    /// values.
    #[tracing::instrument(err, skip_all)]
    pub async fn run(&self, topology: &Topology, values: &serde_yaml::Value) -> Result<()> {
        let values_dir = tempfile::tempdir().context("creating values scratch directory")?;
        let values_file = write_values(values_dir.path(), values)?;
        for dependency in topology {
            self.deploy_chart(dependency, values, &values_file).await?;
        }
        Ok(())
    }

    /// Deploys a single chart out of the resolved topology.
    pub async fn run_single(
        &self,
        topology: &Topology,
        chart_name: &str,
        values: &serde_yaml::Value,
    ) -> Result<()> {
        let dependency = topology
            .get(chart_name)
            .with_context(|| format!("chart {chart_name} is not part of the topology"))?;
        let values_dir = tempfile::tempdir().context("creating values scratch directory")?;
        let values_file = write_values(values_dir.path(), values)?;
        self.deploy_chart(dependency, values, &values_file).await
    }

    #[tracing::instrument(err, skip_all, fields(chart = dependency.name(), namespace = dependency.namespace()))]
    async fn deploy_chart(
        &self,
        dependency: &Dependency,
        values: &serde_yaml::Value,
        values_file: &Path,
    ) -> Result<()> {
        let chart = dependency.chart();
        let release = chart.name();
        let namespace = dependency.namespace();
        info!("deploying");

        if !self.dry_run {
            run_hook(chart, HookPhase::PreDeploy, values).await?;
            ensure_namespace(&self.client, namespace).await?;
        }

        let chart_dir = materialize_chart(chart)?;
        let action = if self.helm.has_release(release, namespace).await? {
            "upgrade"
        } else {
            "install"
        };
        let helm_result = match action {
            "upgrade" => {
                self.helm
                    .upgrade(chart_dir.path(), release, namespace, values_file)
                    .await
            }
            _ => {
                self.helm
                    .install(chart_dir.path(), release, namespace, values_file)
                    .await
            }
        };
        helm_result.map_err(|err| InstallerError::HelmActionFailed {
            chart: release.to_owned(),
            action: action.to_owned(),
            cause: err.to_string(),
        })?;

        if self.dry_run {
            info!("dry-run, skipping tests, readiness and hooks");
            return Ok(());
        }

        DeploySequence::new(self.client.clone(), &self.ctx.namespace)
            .record(release)
            .await?;
        self.run_release_tests(release, namespace).await?;
        self.monitor_readiness(release, namespace).await?;
        run_hook(chart, HookPhase::PostDeploy, values).await?;
        info!("deployed");
        Ok(())
    }

    /// Chart tests retry up to 3 times with a 60 second delay; the first
    /// success resolves, exhaustion aborts the pipeline.
    async fn run_release_tests(&self, release: &str, namespace: &str) -> Result<()> {
        for attempt in 1..=TEST_ATTEMPTS {
            match self.helm.test(release, namespace).await {
                Ok(()) => return Ok(()),
                Err(err) if attempt < TEST_ATTEMPTS => {
                    warn!(attempt, ?err, "release tests failed, retrying");
                    tokio::time::sleep(TEST_RETRY_DELAY).await;
                }
                Err(err) => {
                    warn!(?err, "release tests failed");
                    return Err(InstallerError::ReleaseTestFailed {
                        chart: release.to_owned(),
                        attempts: TEST_ATTEMPTS,
                    }
                    .into());
                }
            }
        }
        Ok(())
    }

    async fn monitor_readiness(&self, release: &str, namespace: &str) -> Result<()> {
        let manifest = self.helm.get_manifest(release, namespace).await?;
        let checks = self.registry.checks_for_manifest(&manifest);
        if checks.is_empty() {
            return Ok(());
        }
        info!(checks = checks.len(), "monitoring resource readiness");
        ReadinessMonitor::new(checks)
            .wait(&self.client, self.deadline)
            .await?;
        Ok(())
    }
}

/// Writes the chart's file subtree into a scratch directory so helm can
/// consume it, whether the chart came from the embedded or the local
/// layer.
pub fn materialize_chart(chart: &Chart) -> Result<tempfile::TempDir> {
    let dir = tempfile::tempdir()
        .with_context(|| format!("creating scratch directory for chart {}", chart.name()))?;
    for (rel_path, data) in chart.files() {
        let dest = dir.path().join(rel_path);
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&dest, data)?;
    }
    Ok(dir)
}

fn write_values(dir: &Path, values: &serde_yaml::Value) -> Result<PathBuf> {
    let path = dir.join("values.yaml");
    std::fs::write(&path, serde_yaml::to_string(values)?)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use flotilla_chart_fs::ChartManifest;

    use super::*;

    #[test]
    fn materialized_charts_keep_their_subtree() {
        let manifest = ChartManifest {
            name: "app".to_owned(),
            version: Some("0.1.0".to_owned()),
            description: None,
            annotations: BTreeMap::new(),
        };
        let files = BTreeMap::from([
            ("Chart.yaml".to_owned(), b"name: app\n".to_vec()),
            (
                "templates/cm.yaml".to_owned(),
                b"kind: ConfigMap\n".to_vec(),
            ),
        ]);
        let chart = Chart::new(manifest, "charts/app".to_owned(), files);

        let dir = materialize_chart(&chart).unwrap();
        assert!(dir.path().join("Chart.yaml").is_file());
        assert!(dir.path().join("templates/cm.yaml").is_file());
    }
}
