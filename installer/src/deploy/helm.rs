use std::path::{Path, PathBuf};
use std::process::Stdio;

use anyhow::{Result, bail};
use tokio::process::Command;
use tracing::debug;

/// Drives the helm binary as a subprocess. Install and upgrade honor the
/// dry-run flag by passing server-side dry-run through to helm.
pub struct Helm {
    kubeconfig: Option<PathBuf>,
    dry_run: bool,
}

impl Helm {
    pub fn new(kubeconfig: Option<PathBuf>, dry_run: bool) -> Self {
        Self {
            kubeconfig,
            dry_run,
        }
    }

    async fn run(&self, args: &[&str]) -> Result<std::process::Output> {
        debug!(?args, "helm");
        let mut command = Command::new("helm");
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(kubeconfig) = &self.kubeconfig {
            command.env("KUBECONFIG", kubeconfig);
        }
        Ok(command.spawn()?.wait_with_output().await?)
    }

    async fn run_checked(&self, args: &[&str]) -> Result<String> {
        let output = self.run(args).await?;
        if !output.status.success() {
            bail!(
                "helm {} exited with {}: {}",
                args.first().copied().unwrap_or_default(),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// Consults the release history to decide between install and upgrade.
    pub async fn has_release(&self, release: &str, namespace: &str) -> Result<bool> {
        let output = self
            .run(&[
                "history", release, "--namespace", namespace, "--max", "1", "--output", "json",
            ])
            .await?;
        if output.status.success() {
            return Ok(true);
        }
        let stderr = String::from_utf8_lossy(&output.stderr);
        if stderr.contains("not found") {
            return Ok(false);
        }
        bail!("helm history failed: {}", stderr.trim());
    }

    pub async fn install(
        &self,
        chart_dir: &Path,
        release: &str,
        namespace: &str,
        values_file: &Path,
    ) -> Result<()> {
        let chart = chart_dir.to_string_lossy();
        let values = values_file.to_string_lossy();
        let mut args = vec![
            "install",
            release,
            chart.as_ref(),
            "--namespace",
            namespace,
            "--values",
            values.as_ref(),
        ];
        if self.dry_run {
            args.push("--dry-run=server");
        }
        self.run_checked(&args).await?;
        Ok(())
    }

    pub async fn upgrade(
        &self,
        chart_dir: &Path,
        release: &str,
        namespace: &str,
        values_file: &Path,
    ) -> Result<()> {
        let chart = chart_dir.to_string_lossy();
        let values = values_file.to_string_lossy();
        let mut args = vec![
            "upgrade",
            release,
            chart.as_ref(),
            "--namespace",
            namespace,
            "--values",
            values.as_ref(),
        ];
        if self.dry_run {
            args.push("--dry-run=server");
        }
        self.run_checked(&args).await?;
        Ok(())
    }

    /// Runs the chart's release tests once; retry policy belongs to the
    /// orchestrator.
    pub async fn test(&self, release: &str, namespace: &str) -> Result<()> {
        self.run_checked(&["test", release, "--namespace", namespace])
            .await?;
        Ok(())
    }

    /// The manifest of everything the release created, used to enqueue
    /// readiness checks.
    pub async fn get_manifest(&self, release: &str, namespace: &str) -> Result<String> {
        self.run_checked(&["get", "manifest", release, "--namespace", namespace])
            .await
    }

    /// Renders the chart without touching the cluster state.
    pub async fn template(
        &self,
        chart_dir: &Path,
        release: &str,
        namespace: &str,
        values_file: &Path,
    ) -> Result<String> {
        let chart = chart_dir.to_string_lossy();
        let values = values_file.to_string_lossy();
        self.run_checked(&[
            "template",
            release,
            chart.as_ref(),
            "--namespace",
            namespace,
            "--values",
            values.as_ref(),
        ])
        .await
    }
}
