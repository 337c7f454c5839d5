use std::collections::BTreeMap;
use std::process::Stdio;

use anyhow::{Context, Result};
use flotilla_chart_fs::Chart;
use tracing::info;

use crate::errors::InstallerError;

pub const ENV_PREFIX: &str = "INSTALLER";

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum HookPhase {
    #[strum(serialize = "pre-deploy")]
    PreDeploy,
    #[strum(serialize = "post-deploy")]
    PostDeploy,
}

/// Runs the chart's hook script for the given phase, when the chart embeds
/// one. The script is extracted to a temporary file with mode 0755 and
/// executed with the parent environment plus the flattened rendered
/// values. stdout streams through; stderr is captured for the error and
/// echoed afterwards. A non-zero exit aborts the chart's pipeline.
pub async fn run_hook(
    chart: &Chart,
    phase: HookPhase,
    values: &serde_yaml::Value,
) -> Result<()> {
    let script = match phase {
        HookPhase::PreDeploy => chart.pre_deploy_hook(),
        HookPhase::PostDeploy => chart.post_deploy_hook(),
    };
    let Some(script) = script else {
        return Ok(());
    };

    let dir = tempfile::tempdir().context("creating hook scratch directory")?;
    let path = dir.path().join(format!("{phase}.sh"));
    std::fs::write(&path, script)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))?;
    }

    info!(chart = chart.name(), %phase, "running hook");
    let child = tokio::process::Command::new(&path)
        .envs(flatten_values(values))
        .stdout(Stdio::inherit())
        .stderr(Stdio::piped())
        .spawn()
        .with_context(|| format!("spawning {phase} hook of {}", chart.name()))?;
    let output = child.wait_with_output().await?;
    let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
    if !stderr.is_empty() {
        eprint!("{stderr}");
    }

    if !output.status.success() {
        return Err(InstallerError::HookScriptFailed {
            chart: chart.name().to_owned(),
            phase,
            exit_code: output.status.code().unwrap_or(-1),
            stderr,
        }
        .into());
    }
    Ok(())
}

/// Flattens the rendered values into environment variables. Each leaf path
/// becomes an uppercased, double-underscore-separated key prefixed with
/// `INSTALLER__`. Scalars stringify plainly; sequences serialize as
/// compact JSON, which is stable because rendering is deterministic.
pub fn flatten_values(values: &serde_yaml::Value) -> BTreeMap<String, String> {
    let mut env = BTreeMap::new();
    if let serde_yaml::Value::Mapping(mapping) = values {
        flatten_mapping(mapping, ENV_PREFIX, &mut env);
    }
    env
}

fn flatten_mapping(
    mapping: &serde_yaml::Mapping,
    prefix: &str,
    env: &mut BTreeMap<String, String>,
) {
    for (key, value) in mapping {
        let Some(key) = scalar_to_string(key) else {
            continue;
        };
        let key = format!("{prefix}__{}", env_component(&key));
        match value {
            serde_yaml::Value::Mapping(nested) => flatten_mapping(nested, &key, env),
            serde_yaml::Value::Sequence(sequence) => {
                if let Ok(json) = serde_json::to_string(sequence) {
                    env.insert(key, json);
                }
            }
            scalar => {
                if let Some(value) = scalar_to_string(scalar) {
                    env.insert(key, value);
                }
            }
        }
    }
}

fn scalar_to_string(value: &serde_yaml::Value) -> Option<String> {
    match value {
        serde_yaml::Value::String(s) => Some(s.clone()),
        serde_yaml::Value::Bool(b) => Some(b.to_string()),
        serde_yaml::Value::Number(n) => Some(n.to_string()),
        serde_yaml::Value::Null => Some(String::new()),
        _ => None,
    }
}

fn env_component(key: &str) -> String {
    key.chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() {
                ch.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leaves_become_prefixed_uppercase_keys() {
        let values: serde_yaml::Value = serde_yaml::from_str(
            "auth:\n  provider: github\n  retries: 3\n  strict: true\n",
        )
        .unwrap();
        let env = flatten_values(&values);
        assert_eq!(env["INSTALLER__AUTH__PROVIDER"], "github");
        assert_eq!(env["INSTALLER__AUTH__RETRIES"], "3");
        assert_eq!(env["INSTALLER__AUTH__STRICT"], "true");
    }

    #[test]
    fn sequences_serialize_as_json() {
        let values: serde_yaml::Value =
            serde_yaml::from_str("mirrors:\n- quay.io\n- ghcr.io\n").unwrap();
        let env = flatten_values(&values);
        assert_eq!(env["INSTALLER__MIRRORS"], r#"["quay.io","ghcr.io"]"#);
    }

    #[test]
    fn key_characters_are_sanitized() {
        let values: serde_yaml::Value =
            serde_yaml::from_str("catalog-url: https://example.com\n").unwrap();
        let env = flatten_values(&values);
        assert_eq!(env["INSTALLER__CATALOG_URL"], "https://example.com");
    }

    #[test]
    fn flattening_is_stable() {
        let values: serde_yaml::Value =
            serde_yaml::from_str("b: 1\na:\n  c: [2, 1]\n  d: x\n").unwrap();
        assert_eq!(flatten_values(&values), flatten_values(&values));
    }
}
