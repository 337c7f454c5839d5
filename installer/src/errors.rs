use crate::deploy::HookPhase;

#[derive(Debug, thiserror::Error)]
pub enum InstallerError {
    #[error(
        "The {phase} hook of chart {chart} exited with status {exit_code}: {stderr}"
    )]
    HookScriptFailed {
        chart: String,
        phase: HookPhase,
        exit_code: i32,
        stderr: String,
    },

    #[error("helm {action} failed for chart {chart}: {cause}")]
    HelmActionFailed {
        chart: String,
        action: String,
        cause: String,
    },

    #[error("Chart tests failed for {chart} after {attempts} attempts")]
    ReleaseTestFailed { chart: String, attempts: u32 },

    #[error("Timed out waiting for resources to become ready: {}", resources.join(", "))]
    ReadinessTimeout { resources: Vec<String> },

    #[error("Deployment job {0} already exists, pass force to replace it")]
    JobAlreadyExists(String),

    #[error("No container image configured for the deployment job")]
    ImageNotConfigured,

    #[error("Integration secret {0} already exists, pass --force to overwrite it")]
    SecretAlreadyExists(String),
}
