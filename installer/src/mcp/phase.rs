use anyhow::Result;
use flotilla_config::ConfigError;
use flotilla_resolver::IntegrationError;

use crate::app::App;
use crate::k8s::{DeployJob, JobState};

/// The observable state of the installer workflow, derived from
/// cluster-observable facts only: ConfigMap presence, integration Secrets
/// and the deployment Job status. Deriving it twice without intervening
/// mutation yields the same phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum DeploymentPhase {
    AwaitingConfiguration,
    AwaitingIntegrations,
    ReadyToDeploy,
    Deploying,
    Completed,
}

impl DeploymentPhase {
    pub fn suggested_action(&self) -> &'static str {
        match self {
            Self::AwaitingConfiguration => {
                "Initialize the configuration with the config_init tool."
            }
            Self::AwaitingIntegrations => {
                "Configure the missing integrations; integration_scaffold \
                 produces the CLI commands."
            }
            Self::ReadyToDeploy => "Run the deploy tool to start the deployment job.",
            Self::Deploying => "Wait for the deployment job; check status again shortly.",
            Self::Completed => "Deployment finished; inspect product notes with the notes tool.",
        }
    }
}

pub async fn derive_phase(app: &App, client: &kube::Client) -> Result<DeploymentPhase> {
    let config = match app
        .config_manager(client)
        .get_config(&app.ctx.namespace)
        .await
    {
        Ok(config) => config,
        Err(ConfigError::ConfigMapNotFound) => return Ok(DeploymentPhase::AwaitingConfiguration),
        Err(err) => return Err(err.into()),
    };

    let collection = app.collection()?;
    let topology = app.resolve_topology(&config, &collection)?;
    let mut integrations = app.integrations_state(client).await?;
    match integrations.inspect(&topology, &app.ctx.annotation_prefix) {
        Ok(()) => (),
        Err(IntegrationError::PrerequisiteIntegration { .. }) => {
            return Ok(DeploymentPhase::AwaitingIntegrations);
        }
        // Unknown names and malformed expressions are chart bugs, not a
        // workflow phase.
        Err(err) => return Err(err.into()),
    }

    let state = DeployJob::new(client.clone(), &app.ctx).state().await?;
    Ok(match state {
        JobState::NotFound | JobState::Failed => DeploymentPhase::ReadyToDeploy,
        JobState::Deploying => DeploymentPhase::Deploying,
        JobState::Done => DeploymentPhase::Completed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phases_render_in_screaming_snake_case() {
        assert_eq!(
            DeploymentPhase::AwaitingConfiguration.to_string(),
            "AWAITING_CONFIGURATION"
        );
        assert_eq!(
            DeploymentPhase::ReadyToDeploy.to_string(),
            "READY_TO_DEPLOY"
        );
        assert_eq!(DeploymentPhase::Completed.to_string(), "COMPLETED");
    }
}
