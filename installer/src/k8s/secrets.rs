use std::collections::BTreeMap;

use anyhow::Result;
use k8s_openapi::ByteString;
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::api::{Api, PostParams};
use tracing::debug;

use crate::context::AppContext;
use crate::errors::InstallerError;

/// Lifecycle of integration Secrets in the installer namespace. Secrets are
/// named `{appName}-{integration}-integration` and carry both sensitive and
/// configuration fields as an opaque key-to-bytes mapping.
pub struct IntegrationSecrets {
    api: Api<Secret>,
    ctx: AppContext,
}

impl IntegrationSecrets {
    pub fn new(client: kube::Client, ctx: &AppContext) -> Self {
        Self {
            api: Api::namespaced(client, &ctx.namespace),
            ctx: ctx.clone(),
        }
    }

    pub async fn exists(&self, integration: &str) -> Result<bool> {
        let name = self.ctx.integration_secret_name(integration);
        Ok(self.api.get_opt(&name).await?.is_some())
    }

    /// The subset of `known` integration names whose Secret exists.
    pub async fn configured(&self, known: &[String]) -> Result<Vec<String>> {
        let mut configured = Vec::new();
        for name in known {
            if self.exists(name).await? {
                configured.push(name.clone());
            }
        }
        Ok(configured)
    }

    /// Creates or, with `force`, overwrites the integration Secret.
    pub async fn apply(
        &self,
        integration: &str,
        data: BTreeMap<String, String>,
        force: bool,
    ) -> Result<()> {
        let name = self.ctx.integration_secret_name(integration);
        let data: BTreeMap<String, ByteString> = data
            .into_iter()
            .map(|(key, value)| (key, ByteString(value.into_bytes())))
            .collect();

        match self.api.get_opt(&name).await? {
            None => {
                let secret = Secret {
                    metadata: ObjectMeta {
                        name: Some(name.clone()),
                        namespace: Some(self.ctx.namespace.clone()),
                        ..Default::default()
                    },
                    type_: Some("Opaque".to_owned()),
                    data: Some(data),
                    ..Default::default()
                };
                debug!(secret = %name, "creating integration secret");
                self.api.create(&PostParams::default(), &secret).await?;
            }
            Some(_) if !force => {
                return Err(InstallerError::SecretAlreadyExists(name).into());
            }
            Some(mut existing) => {
                existing.data = Some(data);
                existing.string_data = None;
                debug!(secret = %name, "overwriting integration secret");
                self.api
                    .replace(&name, &PostParams::default(), &existing)
                    .await?;
            }
        }
        Ok(())
    }

    pub async fn delete(&self, integration: &str) -> Result<()> {
        let name = self.ctx.integration_secret_name(integration);
        match self.api.delete(&name, &Default::default()).await {
            Ok(_) => Ok(()),
            Err(err) if super::is_api_error(&err, http::StatusCode::NOT_FOUND) => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}
