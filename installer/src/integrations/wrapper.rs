use std::collections::BTreeMap;

use anyhow::Result;
use flotilla_chart_fs::ChartCollection;
use flotilla_config::ConfigMapManager;
use tracing::info;

use crate::context::AppContext;
use crate::k8s::IntegrationSecrets;

/// Secret lifecycle of a single integration, plus the configuration
/// side-effect applied after one is stored.
pub struct IntegrationWrapper<'a> {
    ctx: &'a AppContext,
    secrets: IntegrationSecrets,
    client: kube::Client,
}

impl<'a> IntegrationWrapper<'a> {
    pub fn new(ctx: &'a AppContext, client: kube::Client) -> Self {
        Self {
            secrets: IntegrationSecrets::new(client.clone(), ctx),
            client,
            ctx,
        }
    }

    pub async fn exists(&self, name: &str) -> Result<bool> {
        self.secrets.exists(name).await
    }

    pub async fn apply(
        &self,
        name: &str,
        data: BTreeMap<String, String>,
        force: bool,
    ) -> Result<()> {
        self.secrets.apply(name, data, force).await
    }

    /// A cluster-configured integration replaces the product that would
    /// have provided it: when the secret now exists and a chart declares
    /// this integration as provided for an enabled product, the product is
    /// disabled in the stored configuration. Only the active integration
    /// is inspected.
    pub async fn disable_providing_product(
        &self,
        name: &str,
        collection: &ChartCollection,
    ) -> Result<()> {
        if !self.secrets.exists(name).await? {
            return Ok(());
        }
        let Some(product_name) = collection.product_providing_integration(name) else {
            return Ok(());
        };

        let manager = ConfigMapManager::new(
            self.client.clone(),
            &self.ctx.namespace,
            &self.ctx.name,
            &self.ctx.config_label(),
        );
        let mut config = match manager.get_config(&self.ctx.namespace).await {
            Ok(config) => config,
            Err(flotilla_config::ConfigError::ConfigMapNotFound) => return Ok(()),
            Err(err) => return Err(err.into()),
        };

        let Ok(product) = config.product_mut(product_name) else {
            return Ok(());
        };
        if !product.enabled {
            return Ok(());
        }
        info!(
            product = product_name,
            integration = name,
            "disabling product now that the integration is configured"
        );
        product.enabled = false;
        manager.update(&config).await?;
        Ok(())
    }
}
