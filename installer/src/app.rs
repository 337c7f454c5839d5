use std::sync::Arc;

use anyhow::{Context, Result};
use flotilla_chart_fs::{ChartCollection, ChartFs, EmbeddedTarball};
use flotilla_config::{Config, ConfigError, ConfigMapManager};
use flotilla_resolver::{Integrations, Resolver, Topology};

use crate::cli::GlobalArgs;
use crate::context::AppContext;
use crate::integrations::Manager;
use crate::k8s::{self, IntegrationSecrets};

pub const DEFAULT_CONFIG: &str = "config.yaml";

/// Everything a subcommand needs: the application context, the overlay
/// filesystem over the embedded tarball and the working directory, the
/// integration registry, and the global CLI flags.
pub struct App {
    pub ctx: AppContext,
    pub fs: Arc<ChartFs>,
    pub manager: Manager,
    pub globals: GlobalArgs,
}

impl App {
    pub fn new(ctx: AppContext, tarball: &'static [u8], globals: GlobalArgs) -> Result<Self> {
        let cwd = std::env::current_dir().context("reading current directory")?;
        let fs = ChartFs::new(EmbeddedTarball::from_static(tarball), cwd);
        Ok(Self {
            ctx,
            fs: Arc::new(fs),
            manager: Manager::standard(),
            globals,
        })
    }

    pub async fn kube_client(&self) -> Result<kube::Client> {
        k8s::kube_client(self.globals.kube_config.as_deref()).await
    }

    pub fn config_manager(&self, client: &kube::Client) -> ConfigMapManager {
        ConfigMapManager::new(
            client.clone(),
            &self.ctx.namespace,
            &self.ctx.name,
            &self.ctx.config_label(),
        )
    }

    pub fn collection(&self) -> Result<ChartCollection> {
        Ok(ChartCollection::load(&self.fs, &self.ctx.annotation_prefix)?)
    }

    /// The default configuration payload embedded in the installer
    /// tarball.
    pub fn default_config_payload(&self) -> Result<String> {
        Ok(self.fs.read_to_string(DEFAULT_CONFIG)?)
    }

    pub fn default_config(&self) -> Result<Config> {
        Ok(Config::from_yaml(
            &self.default_config_payload()?,
            &self.ctx.namespace,
        )?)
    }

    /// The stored configuration, falling back to the embedded default when
    /// none exists yet.
    pub async fn load_config(&self, client: &kube::Client) -> Result<Config> {
        match self
            .config_manager(client)
            .get_config(&self.ctx.namespace)
            .await
        {
            Ok(config) => Ok(config),
            Err(ConfigError::ConfigMapNotFound) => self.default_config(),
            Err(err) => Err(err.into()),
        }
    }

    pub fn resolve_topology(
        &self,
        config: &Config,
        collection: &ChartCollection,
    ) -> Result<Topology> {
        Ok(Resolver::new(config, collection, &self.ctx.namespace).resolve()?)
    }

    /// Integration state seeded from the registry and the Secrets found
    /// in-cluster.
    pub async fn integrations_state(&self, client: &kube::Client) -> Result<Integrations> {
        let known = self.manager.names();
        let secrets = IntegrationSecrets::new(client.clone(), &self.ctx);
        let cluster_configured = secrets.configured(&known).await?;
        Ok(Integrations::new(known, cluster_configured))
    }
}
