use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::ConfigMap;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::api::{Api, ListParams, PostParams};
use tracing::debug;

use crate::error::ConfigError;
use crate::model::Config;

/// Data key holding the YAML payload inside the configuration ConfigMap.
pub const CONFIG_DATA_KEY: &str = "config.yaml";

/// Manages the single configuration ConfigMap of an installer. The ConfigMap
/// is named `{appName}-config` on creation, but discovery goes through the
/// label selector so the configuration survives renames.
pub struct ConfigMapManager {
    api: Api<ConfigMap>,
    app_name: String,
    label: String,
}

impl ConfigMapManager {
    pub fn new(client: kube::Client, namespace: &str, app_name: &str, label: &str) -> Self {
        Self {
            api: Api::namespaced(client, namespace),
            app_name: app_name.to_owned(),
            label: label.to_owned(),
        }
    }

    pub fn configmap_name(&self) -> String {
        format!("{}-config", self.app_name)
    }

    fn selector(&self) -> String {
        format!("{}=true", self.label)
    }

    /// Finds the configuration ConfigMap by label. Exactly one match with
    /// the expected data key is valid; everything else is an error the
    /// caller can act on.
    pub async fn find(&self) -> Result<ConfigMap, ConfigError> {
        let params = ListParams::default().labels(&self.selector());
        let mut matches = self.api.list(&params).await?.items;
        match matches.len() {
            0 => Err(ConfigError::ConfigMapNotFound),
            1 => {
                let configmap = matches.remove(0);
                let name = configmap.metadata.name.clone().unwrap_or_default();
                match configmap
                    .data
                    .as_ref()
                    .and_then(|data| data.get(CONFIG_DATA_KEY))
                {
                    Some(_) => Ok(configmap),
                    None => Err(ConfigError::IncompleteConfigMap(name)),
                }
            }
            n => Err(ConfigError::MultipleConfigMapFound(n)),
        }
    }

    pub async fn exists(&self) -> Result<bool, ConfigError> {
        match self.find().await {
            Ok(_) => Ok(true),
            Err(ConfigError::ConfigMapNotFound) => Ok(false),
            Err(err) => Err(err),
        }
    }

    /// Raw YAML payload of the stored configuration.
    pub async fn get_payload(&self) -> Result<String, ConfigError> {
        let configmap = self.find().await?;
        Ok(configmap
            .data
            .and_then(|mut data| data.remove(CONFIG_DATA_KEY))
            .unwrap_or_default())
    }

    pub async fn get_config(&self, installer_namespace: &str) -> Result<Config, ConfigError> {
        Config::from_yaml(&self.get_payload().await?, installer_namespace)
    }

    /// Creates the configuration ConfigMap. Fails when one already exists.
    pub async fn create(&self, config: &Config) -> Result<(), ConfigError> {
        match self.find().await {
            Ok(existing) => {
                return Err(ConfigError::ConfigMapAlreadyExists(
                    existing.metadata.name.unwrap_or_default(),
                ));
            }
            Err(ConfigError::ConfigMapNotFound) => (),
            Err(err) => return Err(err),
        }
        let configmap = self.to_configmap(config, None)?;
        debug!(name = %self.configmap_name(), "creating configuration");
        self.api.create(&PostParams::default(), &configmap).await?;
        Ok(())
    }

    /// Replaces the stored configuration. Fails when none exists. The
    /// resource version of the discovered ConfigMap rides along, so a
    /// concurrent writer surfaces as a conflict instead of a lost update.
    pub async fn update(&self, config: &Config) -> Result<(), ConfigError> {
        let existing = self.find().await?;
        let name = existing.metadata.name.clone().unwrap_or_default();
        let configmap = self.to_configmap(config, Some(existing.metadata))?;
        debug!(name = %name, "updating configuration");
        self.api
            .replace(&name, &PostParams::default(), &configmap)
            .await?;
        Ok(())
    }

    pub async fn delete(&self) -> Result<(), ConfigError> {
        let existing = self.find().await?;
        let name = existing.metadata.name.unwrap_or_default();
        debug!(name = %name, "deleting configuration");
        self.api.delete(&name, &Default::default()).await?;
        Ok(())
    }

    fn to_configmap(
        &self,
        config: &Config,
        existing: Option<ObjectMeta>,
    ) -> Result<ConfigMap, ConfigError> {
        let metadata = match existing {
            Some(metadata) => metadata,
            None => ObjectMeta {
                name: Some(self.configmap_name()),
                labels: Some(BTreeMap::from([(self.label.clone(), "true".to_owned())])),
                ..Default::default()
            },
        };
        Ok(ConfigMap {
            metadata,
            data: Some(BTreeMap::from([(
                CONFIG_DATA_KEY.to_owned(),
                config.to_yaml()?,
            )])),
            ..Default::default()
        })
    }
}
