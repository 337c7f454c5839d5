use std::collections::BTreeMap;

use anyhow::{Result, bail};
use k8s_openapi::api::core::v1::ConfigMap;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::api::{Api, PostParams};
use tracing::debug;

use crate::k8s::is_api_error;

pub const SEQUENCE_CONFIGMAP: &str = "deploy-sequence";
const SEQUENCE_KEY: &str = "releases";
const MAX_CONFLICT_RETRIES: u32 = 5;

/// Records release names in deployment order. Appends go through a
/// resource-version-conditional replace, retried on conflict, so
/// concurrent writers interleave without losing entries.
pub struct DeploySequence {
    api: Api<ConfigMap>,
}

impl DeploySequence {
    pub fn new(client: kube::Client, namespace: &str) -> Self {
        Self {
            api: Api::namespaced(client, namespace),
        }
    }

    pub async fn record(&self, release: &str) -> Result<()> {
        for attempt in 1..=MAX_CONFLICT_RETRIES {
            let result = match self.api.get_opt(SEQUENCE_CONFIGMAP).await? {
                None => self.create_with(release).await,
                Some(existing) => self.append_to(existing, release).await,
            };
            match result {
                Ok(()) => return Ok(()),
                Err(err) if is_api_error(&err, http::StatusCode::CONFLICT) => {
                    debug!(release, attempt, "conflict recording deploy sequence");
                    continue;
                }
                Err(err) => return Err(err.into()),
            }
        }
        bail!("recording {release} in the deploy sequence kept conflicting");
    }

    pub async fn sequence(&self) -> Result<Vec<String>> {
        let Some(configmap) = self.api.get_opt(SEQUENCE_CONFIGMAP).await? else {
            return Ok(Vec::new());
        };
        Ok(configmap
            .data
            .and_then(|mut data| data.remove(SEQUENCE_KEY))
            .map(|raw| raw.lines().map(str::to_owned).collect())
            .unwrap_or_default())
    }

    async fn create_with(&self, release: &str) -> Result<(), kube::Error> {
        let configmap = ConfigMap {
            metadata: ObjectMeta {
                name: Some(SEQUENCE_CONFIGMAP.to_owned()),
                ..Default::default()
            },
            data: Some(BTreeMap::from([(
                SEQUENCE_KEY.to_owned(),
                release.to_owned(),
            )])),
            ..Default::default()
        };
        self.api
            .create(&PostParams::default(), &configmap)
            .await
            .map(|_| ())
    }

    /// The existing metadata carries the resource version, so the replace
    /// is conditional on nobody else having written in between.
    async fn append_to(&self, mut existing: ConfigMap, release: &str) -> Result<(), kube::Error> {
        let data = existing.data.get_or_insert_with(Default::default);
        let entry = data.entry(SEQUENCE_KEY.to_owned()).or_default();
        if !entry.is_empty() {
            entry.push('\n');
        }
        entry.push_str(release);
        self.api
            .replace(SEQUENCE_CONFIGMAP, &PostParams::default(), &existing)
            .await
            .map(|_| ())
    }
}
