use std::collections::BTreeMap;

use anyhow::Result;
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Namespace;
use kube::api::Api;
use serde::Deserialize;
use tokio_stream::StreamExt;
use tracing::{debug, warn};

use crate::errors::InstallerError;

const POLL_INTERVAL: std::time::Duration = std::time::Duration::from_secs(2);

/// A single resource-readiness probe enqueued by the monitor.
#[async_trait]
pub trait ReadinessCheck: Send + Sync {
    /// Human-readable identifier, e.g. `Namespace/registry`.
    fn describe(&self) -> String;

    async fn ready(&self, client: &kube::Client) -> Result<bool>;
}

/// A fulfilled namespace exists by name.
struct NamespaceExists {
    kind: &'static str,
    name: String,
}

#[async_trait]
impl ReadinessCheck for NamespaceExists {
    fn describe(&self) -> String {
        format!("{}/{}", self.kind, self.name)
    }

    async fn ready(&self, client: &kube::Client) -> Result<bool> {
        let api = Api::<Namespace>::all(client.clone());
        Ok(api.get_opt(&self.name).await?.is_some())
    }
}

type CheckFactory = fn(name: String) -> Box<dyn ReadinessCheck>;

/// Maps resource kinds to readiness checks. New kinds are supported by
/// registering a factory, not by editing the monitor.
pub struct ReadinessRegistry {
    factories: BTreeMap<String, CheckFactory>,
}

impl Default for ReadinessRegistry {
    fn default() -> Self {
        let mut registry = Self {
            factories: BTreeMap::new(),
        };
        registry.register("Namespace", |name| {
            Box::new(NamespaceExists {
                kind: "Namespace",
                name,
            })
        });
        // An accepted OpenShift project request materializes the namespace
        // of the same name.
        registry.register("ProjectRequest", |name| {
            Box::new(NamespaceExists {
                kind: "ProjectRequest",
                name,
            })
        });
        registry
    }
}

impl ReadinessRegistry {
    pub fn register(&mut self, kind: &str, factory: CheckFactory) {
        self.factories.insert(kind.to_owned(), factory);
    }

    /// Builds checks for every recognized resource in the rendered release
    /// manifest. Unrecognized kinds are not monitored.
    pub fn checks_for_manifest(&self, manifest: &str) -> Vec<Box<dyn ReadinessCheck>> {
        let mut checks = Vec::new();
        for document in serde_yaml::Deserializer::from_str(manifest) {
            let Ok(value) = serde_yaml::Value::deserialize(document) else {
                continue;
            };
            let Some(kind) = value.get("kind").and_then(serde_yaml::Value::as_str) else {
                continue;
            };
            let Some(name) = value
                .get("metadata")
                .and_then(|metadata| metadata.get("name"))
                .and_then(serde_yaml::Value::as_str)
            else {
                continue;
            };
            if let Some(factory) = self.factories.get(kind) {
                checks.push(factory(name.to_owned()));
            }
        }
        checks
    }
}

/// Polls all enqueued checks at a fixed interval until every one succeeds
/// or the deadline fires. Checks run concurrently within a tick; a failing
/// probe counts as not ready and is retried on the next tick.
pub struct ReadinessMonitor {
    checks: Vec<Box<dyn ReadinessCheck>>,
}

impl ReadinessMonitor {
    pub fn new(checks: Vec<Box<dyn ReadinessCheck>>) -> Self {
        Self { checks }
    }

    pub async fn wait(
        self,
        client: &kube::Client,
        deadline: tokio::time::Instant,
    ) -> Result<(), InstallerError> {
        let mut pending = self.checks;
        let mut ticks = super::create_interval_stream(POLL_INTERVAL);
        while !pending.is_empty() {
            if tokio::time::Instant::now() >= deadline {
                return Err(InstallerError::ReadinessTimeout {
                    resources: pending.iter().map(|check| check.describe()).collect(),
                });
            }

            let results =
                futures::future::join_all(pending.iter().map(|check| check.ready(client))).await;
            let mut results = results.into_iter();
            pending.retain(|check| match results.next() {
                Some(Ok(true)) => {
                    debug!(resource = %check.describe(), "ready");
                    false
                }
                Some(Ok(false)) => true,
                Some(Err(err)) => {
                    warn!(resource = %check.describe(), ?err, "readiness probe failed");
                    true
                }
                None => true,
            });

            if !pending.is_empty() {
                ticks.next().await;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MANIFEST: &str = "\
---
apiVersion: v1
kind: Namespace
metadata:
  name: registry
---
apiVersion: project.openshift.io/v1
kind: ProjectRequest
metadata:
  name: pipelines
---
apiVersion: v1
kind: ConfigMap
metadata:
  name: unmonitored
";

    #[test]
    fn recognized_kinds_become_checks() {
        let checks = ReadinessRegistry::default().checks_for_manifest(MANIFEST);
        let described: Vec<String> = checks.iter().map(|check| check.describe()).collect();
        assert_eq!(described, vec!["Namespace/registry", "ProjectRequest/pipelines"]);
    }

    #[test]
    fn registered_kinds_extend_the_monitor() {
        let mut registry = ReadinessRegistry::default();
        registry.register("ConfigMap", |name| {
            Box::new(NamespaceExists {
                kind: "ConfigMap",
                name,
            })
        });
        let checks = registry.checks_for_manifest(MANIFEST);
        assert_eq!(checks.len(), 3);
    }
}
