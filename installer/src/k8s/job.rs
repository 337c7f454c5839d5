use std::collections::BTreeMap;

use anyhow::Result;
use k8s_openapi::api::batch::v1::{Job, JobSpec};
use k8s_openapi::api::core::v1::{
    Container, EnvVar, PodSpec, PodTemplateSpec, ServiceAccount,
};
use k8s_openapi::api::rbac::v1::ClusterRoleBinding;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::api::{Api, DeleteParams, Patch, PatchParams, PostParams};
use tracing::{debug, info};

use crate::context::AppContext;
use crate::errors::InstallerError;

/// Observable state of the delegated deployment Job, derived solely from
/// the Job status counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum JobState {
    NotFound = 0,
    Deploying = 1,
    Failed = 2,
    Done = 3,
}

pub fn job_state(job: Option<&Job>) -> JobState {
    let Some(job) = job else {
        return JobState::NotFound;
    };
    let status = job.status.clone().unwrap_or_default();
    if status.active.unwrap_or(0) > 0 {
        JobState::Deploying
    } else if status.failed.unwrap_or(0) > 0 {
        JobState::Failed
    } else if status.succeeded.unwrap_or(0) > 0 {
        JobState::Done
    } else {
        // Created but no pod scheduled yet.
        JobState::Deploying
    }
}

/// Creates and tracks the singleton deployment Job, together with the
/// ServiceAccount and ClusterRoleBinding it runs under. The caller's RBAC
/// must already permit creating both; nothing here escalates.
pub struct DeployJob {
    jobs: Api<Job>,
    service_accounts: Api<ServiceAccount>,
    bindings: Api<ClusterRoleBinding>,
    ctx: AppContext,
}

impl DeployJob {
    pub fn new(client: kube::Client, ctx: &AppContext) -> Self {
        Self {
            jobs: Api::namespaced(client.clone(), &ctx.namespace),
            service_accounts: Api::namespaced(client.clone(), &ctx.namespace),
            bindings: Api::all(client),
            ctx: ctx.clone(),
        }
    }

    pub async fn state(&self) -> Result<JobState> {
        let job = self.jobs.get_opt(&self.ctx.deploy_job_name()).await?;
        Ok(job_state(job.as_ref()))
    }

    /// Materializes the ServiceAccount and ClusterRoleBinding with
    /// server-side apply, then creates the Job. An existing Job is only
    /// replaced when `force` is set.
    pub async fn create(
        &self,
        image: &str,
        dry_run: bool,
        debug: bool,
        force: bool,
    ) -> Result<()> {
        let name = self.ctx.deploy_job_name();
        if let Some(existing) = self.jobs.get_opt(&name).await? {
            if !force {
                return Err(InstallerError::JobAlreadyExists(
                    existing.metadata.name.unwrap_or(name),
                )
                .into());
            }
            info!(job = %name, "replacing existing deployment job");
            self.jobs
                .delete(&name, &DeleteParams::background())
                .await?;
            self.wait_until_deleted(&name).await?;
        }

        self.apply_rbac().await?;

        let job = self.job_manifest(image, dry_run, debug);
        debug!(job = %name, image, "creating deployment job");
        self.jobs.create(&PostParams::default(), &job).await?;
        Ok(())
    }

    async fn wait_until_deleted(&self, name: &str) -> Result<()> {
        let mut ticks = super::create_interval_stream(std::time::Duration::from_secs(2));
        while self.jobs.get_opt(name).await?.is_some() {
            use tokio_stream::StreamExt;
            ticks.next().await;
        }
        Ok(())
    }

    async fn apply_rbac(&self) -> Result<()> {
        let params = PatchParams::apply(&self.ctx.name).force();

        let service_account = serde_json::json!({
            "apiVersion": "v1",
            "kind": "ServiceAccount",
            "metadata": {
                "name": self.ctx.name,
                "namespace": self.ctx.namespace,
            },
        });
        self.service_accounts
            .patch(&self.ctx.name, &params, &Patch::Apply(&service_account))
            .await?;

        let binding = serde_json::json!({
            "apiVersion": "rbac.authorization.k8s.io/v1",
            "kind": "ClusterRoleBinding",
            "metadata": { "name": self.ctx.name },
            "roleRef": {
                "apiGroup": "rbac.authorization.k8s.io",
                "kind": "ClusterRole",
                "name": "cluster-admin",
            },
            "subjects": [{
                "kind": "ServiceAccount",
                "name": self.ctx.name,
                "namespace": self.ctx.namespace,
            }],
        });
        self.bindings
            .patch(&self.ctx.name, &params, &Patch::Apply(&binding))
            .await?;
        Ok(())
    }

    fn job_manifest(&self, image: &str, dry_run: bool, debug: bool) -> Job {
        let mut args = vec!["deploy".to_owned()];
        if debug {
            args.push("--debug".to_owned());
        }
        if dry_run {
            args.push("--dry-run".to_owned());
        }
        Job {
            metadata: ObjectMeta {
                name: Some(self.ctx.deploy_job_name()),
                namespace: Some(self.ctx.namespace.clone()),
                labels: Some(BTreeMap::from([(
                    "type".to_owned(),
                    self.ctx.job_type_label(),
                )])),
                ..Default::default()
            },
            spec: Some(JobSpec {
                backoff_limit: Some(0),
                template: PodTemplateSpec {
                    metadata: None,
                    spec: Some(PodSpec {
                        service_account_name: Some(self.ctx.name.clone()),
                        restart_policy: Some("Never".to_owned()),
                        containers: vec![Container {
                            name: self.ctx.deploy_job_name(),
                            image: Some(image.to_owned()),
                            args: Some(args),
                            // Forces in-cluster credentials inside the pod.
                            env: Some(vec![EnvVar {
                                name: "KUBECONFIG".to_owned(),
                                value: Some(String::new()),
                                ..Default::default()
                            }]),
                            ..Default::default()
                        }],
                        ..Default::default()
                    }),
                },
                ..Default::default()
            }),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::batch::v1::JobStatus;

    fn job_with(active: i32, failed: i32, succeeded: i32) -> Job {
        Job {
            status: Some(JobStatus {
                active: Some(active),
                failed: Some(failed),
                succeeded: Some(succeeded),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[test]
    fn state_from_status_counters() {
        assert_eq!(job_state(None), JobState::NotFound);
        assert_eq!(job_state(Some(&job_with(1, 0, 0))), JobState::Deploying);
        assert_eq!(job_state(Some(&job_with(0, 1, 0))), JobState::Failed);
        assert_eq!(job_state(Some(&job_with(0, 0, 1))), JobState::Done);
        assert_eq!(job_state(Some(&job_with(0, 0, 0))), JobState::Deploying);
    }
}
