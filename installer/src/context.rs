/// Build-time identifiers, injected by build.rs.
pub const VERSION: &str = env!("FLOTILLA_VERSION");
pub const COMMIT: &str = env!("FLOTILLA_COMMIT");

/// Application identity and naming conventions, constructed once in main
/// and injected into every component. The annotation prefix is fixed at
/// build time; every chart annotation, label and object name derives from
/// the fields here.
#[derive(Debug, Clone)]
pub struct AppContext {
    pub name: String,
    pub version: String,
    pub commit: String,
    pub namespace: String,
    pub annotation_prefix: String,
    pub short_description: String,
    pub long_description: String,
    pub mcp_image: Option<String>,
}

impl AppContext {
    pub fn builder(name: &str) -> AppContextBuilder {
        AppContextBuilder {
            ctx: AppContext {
                name: name.to_owned(),
                version: VERSION.to_owned(),
                commit: COMMIT.to_owned(),
                namespace: format!("{name}-system"),
                annotation_prefix: format!("{name}.dev"),
                short_description: String::new(),
                long_description: String::new(),
                mcp_image: None,
            },
        }
    }

    /// Label key marking the configuration ConfigMap.
    pub fn config_label(&self) -> String {
        format!("{}/config", self.annotation_prefix)
    }

    pub fn integration_secret_name(&self, integration: &str) -> String {
        format!("{}-{integration}-integration", self.name)
    }

    pub fn deploy_job_name(&self) -> String {
        format!("{}-deploy-job", self.name)
    }

    /// Value of the `type` label stamped on the delegated deployment Job.
    pub fn job_type_label(&self) -> String {
        format!("installer-job.{}", self.annotation_prefix)
    }

    /// MCP tool names are prefixed with the app name so several installers
    /// can coexist in one assistant session.
    pub fn tool_name(&self, tool: &str) -> String {
        format!("{}_{tool}", self.name.replace('-', "_"))
    }
}

pub struct AppContextBuilder {
    ctx: AppContext,
}

impl AppContextBuilder {
    pub fn namespace(mut self, namespace: &str) -> Self {
        self.ctx.namespace = namespace.to_owned();
        self
    }

    pub fn annotation_prefix(mut self, prefix: &str) -> Self {
        self.ctx.annotation_prefix = prefix.to_owned();
        self
    }

    pub fn short_description(mut self, description: &str) -> Self {
        self.ctx.short_description = description.to_owned();
        self
    }

    pub fn long_description(mut self, description: &str) -> Self {
        self.ctx.long_description = description.to_owned();
        self
    }

    pub fn mcp_image(mut self, image: &str) -> Self {
        self.ctx.mcp_image = Some(image.to_owned());
        self
    }

    pub fn build(self) -> AppContext {
        self.ctx
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn naming_conventions() {
        let ctx = AppContext::builder("flotilla").build();
        assert_eq!(ctx.namespace, "flotilla-system");
        assert_eq!(ctx.config_label(), "flotilla.dev/config");
        assert_eq!(
            ctx.integration_secret_name("quay"),
            "flotilla-quay-integration"
        );
        assert_eq!(ctx.deploy_job_name(), "flotilla-deploy-job");
        assert_eq!(ctx.job_type_label(), "installer-job.flotilla.dev");
        assert_eq!(ctx.tool_name("config_get"), "flotilla_config_get");
    }
}
