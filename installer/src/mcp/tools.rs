use anyhow::{Context, Result, bail};
use serde_json::json;

use crate::commands::topology::render_table;
use crate::context::AppContext;
use crate::integrations::IntegrationWrapper;
use crate::k8s::{DeployJob, ensure_namespace};
use crate::mcp::McpServer;
use crate::mcp::phase::derive_phase;

/// The fixed tool catalog. Tool names are prefixed with the app name; the
/// server never accepts credentials as tool arguments.
pub fn catalog(ctx: &AppContext) -> Vec<serde_json::Value> {
    let tool = |name: &str, description: &str, schema: serde_json::Value| {
        json!({
            "name": ctx.tool_name(name),
            "description": description,
            "inputSchema": schema,
        })
    };
    let no_args = || json!({ "type": "object", "properties": {} });

    vec![
        tool(
            "config_get",
            "Return the current configuration, or the embedded default when none is stored",
            no_args(),
        ),
        tool(
            "config_init",
            "Create the configuration ConfigMap from the embedded default",
            json!({
                "type": "object",
                "properties": {
                    "namespace": { "type": "string", "description": "Installer namespace" },
                },
            }),
        ),
        tool(
            "config_settings",
            "Insert or update one setting",
            json!({
                "type": "object",
                "properties": {
                    "key": { "type": "string" },
                    "value": { "type": "string" },
                },
                "required": ["key", "value"],
            }),
        ),
        tool(
            "config_product_enabled",
            "Enable or disable a product",
            json!({
                "type": "object",
                "properties": {
                    "name": { "type": "string" },
                    "enabled": { "type": "boolean" },
                },
                "required": ["name", "enabled"],
            }),
        ),
        tool(
            "config_product_namespace",
            "Retarget a product to another namespace",
            json!({
                "type": "object",
                "properties": {
                    "name": { "type": "string" },
                    "namespace": { "type": "string" },
                },
                "required": ["name", "namespace"],
            }),
        ),
        tool(
            "config_product_properties",
            "Replace the freeform properties of a product",
            json!({
                "type": "object",
                "properties": {
                    "name": { "type": "string" },
                    "properties": { "type": "object" },
                },
                "required": ["name", "properties"],
            }),
        ),
        tool("integration_list", "List the known integrations", no_args()),
        tool(
            "integration_scaffold",
            "Generate CLI commands configuring the named integrations; sensitive \
             values are OVERWRITE_ME placeholders the operator fills in locally",
            json!({
                "type": "object",
                "properties": {
                    "names": { "type": "array", "items": { "type": "string" } },
                },
                "required": ["names"],
            }),
        ),
        tool(
            "integration_status",
            "Report which integration secrets exist",
            json!({
                "type": "object",
                "properties": {
                    "names": { "type": "array", "items": { "type": "string" } },
                },
            }),
        ),
        tool("topology", "Render the resolved deployment topology", no_args()),
        tool(
            "deploy",
            "Create the in-cluster deployment job",
            json!({
                "type": "object",
                "properties": {
                    "dry_run": { "type": "boolean", "default": true },
                    "force": { "type": "boolean", "default": false },
                    "debug": { "type": "boolean", "default": false },
                },
            }),
        ),
        tool(
            "status",
            "Current deployment phase and the suggested next action",
            no_args(),
        ),
        tool(
            "notes",
            "Release notes of a product",
            json!({
                "type": "object",
                "properties": { "name": { "type": "string" } },
                "required": ["name"],
            }),
        ),
    ]
}

fn str_arg(args: &serde_json::Value, key: &str) -> Result<String> {
    args.get(key)
        .and_then(serde_json::Value::as_str)
        .map(str::to_owned)
        .with_context(|| format!("missing required argument {key:?}"))
}

fn bool_arg(args: &serde_json::Value, key: &str, default: bool) -> bool {
    args.get(key)
        .and_then(serde_json::Value::as_bool)
        .unwrap_or(default)
}

fn names_arg(args: &serde_json::Value, key: &str) -> Option<Vec<String>> {
    args.get(key).and_then(serde_json::Value::as_array).map(|names| {
        names
            .iter()
            .filter_map(serde_json::Value::as_str)
            .map(str::to_owned)
            .collect()
    })
}

impl McpServer {
    pub(super) async fn call_tool(&self, name: &str, args: &serde_json::Value) -> Result<String> {
        let prefix = format!("{}_", self.app.ctx.name.replace('-', "_"));
        let Some(tool) = name.strip_prefix(&prefix) else {
            bail!("unknown tool {name}");
        };
        match tool {
            "config_get" => self.config_get().await,
            "config_init" => self.config_init(args).await,
            "config_settings" => self.config_settings(args).await,
            "config_product_enabled" => self.config_product_enabled(args).await,
            "config_product_namespace" => self.config_product_namespace(args).await,
            "config_product_properties" => self.config_product_properties(args).await,
            "integration_list" => self.integration_list(),
            "integration_scaffold" => self.integration_scaffold(args),
            "integration_status" => self.integration_status(args).await,
            "topology" => self.topology().await,
            "deploy" => self.deploy(args).await,
            "status" => self.status().await,
            "notes" => self.notes(args),
            _ => bail!("unknown tool {name}"),
        }
    }

    async fn config_get(&self) -> Result<String> {
        let client = self.app.kube_client().await?;
        match self.app.config_manager(&client).get_payload().await {
            Ok(payload) => Ok(payload),
            Err(flotilla_config::ConfigError::ConfigMapNotFound) => {
                self.app.default_config_payload()
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn config_init(&self, args: &serde_json::Value) -> Result<String> {
        let namespace = args
            .get("namespace")
            .and_then(serde_json::Value::as_str)
            .unwrap_or(&self.app.ctx.namespace)
            .to_owned();
        let client = self.app.kube_client().await?;
        ensure_namespace(&client, &namespace).await?;
        let config = self.app.default_config()?;
        flotilla_config::ConfigMapManager::new(
            client,
            &namespace,
            &self.app.ctx.name,
            &self.app.ctx.config_label(),
        )
        .create(&config)
        .await?;
        Ok(format!("Configuration created in namespace {namespace}"))
    }

    async fn with_stored_config<F>(&self, mutate: F) -> Result<String>
    where
        F: FnOnce(&mut flotilla_config::Config) -> Result<String>,
    {
        let client = self.app.kube_client().await?;
        let manager = self.app.config_manager(&client);
        let mut config = manager.get_config(&self.app.ctx.namespace).await?;
        let message = mutate(&mut config)?;
        config.validate(&self.app.ctx.namespace)?;
        manager.update(&config).await?;
        Ok(message)
    }

    async fn config_settings(&self, args: &serde_json::Value) -> Result<String> {
        let key = str_arg(args, "key")?;
        let value = str_arg(args, "value")?;
        self.with_stored_config(|config| {
            config.set_setting(&key, serde_yaml::Value::String(value.clone()));
            Ok(format!("Setting {key} updated"))
        })
        .await
    }

    async fn config_product_enabled(&self, args: &serde_json::Value) -> Result<String> {
        let name = str_arg(args, "name")?;
        let enabled = args
            .get("enabled")
            .and_then(serde_json::Value::as_bool)
            .context("missing required argument \"enabled\"")?;
        self.with_stored_config(|config| {
            config.product_mut(&name)?.enabled = enabled;
            Ok(format!(
                "Product {name} is now {}",
                if enabled { "enabled" } else { "disabled" }
            ))
        })
        .await
    }

    async fn config_product_namespace(&self, args: &serde_json::Value) -> Result<String> {
        let name = str_arg(args, "name")?;
        let namespace = str_arg(args, "namespace")?;
        self.with_stored_config(|config| {
            config.product_mut(&name)?.namespace = Some(namespace.clone());
            Ok(format!("Product {name} retargeted to {namespace}"))
        })
        .await
    }

    async fn config_product_properties(&self, args: &serde_json::Value) -> Result<String> {
        let name = str_arg(args, "name")?;
        let properties = args
            .get("properties")
            .context("missing required argument \"properties\"")?;
        let properties: serde_yaml::Mapping = serde_yaml::to_value(properties)?
            .as_mapping()
            .cloned()
            .context("properties must be an object")?;
        self.with_stored_config(|config| {
            config.product_mut(&name)?.properties = properties.clone();
            Ok(format!("Properties of {name} replaced"))
        })
        .await
    }

    fn integration_list(&self) -> Result<String> {
        let lines: Vec<String> = self
            .app
            .manager
            .modules()
            .map(|module| format!("{}: {}", module.name, module.description))
            .collect();
        Ok(lines.join("\n"))
    }

    fn integration_scaffold(&self, args: &serde_json::Value) -> Result<String> {
        let names =
            names_arg(args, "names").context("missing required argument \"names\"")?;
        let mut commands = Vec::new();
        for name in names {
            match self.app.manager.scaffold(&self.app.ctx.name, &name) {
                Some(command) => commands.push(command),
                None => bail!("unknown integration {name}"),
            }
        }
        Ok(commands.join("\n\n"))
    }

    async fn integration_status(&self, args: &serde_json::Value) -> Result<String> {
        let names = names_arg(args, "names").unwrap_or_else(|| self.app.manager.names());
        let client = self.app.kube_client().await?;
        let wrapper = IntegrationWrapper::new(&self.app.ctx, client);
        let mut lines = Vec::new();
        for name in names {
            let state = if wrapper.exists(&name).await? {
                "configured"
            } else {
                "missing"
            };
            lines.push(format!("{name}: {state}"));
        }
        Ok(lines.join("\n"))
    }

    async fn topology(&self) -> Result<String> {
        let client = self.app.kube_client().await?;
        let config = self.app.load_config(&client).await?;
        let collection = self.app.collection()?;
        let topology = self.app.resolve_topology(&config, &collection)?;
        Ok(render_table(&topology, &self.app.ctx.annotation_prefix))
    }

    async fn deploy(&self, args: &serde_json::Value) -> Result<String> {
        let dry_run = bool_arg(args, "dry_run", true);
        let force = bool_arg(args, "force", false);
        let debug = bool_arg(args, "debug", false);
        let client = self.app.kube_client().await?;
        DeployJob::new(client, &self.app.ctx)
            .create(&self.image, dry_run, debug, force)
            .await?;
        Ok(format!(
            "Deployment job {} created (dry_run={dry_run})",
            self.app.ctx.deploy_job_name()
        ))
    }

    async fn status(&self) -> Result<String> {
        let client = self.app.kube_client().await?;
        let phase = derive_phase(&self.app, &client).await?;
        Ok(format!("{phase}: {}", phase.suggested_action()))
    }

    fn notes(&self, args: &serde_json::Value) -> Result<String> {
        let name = str_arg(args, "name")?;
        let collection = self.app.collection()?;
        let chart = collection
            .product_chart(&name)
            .with_context(|| format!("no product named {name}"))?;
        Ok(chart
            .release_notes()
            .unwrap_or("This product has no release notes.")
            .to_owned())
    }
}
