mod cluster;
mod helpers;

pub use cluster::*;
pub use helpers::*;

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use flotilla_chart_fs::ChartFs;
use flotilla_config::Config;
use minijinja::Environment;
use serde::Serialize;
use tracing::debug;

use crate::context::AppContext;

pub const VALUES_TEMPLATE: &str = "values.yaml.tpl";

#[derive(Debug, Serialize)]
struct ProductContext {
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "Enabled")]
    enabled: bool,
    #[serde(rename = "Namespace")]
    namespace: String,
    #[serde(rename = "Properties")]
    properties: serde_yaml::Mapping,
}

#[derive(Debug, Serialize)]
struct InstallerContext {
    #[serde(rename = "Namespace")]
    namespace: String,
    #[serde(rename = "Settings")]
    settings: serde_yaml::Mapping,
    #[serde(rename = "Products")]
    products: BTreeMap<String, ProductContext>,
}

#[derive(Debug, Serialize)]
struct TemplateContext {
    #[serde(rename = "Installer")]
    installer: InstallerContext,
    #[serde(rename = "Cluster")]
    cluster: ClusterInfo,
}

fn template_context(ctx: &AppContext, config: &Config, cluster: ClusterInfo) -> TemplateContext {
    let products = config
        .products()
        .map(|product| {
            (
                product.key(),
                ProductContext {
                    name: product.name.clone(),
                    enabled: product.enabled,
                    namespace: product.namespace_or(&ctx.namespace).to_owned(),
                    properties: product.properties.clone(),
                },
            )
        })
        .collect();
    TemplateContext {
        installer: InstallerContext {
            namespace: ctx.namespace.clone(),
            settings: config.settings.clone(),
            products,
        },
        cluster,
    }
}

/// Renders `values.yaml.tpl` into the global values document. Rendering
/// happens once per deployment; every chart consumes the same output.
/// Cluster introspection is best-effort: with no client, or when a query
/// fails, the affected fields render as empty strings.
pub async fn render_values(
    ctx: &AppContext,
    fs: &ChartFs,
    config: &Config,
    client: Option<kube::Client>,
) -> Result<serde_yaml::Value> {
    let source = match fs.read_to_string(VALUES_TEMPLATE) {
        Ok(source) => source,
        Err(flotilla_chart_fs::OverlayError::NotFound(_)) => {
            debug!("no {VALUES_TEMPLATE}, using empty values");
            return Ok(serde_yaml::Value::Mapping(Default::default()));
        }
        Err(err) => return Err(err.into()),
    };

    let cluster = ClusterInfo::gather(client.as_ref()).await;
    let context = template_context(ctx, config, cluster);

    let mut env = Environment::new();
    register_helpers(&mut env, client);
    let rendered = env
        .template_from_str(&source)
        .context("parsing values template")?
        .render(minijinja::Value::from_serialize(&context))
        .context("rendering values template")?;

    serde_yaml::from_str(&rendered).context("parsing rendered values as YAML")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn app_context() -> AppContext {
        AppContext::builder("flotilla").namespace("sys").build()
    }

    fn config() -> Config {
        Config::from_yaml(
            "settings:\n  catalog_url: https://example.com\n\
             products:\n- name: Red Hat Quay\n  enabled: true\n  namespace: quay\n",
            "sys",
        )
        .unwrap()
    }

    #[test]
    fn products_are_keyed_by_sanitized_name() {
        let context = template_context(&app_context(), &config(), ClusterInfo::default());
        assert!(context.installer.products.contains_key("Red_Hat_Quay"));
        let product = &context.installer.products["Red_Hat_Quay"];
        assert_eq!(product.name, "Red Hat Quay");
        assert_eq!(product.namespace, "quay");
    }

    #[tokio::test]
    async fn renders_installer_and_cluster_roots() -> Result<()> {
        let mut env = Environment::new();
        register_helpers(&mut env, None);
        let context = template_context(&app_context(), &config(), ClusterInfo::default());
        let rendered = env
            .template_from_str(
                "namespace: {{ Installer.Namespace }}\n\
                 domain: \"{{ Cluster.Ingress.Domain }}\"\n\
                 quay: {{ Installer.Products.Red_Hat_Quay.Enabled }}\n",
            )?
            .render(minijinja::Value::from_serialize(&context))?;
        let value: serde_yaml::Value = serde_yaml::from_str(&rendered)?;
        assert_eq!(value["namespace"], "sys");
        assert_eq!(value["domain"], "");
        assert_eq!(value["quay"], true);
        Ok(())
    }
}
