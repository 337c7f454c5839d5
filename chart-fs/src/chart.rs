use std::collections::BTreeMap;

use serde::Deserialize;

/// Annotation names understood by the framework. Every name is prefixed
/// with the installer's annotation prefix, fixed at build time.
pub mod annotations {
    pub const PRODUCT_NAME: &str = "product-name";
    pub const USE_PRODUCT_NAMESPACE: &str = "use-product-namespace";
    pub const DEPENDS_ON: &str = "depends-on";
    pub const WEIGHT: &str = "weight";
    pub const INTEGRATIONS_PROVIDED: &str = "integrations-provided";
    pub const INTEGRATIONS_REQUIRED: &str = "integrations-required";
}

pub const CHART_MANIFEST: &str = "Chart.yaml";
pub const PRE_DEPLOY_HOOK: &str = "hooks/pre-deploy.sh";
pub const POST_DEPLOY_HOOK: &str = "hooks/post-deploy.sh";
pub const RELEASE_NOTES: &str = "notes.md";

/// The subset of Chart.yaml the framework reads.
#[derive(Debug, Clone, Deserialize)]
pub struct ChartManifest {
    pub name: String,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub annotations: BTreeMap<String, String>,
}

/// A Helm chart loaded from the overlay filesystem: its manifest plus the
/// whole file subtree, keyed by chart-relative POSIX path.
#[derive(Debug, Clone)]
pub struct Chart {
    manifest: ChartManifest,
    path: String,
    files: BTreeMap<String, Vec<u8>>,
}

impl Chart {
    pub fn new(manifest: ChartManifest, path: String, files: BTreeMap<String, Vec<u8>>) -> Self {
        Self {
            manifest,
            path,
            files,
        }
    }

    pub fn name(&self) -> &str {
        &self.manifest.name
    }

    pub fn version(&self) -> Option<&str> {
        self.manifest.version.as_deref()
    }

    pub fn description(&self) -> Option<&str> {
        self.manifest.description.as_deref()
    }

    /// Overlay path of the chart directory, e.g. `charts/foundation`.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn annotation(&self, prefix: &str, name: &str) -> Option<&str> {
        self.manifest
            .annotations
            .get(&format!("{prefix}/{name}"))
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }

    pub fn product_name(&self, prefix: &str) -> Option<&str> {
        self.annotation(prefix, annotations::PRODUCT_NAME)
    }

    pub fn use_product_namespace(&self, prefix: &str) -> Option<&str> {
        self.annotation(prefix, annotations::USE_PRODUCT_NAMESPACE)
    }

    /// Dependency names in declaration order.
    pub fn depends_on(&self, prefix: &str) -> Vec<&str> {
        split_list(self.annotation(prefix, annotations::DEPENDS_ON))
    }

    /// Raw weight annotation; parsing belongs to the resolver so malformed
    /// values surface as resolution errors.
    pub fn weight(&self, prefix: &str) -> Option<&str> {
        self.annotation(prefix, annotations::WEIGHT)
    }

    pub fn integrations_provided(&self, prefix: &str) -> Vec<&str> {
        split_list(self.annotation(prefix, annotations::INTEGRATIONS_PROVIDED))
    }

    pub fn integrations_required(&self, prefix: &str) -> Option<&str> {
        self.annotation(prefix, annotations::INTEGRATIONS_REQUIRED)
    }

    pub fn file(&self, rel_path: &str) -> Option<&[u8]> {
        self.files.get(rel_path).map(Vec::as_slice)
    }

    pub fn files(&self) -> impl Iterator<Item = (&str, &[u8])> {
        self.files
            .iter()
            .map(|(path, data)| (path.as_str(), data.as_slice()))
    }

    pub fn pre_deploy_hook(&self) -> Option<&[u8]> {
        self.file(PRE_DEPLOY_HOOK)
    }

    pub fn post_deploy_hook(&self) -> Option<&[u8]> {
        self.file(POST_DEPLOY_HOOK)
    }

    pub fn release_notes(&self) -> Option<&str> {
        self.file(RELEASE_NOTES)
            .and_then(|data| std::str::from_utf8(data).ok())
    }
}

fn split_list(value: Option<&str>) -> Vec<&str> {
    value
        .map(|v| {
            v.split(',')
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chart_with(annotations: &[(&str, &str)]) -> Chart {
        let manifest = ChartManifest {
            name: "test".to_owned(),
            version: None,
            description: None,
            annotations: annotations
                .iter()
                .map(|(k, v)| (format!("flotilla.dev/{k}"), v.to_string()))
                .collect(),
        };
        Chart::new(manifest, "charts/test".to_owned(), BTreeMap::new())
    }

    #[test]
    fn depends_on_preserves_declaration_order() {
        let chart = chart_with(&[("depends-on", "b, a ,c")]);
        assert_eq!(chart.depends_on("flotilla.dev"), vec!["b", "a", "c"]);
    }

    #[test]
    fn empty_annotations_are_absent() {
        let chart = chart_with(&[("product-name", "")]);
        assert_eq!(chart.product_name("flotilla.dev"), None);
        assert!(chart.depends_on("flotilla.dev").is_empty());
    }
}
