use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// A logical deployment unit declared in the configuration, bound to at
/// most one chart through the `product-name` annotation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub name: String,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(default, skip_serializing_if = "serde_yaml::Mapping::is_empty")]
    pub properties: serde_yaml::Mapping,
}

impl Product {
    /// Sanitized product key used for template context lookups.
    pub fn key(&self) -> String {
        sanitize_key(&self.name)
    }

    /// The product namespace after defaulting to the installer namespace.
    pub fn namespace_or<'a>(&'a self, installer_namespace: &'a str) -> &'a str {
        match self.namespace.as_deref() {
            Some(ns) if !ns.is_empty() => ns,
            _ => installer_namespace,
        }
    }
}

/// The installer configuration: a freeform `settings` mapping (required to
/// exist, even if empty) and an ordered list of products.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    pub settings: serde_yaml::Mapping,
    #[serde(default)]
    pub products: Vec<Product>,
}

impl Config {
    /// Parses and validates a configuration payload. Every enabled product
    /// must resolve to a non-empty namespace once the installer namespace
    /// default is applied.
    pub fn from_yaml(payload: &str, installer_namespace: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(payload)?;
        config.validate(installer_namespace)?;
        Ok(config)
    }

    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn validate(&self, installer_namespace: &str) -> Result<(), ConfigError> {
        for product in &self.products {
            if product.enabled && product.namespace_or(installer_namespace).is_empty() {
                return Err(ConfigError::ProductWithoutNamespace(product.name.clone()));
            }
        }
        Ok(())
    }

    pub fn product(&self, name: &str) -> Result<&Product, ConfigError> {
        self.products
            .iter()
            .find(|product| product.name == name)
            .ok_or_else(|| ConfigError::ProductNotFound(name.to_owned()))
    }

    pub fn product_mut(&mut self, name: &str) -> Result<&mut Product, ConfigError> {
        self.products
            .iter_mut()
            .find(|product| product.name == name)
            .ok_or_else(|| ConfigError::ProductNotFound(name.to_owned()))
    }

    /// Products in declaration order; the topology engine depends on this
    /// order being stable.
    pub fn products(&self) -> impl Iterator<Item = &Product> {
        self.products.iter()
    }

    pub fn enabled_products(&self) -> impl Iterator<Item = &Product> {
        self.products.iter().filter(|product| product.enabled)
    }

    pub fn set_setting(&mut self, key: &str, value: serde_yaml::Value) {
        self.settings
            .insert(serde_yaml::Value::String(key.to_owned()), value);
    }
}

/// Collapses any run of non-alphanumeric characters into a single `_` and
/// trims `_` from both ends. Idempotent.
pub fn sanitize_key(name: &str) -> String {
    let mut key = String::with_capacity(name.len());
    let mut last_was_underscore = false;
    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() {
            key.push(ch);
            last_was_underscore = false;
        } else if !last_was_underscore {
            key.push('_');
            last_was_underscore = true;
        }
    }
    key.trim_matches('_').to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_key_collapses_and_trims() {
        assert_eq!(sanitize_key("OpenShift GitOps"), "OpenShift_GitOps");
        assert_eq!(sanitize_key("--a  b--"), "a_b");
        assert_eq!(sanitize_key("plain"), "plain");
    }

    #[test]
    fn sanitize_key_is_idempotent() {
        for name in ["Red Hat Quay", "a--b__c", " spaced out "] {
            let once = sanitize_key(name);
            assert_eq!(sanitize_key(&once), once);
        }
    }
}
