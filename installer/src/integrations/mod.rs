mod wrapper;

pub use wrapper::*;

use itertools::Itertools;

/// Sensitive scaffold fields render as this literal so credentials never
/// travel through tool output.
pub const OVERWRITE_SENTINEL: &str = "OVERWRITE_ME";

/// One CLI flag of an integration module and the Secret key it feeds.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub flag: &'static str,
    pub secret_key: &'static str,
    pub sensitive: bool,
    /// Default printed in scaffold output for non-sensitive fields.
    pub placeholder: &'static str,
}

/// A registered integration module: a named mapping from CLI flags to
/// Secret key/value pairs.
#[derive(Debug, Clone)]
pub struct IntegrationModule {
    pub name: &'static str,
    pub description: &'static str,
    pub fields: &'static [FieldSpec],
}

/// The integration module registry. The framework ships the standard
/// modules; installers may register their own.
pub struct Manager {
    modules: Vec<IntegrationModule>,
}

impl Default for Manager {
    fn default() -> Self {
        Self::standard()
    }
}

impl Manager {
    pub fn standard() -> Self {
        Self {
            modules: vec![
                IntegrationModule {
                    name: "github",
                    description: "GitHub App credentials",
                    fields: &[
                        FieldSpec {
                            flag: "app-id",
                            secret_key: "appId",
                            sensitive: false,
                            placeholder: "<app-id>",
                        },
                        FieldSpec {
                            flag: "client-id",
                            secret_key: "clientId",
                            sensitive: false,
                            placeholder: "<client-id>",
                        },
                        FieldSpec {
                            flag: "client-secret",
                            secret_key: "clientSecret",
                            sensitive: true,
                            placeholder: "",
                        },
                        FieldSpec {
                            flag: "webhook-secret",
                            secret_key: "webhookSecret",
                            sensitive: true,
                            placeholder: "",
                        },
                        FieldSpec {
                            flag: "private-key",
                            secret_key: "privateKey",
                            sensitive: true,
                            placeholder: "",
                        },
                        FieldSpec {
                            flag: "host",
                            secret_key: "host",
                            sensitive: false,
                            placeholder: "github.com",
                        },
                    ],
                },
                IntegrationModule {
                    name: "gitlab",
                    description: "GitLab application credentials",
                    fields: &[
                        FieldSpec {
                            flag: "token",
                            secret_key: "token",
                            sensitive: true,
                            placeholder: "",
                        },
                        FieldSpec {
                            flag: "app-id",
                            secret_key: "appId",
                            sensitive: false,
                            placeholder: "<app-id>",
                        },
                        FieldSpec {
                            flag: "app-secret",
                            secret_key: "appSecret",
                            sensitive: true,
                            placeholder: "",
                        },
                        FieldSpec {
                            flag: "host",
                            secret_key: "host",
                            sensitive: false,
                            placeholder: "gitlab.com",
                        },
                    ],
                },
                IntegrationModule {
                    name: "quay",
                    description: "Quay registry credentials",
                    fields: &[
                        FieldSpec {
                            flag: "token",
                            secret_key: "token",
                            sensitive: true,
                            placeholder: "",
                        },
                        FieldSpec {
                            flag: "organization",
                            secret_key: "organization",
                            sensitive: false,
                            placeholder: "<organization>",
                        },
                        FieldSpec {
                            flag: "host",
                            secret_key: "host",
                            sensitive: false,
                            placeholder: "quay.io",
                        },
                    ],
                },
            ],
        }
    }

    pub fn register(&mut self, module: IntegrationModule) {
        self.modules.push(module);
    }

    /// Known integration names, sorted.
    pub fn names(&self) -> Vec<String> {
        self.modules
            .iter()
            .map(|module| module.name.to_owned())
            .sorted()
            .collect()
    }

    pub fn get(&self, name: &str) -> Option<&IntegrationModule> {
        self.modules.iter().find(|module| module.name == name)
    }

    pub fn modules(&self) -> impl Iterator<Item = &IntegrationModule> {
        self.modules.iter()
    }

    /// Builds the CLI command an operator runs to configure the named
    /// integration. Sensitive fields carry the overwrite sentinel.
    pub fn scaffold(&self, app_name: &str, name: &str) -> Option<String> {
        let module = self.get(name)?;
        let mut command = format!("{app_name} integration {name}");
        for field in module.fields {
            let value = if field.sensitive {
                OVERWRITE_SENTINEL
            } else {
                field.placeholder
            };
            command.push_str(&format!(" \\\n  --{} '{value}'", field.flag));
        }
        Some(command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_sorted() {
        assert_eq!(Manager::standard().names(), vec!["github", "gitlab", "quay"]);
    }

    #[test]
    fn scaffold_masks_sensitive_fields() {
        let manager = Manager::standard();
        let scaffold = manager.scaffold("flotilla", "quay").unwrap();
        assert!(scaffold.starts_with("flotilla integration quay"));
        assert!(scaffold.contains("--token 'OVERWRITE_ME'"));
        assert!(scaffold.contains("--host 'quay.io'"));
        assert!(!scaffold.contains("--token ''"));
    }

    #[test]
    fn unknown_module_has_no_scaffold() {
        assert!(Manager::standard().scaffold("flotilla", "nexus").is_none());
    }
}
