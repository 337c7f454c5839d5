#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Error while parsing configuration: {0}")]
    ParseError(#[from] serde_yaml::Error),

    #[error("Product {0} is enabled but resolves to an empty namespace")]
    ProductWithoutNamespace(String),

    #[error("No product named {0} in the configuration")]
    ProductNotFound(String),

    #[error("No configuration found, create one first")]
    ConfigMapNotFound,

    #[error("Found {0} configuration ConfigMaps, expected exactly one")]
    MultipleConfigMapFound(usize),

    #[error("ConfigMap {0} has no {key} data key", key = crate::CONFIG_DATA_KEY)]
    IncompleteConfigMap(String),

    #[error("Configuration ConfigMap {0} already exists")]
    ConfigMapAlreadyExists(String),

    #[error(transparent)]
    Kube(#[from] kube::Error),
}
