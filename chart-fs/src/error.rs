#[derive(Debug, thiserror::Error)]
pub enum OverlayError {
    #[error("File not found: {0}")]
    NotFound(String),

    #[error("The overlay filesystem is read-only, cannot write {0}")]
    ReadOnly(String),

    #[error("Archive entry escapes the extraction root: {0}")]
    PathEscape(String),

    #[error("Malformed embedded archive: {0}")]
    MalformedArchive(String),

    #[error("std::io::Error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum CollectionError {
    #[error("Error while parsing {0}: {1}")]
    ChartParse(String, serde_yaml::Error),

    #[error("Chart {0} has no name in its Chart.yaml")]
    UnnamedChart(String),

    #[error("Duplicate chart name {0}")]
    DuplicateChartName(String),

    #[error("Product {product} is claimed by two charts: {first} and {second}")]
    DuplicateProductChart {
        product: String,
        first: String,
        second: String,
    },

    #[error(transparent)]
    Overlay(#[from] OverlayError),
}
