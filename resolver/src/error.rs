use crate::expr::ExprError;

#[derive(Debug, thiserror::Error)]
pub enum ResolverError {
    #[error("Chart {name} not found, required by {referer}")]
    ChartNotFound { name: String, referer: String },

    #[error("Circular dependency: {}", path.join(" -> "))]
    CircularDependency { path: Vec<String> },

    #[error("Product {0} is enabled but no chart declares it")]
    ProductChartNotFound(String),

    #[error("Chart {chart} has a malformed weight annotation: {value:?}")]
    MalformedWeight { chart: String, value: String },
}

#[derive(Debug, thiserror::Error)]
pub enum IntegrationError {
    #[error("Unknown integration {name:?} provided by chart {chart} (product {product:?})")]
    UnknownIntegration {
        name: String,
        chart: String,
        product: String,
    },

    #[error("Chart {chart} has an invalid integration requirement {expr:?}: {cause}")]
    InvalidExpression {
        chart: String,
        expr: String,
        #[source]
        cause: ExprError,
    },

    #[error(
        "Chart {chart} requires integrations that are not configured: {}. \
         The requirement expression is {expr:?}",
        missing.join(", ")
    )]
    PrerequisiteIntegration {
        chart: String,
        expr: String,
        missing: Vec<String>,
    },
}
