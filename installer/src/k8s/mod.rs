mod client;
mod job;
mod readiness;
mod secrets;

pub use client::*;
pub use job::*;
pub use readiness::*;
pub use secrets::*;

use anyhow::Result;
use k8s_openapi::api::core::v1::Namespace;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::api::{Api, PostParams};
use tracing::debug;

/// Creates the namespace when it does not exist yet; an existing namespace
/// is left untouched.
pub async fn ensure_namespace(client: &kube::Client, name: &str) -> Result<()> {
    let api = Api::<Namespace>::all(client.clone());
    let namespace = Namespace {
        metadata: ObjectMeta {
            name: Some(name.to_owned()),
            ..Default::default()
        },
        ..Default::default()
    };
    match api.create(&PostParams::default(), &namespace).await {
        Ok(_) => {
            debug!(namespace = name, "created");
            Ok(())
        }
        Err(err) if is_api_error(&err, http::StatusCode::CONFLICT) => {
            debug!(namespace = name, "already exists");
            Ok(())
        }
        Err(err) => Err(err.into()),
    }
}

pub(crate) fn is_api_error(err: &kube::Error, code: http::StatusCode) -> bool {
    matches!(
        err,
        kube::Error::Api(kube::core::ErrorResponse { code: c, .. }) if *c == code.as_u16()
    )
}

pub(crate) fn create_interval_stream(
    duration: std::time::Duration,
) -> tokio_stream::wrappers::IntervalStream {
    let interval = tokio::time::interval_at(tokio::time::Instant::now() + duration, duration);
    tokio_stream::wrappers::IntervalStream::new(interval)
}
