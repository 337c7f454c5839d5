use k8s_openapi::api::core::v1::ConfigMap;
use kube::api::{Api, DynamicObject};
use kube::core::{ApiResource, GroupVersionKind};
use serde::Serialize;
use tracing::debug;

/// Cluster facts exposed to the values template. Population is
/// best-effort: every query failure leaves the affected field as an empty
/// string, and rendering never fails because of it.
#[derive(Debug, Default, Serialize)]
pub struct ClusterInfo {
    #[serde(rename = "Ingress")]
    pub ingress: IngressInfo,
    #[serde(rename = "Version")]
    pub version: String,
    #[serde(rename = "MinorVersion")]
    pub minor_version: String,
}

#[derive(Debug, Default, Serialize)]
pub struct IngressInfo {
    #[serde(rename = "Domain")]
    pub domain: String,
    #[serde(rename = "RouterCA")]
    pub router_ca: String,
}

impl ClusterInfo {
    pub async fn gather(client: Option<&kube::Client>) -> Self {
        let Some(client) = client else {
            return Self::default();
        };
        let (version, domain, router_ca) = tokio::join!(
            apiserver_version(client),
            ingress_domain(client),
            router_ca(client),
        );
        let (version, minor_version) = version.unwrap_or_default();
        Self {
            ingress: IngressInfo {
                domain: domain.unwrap_or_default(),
                router_ca: router_ca.unwrap_or_default(),
            },
            version,
            minor_version,
        }
    }
}

async fn apiserver_version(client: &kube::Client) -> Option<(String, String)> {
    match client.apiserver_version().await {
        Ok(info) => Some((info.git_version, info.minor)),
        Err(err) => {
            debug!(?err, "could not read apiserver version");
            None
        }
    }
}

/// Reads `spec.domain` from the cluster-scoped OpenShift ingress config.
async fn ingress_domain(client: &kube::Client) -> Option<String> {
    let resource = ApiResource::from_gvk(&GroupVersionKind::gvk(
        "config.openshift.io",
        "v1",
        "Ingress",
    ));
    let api: Api<DynamicObject> = Api::all_with(client.clone(), &resource);
    match api.get_opt("cluster").await {
        Ok(Some(ingress)) => ingress
            .data
            .get("spec")
            .and_then(|spec| spec.get("domain"))
            .and_then(|domain| domain.as_str())
            .map(str::to_owned),
        Ok(None) => None,
        Err(err) => {
            debug!(?err, "could not read ingress config");
            None
        }
    }
}

/// The default ingress certificate bundle OpenShift publishes for routers.
async fn router_ca(client: &kube::Client) -> Option<String> {
    let api = Api::<ConfigMap>::namespaced(client.clone(), "openshift-config-managed");
    match api.get_opt("default-ingress-cert").await {
        Ok(Some(configmap)) => configmap
            .data
            .and_then(|mut data| data.remove("ca-bundle.crt")),
        Ok(None) => None,
        Err(err) => {
            debug!(?err, "could not read router CA");
            None
        }
    }
}
