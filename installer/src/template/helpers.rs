use std::collections::BTreeMap;

use base64::prelude::*;
use kube::api::{Api, DynamicObject};
use kube::core::{ApiResource, GroupVersionKind};
use minijinja::{Environment, Error, ErrorKind, Value};

/// Registers the helper set templates rely on. Helper names follow the
/// conventions chart authors already know from Helm values templating;
/// minijinja's built-in filters cover the general string and collection
/// helpers.
pub fn register_helpers(env: &mut Environment<'static>, client: Option<kube::Client>) {
    env.add_function("toYaml", to_yaml);
    env.add_function("fromYaml", from_yaml);
    env.add_function("fromYamlArray", from_yaml_array);
    env.add_function("toJson", to_json);
    env.add_function("fromJson", from_json);
    env.add_function("fromJsonArray", from_json_array);
    env.add_function("required", required);
    env.add_function("lookup", make_lookup(client));
    env.add_filter("quote", quote);
    env.add_filter("b64enc", b64enc);
    env.add_filter("b64dec", b64dec);
}

/// YAML-serializes the value, without the trailing newline serde_yaml
/// emits.
fn to_yaml(value: Value) -> Result<String, Error> {
    serde_yaml::to_string(&value)
        .map(|yaml| yaml.trim_end_matches('\n').to_owned())
        .map_err(|err| Error::new(ErrorKind::InvalidOperation, err.to_string()))
}

fn from_yaml(source: String) -> Value {
    match serde_yaml::from_str::<serde_yaml::Value>(&source) {
        Ok(value) => Value::from_serialize(&value),
        Err(err) => Value::from_serialize(&BTreeMap::from([("Error", err.to_string())])),
    }
}

fn from_yaml_array(source: String) -> Value {
    match serde_yaml::from_str::<Vec<serde_yaml::Value>>(&source) {
        Ok(value) => Value::from_serialize(&value),
        Err(err) => Value::from_serialize(&vec![err.to_string()]),
    }
}

fn to_json(value: Value) -> Result<String, Error> {
    serde_json::to_string(&value)
        .map_err(|err| Error::new(ErrorKind::InvalidOperation, err.to_string()))
}

fn from_json(source: String) -> Value {
    match serde_json::from_str::<serde_json::Value>(&source) {
        Ok(value) => Value::from_serialize(&value),
        Err(err) => Value::from_serialize(&BTreeMap::from([("Error", err.to_string())])),
    }
}

fn from_json_array(source: String) -> Value {
    match serde_json::from_str::<Vec<serde_json::Value>>(&source) {
        Ok(value) => Value::from_serialize(&value),
        Err(err) => Value::from_serialize(&vec![err.to_string()]),
    }
}

/// Fails the render when the value is absent, naming what was expected.
fn required(label: String, value: Value) -> Result<Value, Error> {
    if value.is_undefined() || value.is_none() {
        return Err(Error::new(
            ErrorKind::InvalidOperation,
            format!("required value is missing: {label}"),
        ));
    }
    Ok(value)
}

fn quote(value: String) -> String {
    format!("{value:?}")
}

fn b64enc(value: String) -> String {
    BASE64_STANDARD.encode(value.as_bytes())
}

fn b64dec(value: String) -> Result<String, Error> {
    let bytes = BASE64_STANDARD
        .decode(value.as_bytes())
        .map_err(|err| Error::new(ErrorKind::InvalidOperation, err.to_string()))?;
    String::from_utf8(bytes).map_err(|err| Error::new(ErrorKind::InvalidOperation, err.to_string()))
}

/// Queries a live resource. An empty name lists the resources, a missing
/// object yields an empty mapping, and any other API failure aborts the
/// render. With no cluster connection every lookup yields an empty
/// mapping, which keeps dry-run rendering usable offline.
fn make_lookup(
    client: Option<kube::Client>,
) -> impl Fn(String, String, String, String) -> Result<Value, Error> + Send + Sync + 'static {
    move |api_version, kind, namespace, name| {
        let Some(client) = client.clone() else {
            return Ok(Value::from_serialize(&serde_json::Map::new()));
        };
        let found = tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(lookup_resource(
                client,
                &api_version,
                &kind,
                &namespace,
                &name,
            ))
        })
        .map_err(|err| Error::new(ErrorKind::InvalidOperation, err.to_string()))?;
        Ok(Value::from_serialize(&found))
    }
}

async fn lookup_resource(
    client: kube::Client,
    api_version: &str,
    kind: &str,
    namespace: &str,
    name: &str,
) -> anyhow::Result<serde_json::Value> {
    let (group, version) = match api_version.split_once('/') {
        Some((group, version)) => (group, version),
        None => ("", api_version),
    };
    let resource = ApiResource::from_gvk(&GroupVersionKind::gvk(group, version, kind));
    let api: Api<DynamicObject> = if namespace.is_empty() {
        Api::all_with(client, &resource)
    } else {
        Api::namespaced_with(client, namespace, &resource)
    };

    if name.is_empty() {
        let list = api.list(&Default::default()).await?;
        return Ok(serde_json::to_value(&list)?);
    }
    match api.get_opt(name).await? {
        Some(object) => Ok(serde_json::to_value(&object)?),
        None => Ok(serde_json::Value::Object(Default::default())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env() -> Environment<'static> {
        let mut env = Environment::new();
        register_helpers(&mut env, None);
        env
    }

    fn render(template: &str, context: Value) -> String {
        env()
            .template_from_str(template)
            .unwrap()
            .render(context)
            .unwrap()
    }

    #[test]
    fn yaml_round_trip_strips_trailing_newline() {
        let context = Value::from_serialize(&BTreeMap::from([("a", vec![1, 2])]));
        assert_eq!(render("{{ toYaml(a) }}", context), "- 1\n- 2");
    }

    #[test]
    fn from_yaml_reports_errors_inline() {
        let out = render("{{ fromYaml(\"{ bad\").Error is defined }}", Value::UNDEFINED);
        assert_eq!(out, "true");
    }

    #[test]
    fn required_fails_on_missing_value() {
        let err = env()
            .template_from_str("{{ required(\"settings.url\", none) }}")
            .unwrap()
            .render(Value::UNDEFINED)
            .unwrap_err();
        assert!(err.to_string().contains("settings.url"));
    }

    #[test]
    fn lookup_without_cluster_yields_empty_mapping() {
        let out = render(
            "{{ lookup(\"v1\", \"Namespace\", \"\", \"default\") | length }}",
            Value::UNDEFINED,
        );
        assert_eq!(out, "0");
    }

    #[test]
    fn quote_and_base64_filters() {
        assert_eq!(render("{{ \"a b\" | quote }}", Value::UNDEFINED), "\"a b\"");
        assert_eq!(render("{{ \"hi\" | b64enc }}", Value::UNDEFINED), "aGk=");
        assert_eq!(render("{{ \"aGk=\" | b64dec }}", Value::UNDEFINED), "hi");
    }
}
