use std::collections::BTreeMap;

use flotilla_chart_fs::{Chart, ChartCollection, ChartManifest};
use flotilla_config::Config;

pub const PREFIX: &str = "flotilla.dev";
pub const INSTALLER_NAMESPACE: &str = "sys";

pub fn chart(name: &str, annotations: &[(&str, &str)]) -> Chart {
    let manifest = ChartManifest {
        name: name.to_owned(),
        version: Some("0.1.0".to_owned()),
        description: None,
        annotations: annotations
            .iter()
            .map(|(key, value)| (format!("{PREFIX}/{key}"), value.to_string()))
            .collect(),
    };
    Chart::new(manifest, format!("charts/{name}"), BTreeMap::new())
}

pub fn collection(charts: Vec<Chart>) -> ChartCollection {
    ChartCollection::from_charts(PREFIX, charts).unwrap()
}

pub fn config(yaml: &str) -> Config {
    Config::from_yaml(yaml, INSTALLER_NAMESPACE).unwrap()
}

pub fn empty_config() -> Config {
    config("settings: {}\nproducts: []\n")
}
