use std::collections::BTreeMap;
use std::sync::Arc;

use crate::chart::{CHART_MANIFEST, Chart, ChartManifest};
use crate::error::CollectionError;
use crate::overlay::ChartFs;

pub const CHARTS_ROOT: &str = "charts";

/// All charts reachable under `charts/`, indexed by chart name and by the
/// product they are bound to. Iteration order is alphabetical by chart name.
#[derive(Debug)]
pub struct ChartCollection {
    prefix: String,
    by_name: BTreeMap<String, Arc<Chart>>,
    by_product: BTreeMap<String, Arc<Chart>>,
}

impl ChartCollection {
    /// Builds the collection from already-loaded charts.
    pub fn from_charts(
        annotation_prefix: &str,
        charts: Vec<Chart>,
    ) -> Result<Self, CollectionError> {
        let mut collection = Self {
            prefix: annotation_prefix.to_owned(),
            by_name: BTreeMap::new(),
            by_product: BTreeMap::new(),
        };
        for chart in charts {
            collection.admit(chart)?;
        }
        Ok(collection)
    }

    /// Walks `charts/` admitting any directory that contains a Chart.yaml.
    /// Admitted directories are not descended into, so subcharts stay part
    /// of their parent.
    pub fn load(fs: &ChartFs, annotation_prefix: &str) -> Result<Self, CollectionError> {
        let mut charts = Vec::new();
        if fs.is_dir(CHARTS_ROOT) {
            walk_dir(fs, CHARTS_ROOT, &mut charts)?;
        }
        Self::from_charts(annotation_prefix, charts)
    }

    fn admit(&mut self, chart: Chart) -> Result<(), CollectionError> {
        let chart = Arc::new(chart);
        if let Some(product) = chart.product_name(&self.prefix) {
            if let Some(existing) = self.by_product.get(product) {
                return Err(CollectionError::DuplicateProductChart {
                    product: product.to_owned(),
                    first: existing.name().to_owned(),
                    second: chart.name().to_owned(),
                });
            }
            self.by_product.insert(product.to_owned(), chart.clone());
        }
        if self
            .by_name
            .insert(chart.name().to_owned(), chart.clone())
            .is_some()
        {
            return Err(CollectionError::DuplicateChartName(chart.name().to_owned()));
        }
        Ok(())
    }

    pub fn annotation_prefix(&self) -> &str {
        &self.prefix
    }

    pub fn get(&self, name: &str) -> Option<&Arc<Chart>> {
        self.by_name.get(name)
    }

    pub fn product_chart(&self, product: &str) -> Option<&Arc<Chart>> {
        self.by_product.get(product)
    }

    /// The product whose chart declares `integration` as provided, if any.
    pub fn product_providing_integration(&self, integration: &str) -> Option<&str> {
        self.walk()
            .find(|chart| {
                chart
                    .integrations_provided(&self.prefix)
                    .contains(&integration)
            })
            .and_then(|chart| chart.product_name(&self.prefix))
    }

    /// Deterministic walk over all charts, alphabetical by chart name.
    pub fn walk(&self) -> impl Iterator<Item = &Arc<Chart>> {
        self.by_name.values()
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

fn walk_dir(fs: &ChartFs, dir: &str, charts: &mut Vec<Chart>) -> Result<(), CollectionError> {
    if fs.exists(&format!("{dir}/{CHART_MANIFEST}")) {
        charts.push(load_chart(fs, dir)?);
        return Ok(());
    }
    for entry in fs.read_dir(dir)? {
        if entry.is_dir {
            walk_dir(fs, &format!("{dir}/{}", entry.name), charts)?;
        }
    }
    Ok(())
}

fn load_chart(fs: &ChartFs, dir: &str) -> Result<Chart, CollectionError> {
    let manifest_path = format!("{dir}/{CHART_MANIFEST}");
    let manifest: ChartManifest = serde_yaml::from_str(&fs.read_to_string(&manifest_path)?)
        .map_err(|err| CollectionError::ChartParse(manifest_path.clone(), err))?;
    if manifest.name.is_empty() {
        return Err(CollectionError::UnnamedChart(dir.to_owned()));
    }

    let mut files = BTreeMap::new();
    collect_files(fs, dir, "", &mut files)?;
    Ok(Chart::new(manifest, dir.to_owned(), files))
}

fn collect_files(
    fs: &ChartFs,
    chart_dir: &str,
    rel: &str,
    files: &mut BTreeMap<String, Vec<u8>>,
) -> Result<(), CollectionError> {
    let dir = if rel.is_empty() {
        chart_dir.to_owned()
    } else {
        format!("{chart_dir}/{rel}")
    };
    for entry in fs.read_dir(&dir)? {
        let child_rel = if rel.is_empty() {
            entry.name.clone()
        } else {
            format!("{rel}/{}", entry.name)
        };
        if entry.is_dir {
            collect_files(fs, chart_dir, &child_rel, files)?;
        } else {
            let data = fs.read(&format!("{chart_dir}/{child_rel}"))?;
            files.insert(child_rel, data);
        }
    }
    Ok(())
}
