use std::sync::Arc;

use flotilla_chart_fs::{Chart, ChartCollection};
use flotilla_config::Config;
use tracing::debug;

use crate::error::ResolverError;
use crate::topology::{Dependency, Topology};

/// Resolves the chart collection into a deployment topology.
///
/// Resolution runs in two phases. Phase A walks the configured products in
/// declaration order and pulls in each enabled product's chart with its
/// dependencies. Phase B appends every remaining chart, iterating the
/// collection alphabetically. Both phases order sibling tiers by descending
/// weight with a stable sort, so equal weights keep the underlying order:
/// declaration order for `depends-on` lists, alphabetical for collection
/// walks.
pub struct Resolver<'a> {
    config: &'a Config,
    collection: &'a ChartCollection,
    installer_namespace: &'a str,
}

impl<'a> Resolver<'a> {
    pub fn new(
        config: &'a Config,
        collection: &'a ChartCollection,
        installer_namespace: &'a str,
    ) -> Self {
        Self {
            config,
            collection,
            installer_namespace,
        }
    }

    pub fn resolve(&self) -> Result<Topology, ResolverError> {
        let mut topology = Topology::new();

        // Phase A: enabled products, in configuration order.
        for product in self.config.enabled_products() {
            let chart = self
                .collection
                .product_chart(&product.name)
                .ok_or_else(|| ResolverError::ProductChartNotFound(product.name.clone()))?;
            debug!(product = %product.name, chart = %chart.name(), "resolving product");
            self.visit(chart, &mut topology, &mut Vec::new())?;
        }

        // Phase B: everything else, highest weight first within the tier.
        let mut remaining: Vec<&Arc<Chart>> = self
            .collection
            .walk()
            .filter(|chart| !topology.contains(chart.name()))
            .collect();
        self.sort_tier(&mut remaining)?;
        for chart in remaining {
            self.visit(chart, &mut topology, &mut Vec::new())?;
        }

        Ok(topology)
    }

    fn visit(
        &self,
        chart: &Arc<Chart>,
        topology: &mut Topology,
        visiting: &mut Vec<String>,
    ) -> Result<(), ResolverError> {
        if topology.contains(chart.name()) {
            return Ok(());
        }
        if visiting.iter().any(|name| name == chart.name()) {
            let mut path = visiting.clone();
            path.push(chart.name().to_owned());
            return Err(ResolverError::CircularDependency { path });
        }
        visiting.push(chart.name().to_owned());

        let prefix = self.collection.annotation_prefix();
        let mut children = Vec::new();
        for dep_name in chart.depends_on(prefix) {
            let dep = self
                .collection
                .get(dep_name)
                .ok_or_else(|| ResolverError::ChartNotFound {
                    name: dep_name.to_owned(),
                    referer: chart.name().to_owned(),
                })?;
            children.push(dep);
        }
        self.sort_tier(&mut children)?;
        for child in children {
            self.visit(child, topology, visiting)?;
        }

        visiting.pop();
        topology.append(Dependency::new(chart.clone(), self.namespace_for(chart)));
        Ok(())
    }

    /// Stable descending-weight sort; ties keep the incoming order.
    fn sort_tier(&self, tier: &mut Vec<&'a Arc<Chart>>) -> Result<(), ResolverError> {
        let prefix = self.collection.annotation_prefix();
        let mut keyed = Vec::with_capacity(tier.len());
        for chart in tier.iter() {
            keyed.push((chart_weight(chart, prefix)?, *chart));
        }
        keyed.sort_by_key(|(weight, _)| std::cmp::Reverse(*weight));
        *tier = keyed.into_iter().map(|(_, chart)| chart).collect();
        Ok(())
    }

    /// Three-tier namespace rule: a product chart deploys into its
    /// product's namespace, a chart aliased with `use-product-namespace`
    /// follows the referenced product, and everything else lands in the
    /// installer namespace.
    fn namespace_for(&self, chart: &Chart) -> String {
        let prefix = self.collection.annotation_prefix();
        for product_name in [
            chart.product_name(prefix),
            chart.use_product_namespace(prefix),
        ]
        .into_iter()
        .flatten()
        {
            if let Ok(product) = self.config.product(product_name) {
                return product.namespace_or(self.installer_namespace).to_owned();
            }
        }
        self.installer_namespace.to_owned()
    }
}

/// Parses the weight annotation. Absent and empty values mean 0; anything
/// that is not a signed integer is an error naming the offending value.
pub fn chart_weight(chart: &Chart, prefix: &str) -> Result<i64, ResolverError> {
    match chart.weight(prefix) {
        None => Ok(0),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ResolverError::MalformedWeight {
                chart: chart.name().to_owned(),
                value: raw.to_owned(),
            }),
    }
}
