//! Dependency cost engine.
//!
//! Computes a package's size in MB, optionally including its transitive
//! dependency graph. Traversal is memoized per query and keyed by package
//! id, which also terminates dependency cycles: a node already visited is
//! never re-fetched. Nodes resolve internally first; nodes the registry
//! does not hold may resolve from the upstream registry when the
//! configuration allows it. Standalone sizes persist in the size cache
//! (package archives are immutable, so sizes never go stale).

use crate::Result;
use crate::archive::Archive;
use crate::config::{CostAccounting, RegistryConfig};
use crate::error::RegistryError;
use crate::facts::{SourceRegistry, registry};
use crate::ident::PackageId;
use crate::model::{CostRecord, PackageRecord};
use crate::store::{BlobStore, MetadataStore};
use semver::Version;
use std::collections::{BTreeMap, HashMap, HashSet};

const LOG_TARGET: &str = "      cost";

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// One resolved node in a cost query's dependency graph.
#[derive(Debug, Clone)]
struct GraphNode {
    standalone_mb: f64,
    children: Vec<PackageId>,
}

/// Where a dependency's bytes live.
enum Located {
    Internal(PackageRecord),
    External { name: String, version: Version },
}

/// Computes standalone and total package costs over the injected stores.
#[derive(Debug)]
pub struct CostEngine<'a, M, B, R> {
    metadata: &'a M,
    blobs: &'a B,
    registry: &'a R,
    config: &'a RegistryConfig,
}

impl<'a, M: MetadataStore, B: BlobStore, R: SourceRegistry> CostEngine<'a, M, B, R> {
    #[must_use]
    pub const fn new(metadata: &'a M, blobs: &'a B, registry: &'a R, config: &'a RegistryConfig) -> Self {
        Self {
            metadata,
            blobs,
            registry,
            config,
        }
    }

    /// Cost of one package, keyed by package id.
    ///
    /// Without dependencies the map holds only the root, with total equal
    /// to standalone. With dependencies it holds every node visited. The
    /// root must exist in the internal registry either way.
    pub async fn cost(&self, id: &PackageId, with_dependencies: bool) -> Result<BTreeMap<PackageId, CostRecord>> {
        let root = self
            .metadata
            .package(id)?
            .ok_or_else(|| RegistryError::not_found(format!("package {id} not found")))?;

        let (standalone, dependencies) = self.load_internal(&root).await?;

        if !with_dependencies {
            return Ok(BTreeMap::from([(
                id.clone(),
                CostRecord {
                    standalone_cost: standalone,
                    total_cost: standalone,
                }
                .rounded(self.config.cost_decimal_places),
            )]));
        }

        let graph = self.collect_graph(id.clone(), standalone, dependencies).await?;

        let totals = match self.config.cost_accounting {
            CostAccounting::PerEdge => per_edge_totals(&graph),
            CostAccounting::PerUniqueNode => per_unique_node_totals(&graph),
        };

        // Totals depend on the accounting mode and on which published
        // versions satisfy each range, so only standalone sizes are cached.
        let mut out = BTreeMap::new();
        for (node_id, node) in &graph {
            let record = CostRecord {
                standalone_cost: node.standalone_mb,
                total_cost: totals.get(node_id).copied().unwrap_or(node.standalone_mb),
            };
            let _ = out.insert(node_id.clone(), record.rounded(self.config.cost_decimal_places));
        }

        log::debug!(target: LOG_TARGET, "Cost query for {id} visited {} nodes", out.len());
        Ok(out)
    }

    /// Depth-first worklist collection; each node is fetched exactly once.
    async fn collect_graph(
        &self,
        root_id: PackageId,
        root_standalone: f64,
        root_deps: BTreeMap<String, String>,
    ) -> Result<BTreeMap<PackageId, GraphNode>> {
        let mut graph: BTreeMap<PackageId, GraphNode> = BTreeMap::new();
        let mut pending = vec![(root_id, root_standalone, root_deps)];

        while let Some((node_id, standalone_mb, dependencies)) = pending.pop() {
            if graph.contains_key(&node_id) {
                continue;
            }
            let _ = graph.insert(
                node_id.clone(),
                GraphNode {
                    standalone_mb,
                    children: Vec::new(),
                },
            );

            let mut children = Vec::new();
            for (dep_name, range) in &dependencies {
                let (child_id, located) = self.locate(dep_name, range).await?;
                children.push(child_id.clone());

                let queued = graph.contains_key(&child_id) || pending.iter().any(|(id, ..)| *id == child_id);
                if !queued {
                    let (child_standalone, child_deps) = self.load(located).await?;
                    pending.push((child_id, child_standalone, child_deps));
                }
            }

            if let Some(node) = graph.get_mut(&node_id) {
                node.children = children;
            }
        }

        Ok(graph)
    }

    /// Resolve a dependency range to a concrete package, preferring the
    /// internal registry.
    async fn locate(&self, name: &str, range: &str) -> Result<(PackageId, Located)> {
        let internal_versions = self.metadata.versions_of(name)?;
        if let Some(version) = registry::max_satisfying(&internal_versions, range) {
            let record = self
                .metadata
                .package_by_name_version(name, &version)?
                .ok_or_else(|| RegistryError::not_found(format!("package {name}@{version} disappeared during cost query")))?;
            return Ok((record.id.clone(), Located::Internal(record)));
        }

        if !self.config.allow_external_cost_resolution {
            return Err(RegistryError::not_found(format!(
                "dependency '{name}@{range}' is not in the registry and external resolution is disabled"
            )));
        }

        let packument = self
            .registry
            .packument(name)
            .await?
            .ok_or_else(|| RegistryError::not_found(format!("dependency '{name}' is not in the upstream registry")))?;
        let version = packument
            .max_satisfying(range)
            .ok_or_else(|| RegistryError::not_found(format!("no published version of '{name}' satisfies '{range}'")))?;

        Ok((
            PackageId::derive(name, &version),
            Located::External {
                name: name.to_string(),
                version,
            },
        ))
    }

    async fn load(&self, located: Located) -> Result<(f64, BTreeMap<String, String>)> {
        match located {
            Located::Internal(record) => self.load_internal(&record).await,
            Located::External { name, version } => self.load_external(&name, &version).await,
        }
    }

    /// Standalone size and dependency list of an internally stored package.
    async fn load_internal(&self, record: &PackageRecord) -> Result<(f64, BTreeMap<String, String>)> {
        let bytes = self.blobs.get(&record.id)?.ok_or_else(|| {
            RegistryError::upstream(format!("archive for package {} is missing from the blob store", record.id))
        })?;

        #[expect(clippy::cast_precision_loss, reason = "archive sizes fit comfortably in f64")]
        let standalone_mb = match self.metadata.cached_cost(&record.id, false)? {
            Some(cached) => cached.standalone_cost,
            None => {
                let mb = bytes.len() as f64 / BYTES_PER_MB;
                self.metadata.cache_cost(
                    &record.id,
                    false,
                    CostRecord {
                        standalone_cost: mb,
                        total_cost: mb,
                    },
                )?;
                mb
            }
        };

        let dependencies = Archive::new(bytes).manifest()?.map(|m| m.dependencies).unwrap_or_default();
        Ok((standalone_mb, dependencies))
    }

    /// Standalone size and dependency list of an upstream package, from its
    /// downloaded tarball.
    async fn load_external(&self, name: &str, version: &Version) -> Result<(f64, BTreeMap<String, String>)> {
        let id = PackageId::derive(name, version);

        let bytes = self.registry.download(name, version).await?;

        #[expect(clippy::cast_precision_loss, reason = "archive sizes fit comfortably in f64")]
        let standalone_mb = match self.metadata.cached_cost(&id, false)? {
            Some(cached) => cached.standalone_cost,
            None => {
                let mb = bytes.len() as f64 / BYTES_PER_MB;
                self.metadata.cache_cost(
                    &id,
                    false,
                    CostRecord {
                        standalone_cost: mb,
                        total_cost: mb,
                    },
                )?;
                mb
            }
        };

        let dependencies = Archive::new(bytes).manifest()?.map(|m| m.dependencies).unwrap_or_default();
        Ok((standalone_mb, dependencies))
    }
}

/// Per-edge totals: a node's total is its own size plus the memoized total
/// of each direct dependency. A dependency shared along two paths is
/// charged into its ancestor once per edge. On a cycle, the back edge
/// contributes the in-progress node's standalone size.
fn per_edge_totals(graph: &BTreeMap<PackageId, GraphNode>) -> HashMap<PackageId, f64> {
    let mut memo = HashMap::new();
    for id in graph.keys() {
        let _ = per_edge_total(id, graph, &mut memo);
    }
    memo
}

fn per_edge_total(id: &PackageId, graph: &BTreeMap<PackageId, GraphNode>, memo: &mut HashMap<PackageId, f64>) -> f64 {
    if let Some(&total) = memo.get(id) {
        return total;
    }
    let Some(node) = graph.get(id) else {
        return 0.0;
    };

    // Placeholder entry terminates cycles.
    let _ = memo.insert(id.clone(), node.standalone_mb);

    let mut total = node.standalone_mb;
    for child in &node.children {
        total += per_edge_total(child, graph, memo);
    }

    let _ = memo.insert(id.clone(), total);
    total
}

/// Per-unique-node totals: a node's total is the sum of standalone sizes
/// over its reachable set, itself included, no matter how many paths reach
/// a shared dependency.
fn per_unique_node_totals(graph: &BTreeMap<PackageId, GraphNode>) -> HashMap<PackageId, f64> {
    graph
        .keys()
        .map(|id| {
            let mut seen = HashSet::from([id]);
            let mut stack = vec![id];

            while let Some(current) = stack.pop() {
                if let Some(node) = graph.get(current) {
                    for child in &node.children {
                        if seen.insert(child) {
                            stack.push(child);
                        }
                    }
                }
            }

            let total = seen.iter().filter_map(|n| graph.get(n)).map(|n| n.standalone_mb).sum();
            (id.clone(), total)
        })
        .collect()
}
