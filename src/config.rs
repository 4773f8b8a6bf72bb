//! Registry configuration.
//!
//! All knobs have defaults matching the behavior the registry shipped with;
//! deployments override them through a TOML document.

use crate::Result;
use crate::error::UpstreamContext;
use serde::{Deserialize, Serialize};
use url::Url;

/// How an ancestor's total cost accounts for dependencies shared along
/// multiple paths (diamonds).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CostAccounting {
    /// A shared dependency is charged once per edge that reaches it. An
    /// ancestor above a diamond therefore counts the shared node twice,
    /// although the node still appears only once in the output map.
    #[default]
    PerEdge,

    /// A shared dependency is charged once per unique node reachable from
    /// the ancestor, regardless of how many paths lead to it.
    PerUniqueNode,
}

/// Default NetScore admission threshold.
const fn default_score_threshold() -> f64 {
    0.5
}

/// The quality gate historically applied only to URL-sourced packages;
/// archive uploads were scored but never rejected. Kept as an explicit
/// switch pending product clarification.
const fn default_gate_only_for_url_source() -> bool {
    true
}

const fn default_cost_decimal_places() -> u32 {
    2
}

const fn default_allow_external_cost_resolution() -> bool {
    true
}

fn default_program_runtime() -> String {
    "node".to_string()
}

const fn default_program_timeout_secs() -> u64 {
    5
}

const fn default_merged_pr_sample() -> usize {
    500
}

fn default_registry_base_url() -> Url {
    Url::parse("https://registry.npmjs.org").expect("default registry URL is valid")
}

/// Tunable behavior of the registry core.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct RegistryConfig {
    /// NetScore below this value aborts ingestion with a quality-gate error.
    pub score_threshold: f64,

    /// When `true`, only URL-sourced packages are subject to the quality
    /// gate; archive uploads are scored and recorded but never rejected.
    pub gate_only_for_url_source: bool,

    /// Diamond-dependency accounting policy for total cost.
    pub cost_accounting: CostAccounting,

    /// Number of decimal places costs are rounded to before being returned.
    pub cost_decimal_places: u32,

    /// Whether cost queries may resolve missing dependencies from the public
    /// registry. The root of a query must always exist internally.
    pub allow_external_cost_resolution: bool,

    /// Executable used to run attached retrieval programs.
    pub program_runtime: String,

    /// Wall-clock budget for a retrieval program, in seconds.
    pub program_timeout_secs: u64,

    /// Maximum number of recent merged pull requests sampled by the
    /// review-coverage metric.
    pub merged_pr_sample: usize,

    /// Base URL of the public package registry used for source resolution
    /// and external cost lookups.
    pub registry_base_url: Url,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            score_threshold: default_score_threshold(),
            gate_only_for_url_source: default_gate_only_for_url_source(),
            cost_accounting: CostAccounting::default(),
            cost_decimal_places: default_cost_decimal_places(),
            allow_external_cost_resolution: default_allow_external_cost_resolution(),
            program_runtime: default_program_runtime(),
            program_timeout_secs: default_program_timeout_secs(),
            merged_pr_sample: default_merged_pr_sample(),
            registry_base_url: default_registry_base_url(),
        }
    }
}

impl RegistryConfig {
    /// Parse a configuration from a TOML document, filling in defaults for
    /// missing fields.
    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).upstream_with(|| "could not parse registry configuration".to_string())
    }
}
