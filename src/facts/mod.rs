//! Repository facts consumed by the scoring and cost engines.
//!
//! The fact provider is an external collaborator: the engines only see the
//! [`FactProvider`] trait and the plain data types here. The bundled
//! [`github::GithubFactProvider`] talks to the GitHub REST API; tests
//! substitute static doubles.

pub mod github;
pub mod registry;

mod repo_spec;

pub use github::GithubFactProvider;
pub use registry::{HttpSourceRegistry, Packument, SourceRegistry};
pub use repo_spec::RepoSpec;

use crate::Result;
use crate::model::Manifest;
use bytes::Bytes;

/// Open/closed issue counts with the mean time-to-close of resolved items.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct IssueSummary {
    pub open: u64,
    pub closed: u64,

    /// Mean days from open to close across resolved items; `None` when
    /// nothing has ever been resolved.
    pub mean_close_days: Option<f64>,
}

/// Commit counts per collaborator, ordered by the provider however it
/// likes; consumers sort as needed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contributor {
    pub login: String,
    pub commits: u64,
}

/// Added-line counts across a sample of recently merged pull requests,
/// split by whether the pull request received any review.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReviewCoverage {
    pub reviewed_additions: u64,
    pub total_additions: u64,
}

/// Source of repository facts for one resolved source location.
///
/// Every method may fail independently; the scoring engine recovers each
/// failure locally to the owning metric's sentinel value.
#[allow(async_fn_in_trait, reason = "consumed through generics, never through dyn")]
pub trait FactProvider: Send + Sync {
    /// The repository's declared license expression, if any.
    async fn license(&self, repo: &RepoSpec) -> Result<Option<String>>;

    /// Issue history (pull requests excluded).
    async fn issues(&self, repo: &RepoSpec) -> Result<IssueSummary>;

    /// Pull-request history.
    async fn pulls(&self, repo: &RepoSpec) -> Result<IssueSummary>;

    /// Number of published releases.
    async fn release_count(&self, repo: &RepoSpec) -> Result<u64>;

    /// Commits pushed in the last 30 days.
    async fn recent_commits(&self, repo: &RepoSpec) -> Result<u64>;

    /// Collaborators with their commit counts.
    async fn contributors(&self, repo: &RepoSpec) -> Result<Vec<Contributor>>;

    /// Paths of every file in the repository's default branch.
    async fn file_listing(&self, repo: &RepoSpec) -> Result<Vec<String>>;

    /// The package manifest at the repository root, if one exists.
    async fn manifest(&self, repo: &RepoSpec) -> Result<Option<Manifest>>;

    /// Review coverage over at most `sample` recently merged pull requests.
    async fn review_coverage(&self, repo: &RepoSpec, sample: usize) -> Result<ReviewCoverage>;

    /// The repository's default-branch contents as a gzipped tarball.
    async fn archive(&self, repo: &RepoSpec) -> Result<Bytes>;
}
