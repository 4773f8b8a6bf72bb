//! Shared fixtures for unit and integration tests.

use crate::Result;
use crate::error::RegistryError;
use crate::facts::{Contributor, FactProvider, IssueSummary, Packument, RepoSpec, ReviewCoverage, SourceRegistry};
use crate::model::Manifest;
use bytes::Bytes;
use flate2::Compression;
use flate2::write::GzEncoder;
use semver::Version;
use std::collections::HashMap;

/// Build an in-memory gzipped tarball from `(path, contents)` pairs.
pub(crate) fn build_tarball(entries: &[(&str, &str)]) -> Bytes {
    let mut builder = tar::Builder::new(GzEncoder::new(Vec::new(), Compression::default()));

    for (path, contents) in entries {
        let mut header = tar::Header::new_gnu();
        header.set_size(contents.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder.append_data(&mut header, path, contents.as_bytes()).unwrap();
    }

    Bytes::from(builder.into_inner().unwrap().finish().unwrap())
}

/// Fact provider that answers every question from canned values.
#[derive(Debug, Clone, Default)]
pub(crate) struct StaticFacts {
    pub license: Option<String>,
    pub issues: IssueSummary,
    pub pulls: IssueSummary,
    pub release_count: u64,
    pub recent_commits: u64,
    pub contributors: Vec<Contributor>,
    pub file_listing: Vec<String>,
    pub manifest: Option<Manifest>,
    pub review_coverage: ReviewCoverage,
    pub archive: Bytes,
}

impl FactProvider for StaticFacts {
    async fn license(&self, _repo: &RepoSpec) -> Result<Option<String>> {
        Ok(self.license.clone())
    }

    async fn issues(&self, _repo: &RepoSpec) -> Result<IssueSummary> {
        Ok(self.issues)
    }

    async fn pulls(&self, _repo: &RepoSpec) -> Result<IssueSummary> {
        Ok(self.pulls)
    }

    async fn release_count(&self, _repo: &RepoSpec) -> Result<u64> {
        Ok(self.release_count)
    }

    async fn recent_commits(&self, _repo: &RepoSpec) -> Result<u64> {
        Ok(self.recent_commits)
    }

    async fn contributors(&self, _repo: &RepoSpec) -> Result<Vec<Contributor>> {
        Ok(self.contributors.clone())
    }

    async fn file_listing(&self, _repo: &RepoSpec) -> Result<Vec<String>> {
        Ok(self.file_listing.clone())
    }

    async fn manifest(&self, _repo: &RepoSpec) -> Result<Option<Manifest>> {
        Ok(self.manifest.clone())
    }

    async fn review_coverage(&self, _repo: &RepoSpec, _sample: usize) -> Result<ReviewCoverage> {
        Ok(self.review_coverage)
    }

    async fn archive(&self, _repo: &RepoSpec) -> Result<Bytes> {
        Ok(self.archive.clone())
    }
}

/// Fact provider whose every question fails, for exercising per-metric
/// failure recovery.
#[derive(Debug, Clone, Default)]
pub(crate) struct FailingFacts;

impl FailingFacts {
    fn err<T>() -> Result<T> {
        Err(RegistryError::upstream("fact source unavailable"))
    }
}

impl FactProvider for FailingFacts {
    async fn license(&self, _repo: &RepoSpec) -> Result<Option<String>> {
        Self::err()
    }

    async fn issues(&self, _repo: &RepoSpec) -> Result<IssueSummary> {
        Self::err()
    }

    async fn pulls(&self, _repo: &RepoSpec) -> Result<IssueSummary> {
        Self::err()
    }

    async fn release_count(&self, _repo: &RepoSpec) -> Result<u64> {
        Self::err()
    }

    async fn recent_commits(&self, _repo: &RepoSpec) -> Result<u64> {
        Self::err()
    }

    async fn contributors(&self, _repo: &RepoSpec) -> Result<Vec<Contributor>> {
        Self::err()
    }

    async fn file_listing(&self, _repo: &RepoSpec) -> Result<Vec<String>> {
        Self::err()
    }

    async fn manifest(&self, _repo: &RepoSpec) -> Result<Option<Manifest>> {
        Self::err()
    }

    async fn review_coverage(&self, _repo: &RepoSpec, _sample: usize) -> Result<ReviewCoverage> {
        Self::err()
    }

    async fn archive(&self, _repo: &RepoSpec) -> Result<Bytes> {
        Self::err()
    }
}

/// Upstream registry answering from canned packuments and tarballs.
#[derive(Debug, Clone, Default)]
pub(crate) struct StaticRegistry {
    pub packuments: HashMap<String, Packument>,
    pub tarballs: HashMap<(String, Version), Bytes>,
}

impl SourceRegistry for StaticRegistry {
    async fn packument(&self, name: &str) -> Result<Option<Packument>> {
        Ok(self.packuments.get(name).cloned())
    }

    async fn download(&self, name: &str, version: &Version) -> Result<Bytes> {
        self.tarballs
            .get(&(name.to_string(), version.clone()))
            .cloned()
            .ok_or_else(|| RegistryError::not_found(format!("no tarball for {name}@{version}")))
    }
}
