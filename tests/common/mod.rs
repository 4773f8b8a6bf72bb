//! Shared doubles and fixtures for the integration tests.

#![allow(dead_code, reason = "each test binary uses a subset of the shared fixtures")]

use bytes::Bytes;
use flate2::Compression;
use flate2::write::GzEncoder;
use quay::Result;
use quay::config::RegistryConfig;
use quay::error::RegistryError;
use quay::facts::{Contributor, FactProvider, IssueSummary, Packument, RepoSpec, ReviewCoverage, SourceRegistry};
use quay::model::Manifest;
use quay::pipeline::Registry;
use quay::store::{MemoryBlobStore, MemoryMetadataStore};
use semver::Version;
use std::collections::HashMap;

pub type TestRegistry = Registry<MemoryMetadataStore, MemoryBlobStore, CannedFacts, CannedRegistry>;

pub fn registry(facts: CannedFacts, upstream: CannedRegistry, config: RegistryConfig) -> TestRegistry {
    let env = env_logger::Env::default().filter_or("RUST_LOG", "info");
    let _ = env_logger::Builder::from_env(env).is_test(true).try_init();

    Registry::new(MemoryMetadataStore::new(), MemoryBlobStore::new(), facts, upstream, config)
}

/// Build an in-memory gzipped tarball from `(path, contents)` pairs.
pub fn tarball(entries: &[(&str, &str)]) -> Bytes {
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

/// A tarball holding just a manifest with the given dependencies.
pub fn manifest_tarball(name: &str, version: &str, deps: &[(&str, &str)]) -> Bytes {
    let dep_json: Vec<String> = deps.iter().map(|(n, r)| format!(r#""{n}": "{r}""#)).collect();
    let manifest = format!(
        r#"{{"name": "{name}", "version": "{version}", "dependencies": {{{}}}}}"#,
        dep_json.join(", ")
    );
    tarball(&[("package/package.json", &manifest)])
}

/// Fact provider answering every question from canned values.
#[derive(Debug, Clone, Default)]
pub struct CannedFacts {
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

impl CannedFacts {
    /// Facts for a permissively licensed, actively maintained repository
    /// that comfortably clears the 0.5 admission threshold.
    pub fn healthy(archive: Bytes) -> Self {
        Self {
            license: Some("MIT".to_string()),
            issues: IssueSummary {
                open: 2,
                closed: 8,
                mean_close_days: Some(3.0),
            },
            pulls: IssueSummary {
                open: 0,
                closed: 5,
                mean_close_days: Some(2.0),
            },
            release_count: 4,
            recent_commits: 30,
            contributors: vec![
                Contributor {
                    login: "lead".to_string(),
                    commits: 80,
                },
                Contributor {
                    login: "other".to_string(),
                    commits: 80,
                },
            ],
            file_listing: vec![
                "README.md".to_string(),
                "docs/guide.md".to_string(),
                "src/index.js".to_string(),
                "test/index.test.js".to_string(),
            ],
            manifest: None,
            review_coverage: ReviewCoverage {
                reviewed_additions: 90,
                total_additions: 100,
            },
            archive,
        }
    }
}

impl FactProvider for CannedFacts {
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

/// Upstream registry answering from canned packuments and tarballs.
#[derive(Debug, Clone, Default)]
pub struct CannedRegistry {
    pub packuments: HashMap<String, Packument>,
    pub tarballs: HashMap<(String, Version), Bytes>,
}

impl CannedRegistry {
    pub fn with_packument(mut self, name: &str, json: &str) -> Self {
        let _ = self.packuments.insert(name.to_string(), serde_json::from_str(json).unwrap());
        self
    }

    pub fn with_tarball(mut self, name: &str, version: &str, bytes: Bytes) -> Self {
        let _ = self.tarballs.insert((name.to_string(), Version::parse(version).unwrap()), bytes);
        self
    }
}

impl SourceRegistry for CannedRegistry {
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
