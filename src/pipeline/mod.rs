//! Ingestion, update, and retrieval pipeline.
//!
//! One [`Registry`] instance owns the injected store, fact-provider, and
//! upstream-registry handles and drives the ingestion state machine:
//! validate input, resolve the source, extract the manifest, apply the
//! quality gate, persist, record history. A failure at any stage aborts
//! with nothing persisted; the metadata store stays authoritative for
//! package existence, so an orphaned blob from a partial persist is
//! garbage, not corruption.

mod sandbox;
mod source;

use crate::Result;
use crate::archive::{Archive, debloat};
use crate::config::RegistryConfig;
use crate::cost::CostEngine;
use crate::error::RegistryError;
use crate::facts::{FactProvider, RepoSpec, SourceRegistry};
use crate::ident::{PackageId, version_compatible};
use crate::model::{CostRecord, HistoryAction, HistoryEntry, Manifest, PackageRecord, PackageSource, QualityRating, SourceKind, encode_content};
use crate::scoring::{ScoreEngine, check_gate};
use crate::store::{BlobStore, MetadataStore};
use bytes::Bytes;
use chrono::Utc;
use semver::Version;
use std::collections::BTreeMap;
use url::Url;

const LOG_TARGET: &str = "  pipeline";

/// Wire shape of an ingestion request.
#[derive(Debug, Clone, Default)]
pub struct IngestRequest {
    /// Base64 gzipped tarball, for archive-sourced packages.
    pub content: Option<String>,

    /// Source-hosting or public-registry URL, for URL-sourced packages.
    pub url: Option<String>,

    /// Strip script comments, blank lines, and source maps before storing.
    pub debloat: bool,

    /// Program executed at retrieval time; a non-zero exit rejects the
    /// download.
    pub js_program: Option<String>,

    /// Overrides the manifest's package name.
    pub custom_name: Option<String>,
}

/// Wire shape of an update request. The id of the package being updated
/// arrives separately.
#[derive(Debug, Clone, Default)]
pub struct UpdateRequest {
    pub name: String,
    pub version: String,
    pub content: Option<String>,
    pub url: Option<String>,
    pub debloat: bool,
    pub js_program: Option<String>,
}

/// What ingestion hands back: the committed identity plus the stored bytes,
/// echoed in wire encoding.
#[derive(Debug, Clone)]
pub struct IngestReceipt {
    pub id: PackageId,
    pub name: String,
    pub version: Version,
    pub data: String,
}

/// A retrieved package: its committed record and the stored bytes in wire
/// encoding.
#[derive(Debug, Clone)]
pub struct RetrievedPackage {
    pub record: PackageRecord,
    pub content: String,
}

/// A package source resolved down to concrete bytes and identity.
struct Resolved {
    name: String,
    version: Version,
    bytes: Bytes,
    repo: Option<RepoSpec>,
    source_kind: SourceKind,
    source_url: Option<Url>,
}

/// The registry core. All operations flow through one of these; it owns
/// its store and provider handles outright, so tests substitute doubles by
/// construction rather than by patching globals.
#[derive(Debug)]
pub struct Registry<M, B, F, R> {
    metadata: M,
    blobs: B,
    facts: F,
    upstream: R,
    config: RegistryConfig,
}

impl<M, B, F, R> Registry<M, B, F, R>
where
    M: MetadataStore,
    B: BlobStore,
    F: FactProvider,
    R: SourceRegistry,
{
    pub const fn new(metadata: M, blobs: B, facts: F, upstream: R, config: RegistryConfig) -> Self {
        Self {
            metadata,
            blobs,
            facts,
            upstream,
            config,
        }
    }

    #[must_use]
    pub const fn metadata(&self) -> &M {
        &self.metadata
    }

    #[must_use]
    pub const fn blobs(&self) -> &B {
        &self.blobs
    }

    /// Ingest a new package from an inline archive or a source URL.
    pub async fn ingest(&self, principal: &str, request: IngestRequest) -> Result<IngestReceipt> {
        let source = PackageSource::from_parts(request.content.as_deref(), request.url.as_deref())?;
        let resolved = self.resolve(source, request.custom_name.as_deref()).await?;

        if self.metadata.package_by_name_version(&resolved.name, &resolved.version)?.is_some() {
            return Err(RegistryError::conflict(format!(
                "package {}@{} already exists",
                resolved.name, resolved.version
            )));
        }

        let rating = self.score(resolved.repo.as_ref()).await;
        if self.gate_applies(resolved.source_kind) {
            check_gate(&rating, self.config.score_threshold)?;
        }

        let record = self
            .persist(&resolved, &rating, request.debloat, request.js_program.clone())
            .await?;
        self.metadata
            .append_history(&HistoryEntry::now(record.id.clone(), principal, HistoryAction::Create))?;

        log::info!(target: LOG_TARGET, "Ingested {}@{} as {}", record.name, record.version, record.id);

        let data = self.blobs.get(&record.id)?.map(|b| encode_content(&b)).unwrap_or_default();
        Ok(IngestReceipt {
            id: record.id,
            name: record.name,
            version: record.version,
            data,
        })
    }

    /// Update a package to a new version. The new version becomes a new
    /// package record, whose id is returned; the prior record is untouched.
    pub async fn update(&self, principal: &str, id: &PackageId, request: UpdateRequest) -> Result<PackageId> {
        let existing = self
            .metadata
            .package(id)?
            .ok_or_else(|| RegistryError::not_found(format!("package {id} not found")))?;

        if request.name != existing.name {
            return Err(RegistryError::invalid(format!(
                "update names '{}' but package {id} is '{}'",
                request.name, existing.name
            )));
        }

        let source = PackageSource::from_parts(request.content.as_deref(), request.url.as_deref())?;
        if source.kind() != existing.source_kind {
            return Err(RegistryError::invalid(
                "update must supply the same kind of source the package was created with",
            ));
        }

        let new_version = Version::parse(&request.version)
            .map_err(|e| RegistryError::invalid(format!("malformed version '{}': {e}", request.version)))?;

        if new_version == existing.version || self.metadata.package_by_name_version(&existing.name, &new_version)?.is_some() {
            return Err(RegistryError::conflict(format!(
                "package {}@{new_version} already exists",
                existing.name
            )));
        }

        if !version_compatible(&new_version, &existing.version) {
            return Err(RegistryError::invalid(format!(
                "version {new_version} is older than the existing {}",
                existing.version
            )));
        }

        // Identity comes from the request; the resolved manifest only feeds
        // scoring and dependency data.
        let mut resolved = self.resolve(source, Some(&existing.name)).await?;
        resolved.version = new_version;

        let rating = self.score(resolved.repo.as_ref()).await;
        if self.gate_applies(resolved.source_kind) {
            check_gate(&rating, self.config.score_threshold)?;
        }

        let record = self
            .persist(&resolved, &rating, request.debloat, request.js_program.clone())
            .await?;

        self.metadata
            .append_history(&HistoryEntry::now(id.clone(), principal, HistoryAction::Update))?;
        self.metadata
            .append_history(&HistoryEntry::now(record.id.clone(), principal, HistoryAction::Create))?;

        log::info!(target: LOG_TARGET, "Updated {} to {}@{} as {}", id, record.name, record.version, record.id);
        Ok(record.id)
    }

    /// Retrieve a package's record and stored bytes, running its attached
    /// retrieval program first if it has one.
    pub async fn retrieve(&self, principal: &str, id: &PackageId) -> Result<RetrievedPackage> {
        let record = self
            .metadata
            .package(id)?
            .ok_or_else(|| RegistryError::not_found(format!("package {id} not found")))?;

        let bytes = self
            .blobs
            .get(id)?
            .ok_or_else(|| RegistryError::upstream(format!("archive for package {id} is missing from the blob store")))?;

        if let Some(program) = &record.js_program {
            sandbox::run_program(&self.config, program, &record).await?;
        }

        self.metadata
            .append_history(&HistoryEntry::now(id.clone(), principal, HistoryAction::Download))?;

        Ok(RetrievedPackage {
            record,
            content: encode_content(&bytes),
        })
    }

    /// A package's stored quality rating.
    pub fn rating(&self, id: &PackageId) -> Result<QualityRating> {
        self.metadata
            .rating(id)?
            .ok_or_else(|| RegistryError::not_found(format!("no rating exists for package {id}")))
    }

    /// A package's cost, optionally over its transitive dependency graph.
    pub async fn cost(&self, id: &PackageId, with_dependencies: bool) -> Result<BTreeMap<PackageId, CostRecord>> {
        CostEngine::new(&self.metadata, &self.blobs, &self.upstream, &self.config)
            .cost(id, with_dependencies)
            .await
    }

    /// A package's history, oldest first. History survives deletion.
    pub fn history(&self, id: &PackageId) -> Result<Vec<HistoryEntry>> {
        self.metadata.history(id)
    }

    /// Delete one package. Its history is retained.
    pub fn delete(&self, id: &PackageId) -> Result<()> {
        if !self.metadata.delete_package(id)? {
            return Err(RegistryError::not_found(format!("package {id} not found")));
        }
        let _ = self.blobs.delete(id)?;
        log::info!(target: LOG_TARGET, "Deleted package {id}");
        Ok(())
    }

    /// Drop every package, rating, history entry, and archive.
    pub fn reset(&self) -> Result<()> {
        self.metadata.reset()?;
        self.blobs.reset()?;
        log::info!(target: LOG_TARGET, "Registry reset");
        Ok(())
    }

    /// Resolve a source down to bytes, identity, and the repository that
    /// will be scored.
    async fn resolve(&self, source: PackageSource, custom_name: Option<&str>) -> Result<Resolved> {
        match source {
            PackageSource::Archive(bytes) => {
                let manifest = Archive::new(bytes.clone()).manifest()?.unwrap_or_default();

                let name = custom_name
                    .map(ToString::to_string)
                    .or_else(|| manifest.name.clone())
                    .ok_or_else(|| RegistryError::invalid("archive manifest names no package and no name was supplied"))?;

                let repo = repo_from_manifest(&manifest);
                Ok(Resolved {
                    name,
                    version: manifest.effective_version(),
                    bytes,
                    repo,
                    source_kind: SourceKind::Archive,
                    source_url: None,
                })
            }
            PackageSource::Remote(url) => {
                let repo = source::resolve_source(&url, &self.upstream).await?;
                let bytes = self.facts.archive(&repo).await?;

                // The downloaded archive is authoritative for the manifest;
                // the fact provider covers repositories whose tarball
                // carries none at the expected depth.
                let manifest = match Archive::new(bytes.clone()).manifest()? {
                    Some(manifest) => manifest,
                    None => self.facts.manifest(&repo).await?.unwrap_or_default(),
                };

                let name = custom_name
                    .map(ToString::to_string)
                    .or_else(|| manifest.name.clone())
                    .unwrap_or_else(|| repo.repo().to_string());

                Ok(Resolved {
                    name,
                    version: manifest.effective_version(),
                    bytes,
                    repo: Some(repo),
                    source_kind: SourceKind::Remote,
                    source_url: Some(url),
                })
            }
        }
    }

    async fn score(&self, repo: Option<&RepoSpec>) -> QualityRating {
        match repo {
            Some(repo) => ScoreEngine::new(&self.facts, &self.config).score(repo).await,
            None => QualityRating::unknown(),
        }
    }

    const fn gate_applies(&self, kind: SourceKind) -> bool {
        matches!(kind, SourceKind::Remote) || !self.config.gate_only_for_url_source
    }

    /// Write blob, package record, and rating. The blob goes first: if the
    /// metadata write then fails, the blob is orphaned but the package does
    /// not exist.
    async fn persist(&self, resolved: &Resolved, rating: &QualityRating, debloat_requested: bool, js_program: Option<String>) -> Result<PackageRecord> {
        let bytes = if debloat_requested {
            debloat(&Archive::new(resolved.bytes.clone()))?.into_bytes()
        } else {
            resolved.bytes.clone()
        };

        let id = PackageId::derive(&resolved.name, &resolved.version);
        self.blobs.put(&id, &bytes)?;

        let record = PackageRecord {
            id: id.clone(),
            name: resolved.name.clone(),
            version: resolved.version.clone(),
            source_kind: resolved.source_kind,
            source_url: resolved.source_url.clone(),
            js_program,
            debloated: debloat_requested,
            created_at: Utc::now(),
        };
        self.metadata.insert_package(&record)?;
        self.metadata.save_rating(&id, rating)?;

        Ok(record)
    }
}

/// The repository a manifest points at, when it parses as a supported
/// source-hosting location.
fn repo_from_manifest(manifest: &Manifest) -> Option<RepoSpec> {
    let raw = manifest.repository.as_deref()?;
    match RepoSpec::parse_str(raw) {
        Ok(spec) => Some(spec),
        Err(e) => {
            log::debug!(target: LOG_TARGET, "Manifest repository '{raw}' is not scoreable: {e}");
            None
        }
    }
}
