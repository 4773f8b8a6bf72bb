//! Storage interfaces the registry core depends on, plus the bundled
//! implementations.
//!
//! The metadata store is authoritative for package existence; the blob
//! store merely holds archive bytes keyed by package id. Both are injected
//! into the pipeline and engines, never reached through process-wide
//! globals, so tests can substitute doubles freely.

mod blob_fs;
mod memory;

pub use blob_fs::FsBlobStore;
pub use memory::{MemoryBlobStore, MemoryMetadataStore};

use crate::Result;
use crate::ident::PackageId;
use crate::model::{CostRecord, HistoryEntry, PackageRecord, QualityRating};
use bytes::Bytes;
use semver::Version;

/// Durable records for packages, ratings, history, and the size cache.
///
/// Implementations must enforce `(name, version)` uniqueness at write time;
/// the pipeline treats that constraint as the authority for duplicate
/// detection under concurrent ingestion.
pub trait MetadataStore: Send + Sync {
    /// Insert a new package record. Fails with a conflict if the id or the
    /// `(name, version)` pair already exists.
    fn insert_package(&self, record: &PackageRecord) -> Result<()>;

    fn package(&self, id: &PackageId) -> Result<Option<PackageRecord>>;

    fn package_by_name_version(&self, name: &str, version: &Version) -> Result<Option<PackageRecord>>;

    /// Every stored version of a package name, ascending.
    fn versions_of(&self, name: &str) -> Result<Vec<Version>>;

    /// Remove a package and its rating and size-cache rows. Returns whether
    /// the package existed. History is retained.
    fn delete_package(&self, id: &PackageId) -> Result<bool>;

    fn save_rating(&self, id: &PackageId, rating: &QualityRating) -> Result<()>;

    fn rating(&self, id: &PackageId) -> Result<Option<QualityRating>>;

    fn append_history(&self, entry: &HistoryEntry) -> Result<()>;

    fn history(&self, id: &PackageId) -> Result<Vec<HistoryEntry>>;

    fn cached_cost(&self, id: &PackageId, with_dependencies: bool) -> Result<Option<CostRecord>>;

    fn cache_cost(&self, id: &PackageId, with_dependencies: bool, record: CostRecord) -> Result<()>;

    /// Drop every record, including history. Full registry reset only.
    fn reset(&self) -> Result<()>;
}

/// Content-addressed storage for package archives.
pub trait BlobStore: Send + Sync {
    fn put(&self, id: &PackageId, bytes: &[u8]) -> Result<()>;

    fn get(&self, id: &PackageId) -> Result<Option<Bytes>>;

    fn delete(&self, id: &PackageId) -> Result<bool>;

    fn list(&self) -> Result<Vec<PackageId>>;

    /// Drop every stored archive. Full registry reset only.
    fn reset(&self) -> Result<()>;
}
