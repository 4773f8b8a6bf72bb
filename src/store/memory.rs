use super::{BlobStore, MetadataStore};
use crate::Result;
use crate::error::RegistryError;
use crate::ident::PackageId;
use crate::model::{CostRecord, HistoryEntry, PackageRecord, QualityRating};
use bytes::Bytes;
use semver::Version;
use std::collections::HashMap;
use std::sync::Mutex;

const LOG_TARGET: &str = " mem_store";

#[derive(Debug, Default)]
struct MetadataInner {
    packages: HashMap<PackageId, PackageRecord>,
    by_name_version: HashMap<(String, Version), PackageId>,
    ratings: HashMap<PackageId, QualityRating>,
    history: Vec<HistoryEntry>,
    costs: HashMap<(PackageId, bool), CostRecord>,
}

/// In-memory metadata store. The reference implementation for small
/// deployments and the test double for everything else.
#[derive(Debug, Default)]
pub struct MemoryMetadataStore {
    inner: Mutex<MetadataInner>,
}

impl MemoryMetadataStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn locked(&self) -> std::sync::MutexGuard<'_, MetadataInner> {
        // A poisoned lock means a panic mid-write; the data is unusable.
        self.inner.lock().expect("metadata store lock poisoned")
    }
}

impl MetadataStore for MemoryMetadataStore {
    fn insert_package(&self, record: &PackageRecord) -> Result<()> {
        let mut inner = self.locked();

        let key = (record.name.clone(), record.version.clone());
        if inner.by_name_version.contains_key(&key) {
            return Err(RegistryError::conflict(format!(
                "package {}@{} already exists",
                record.name, record.version
            )));
        }
        if inner.packages.contains_key(&record.id) {
            return Err(RegistryError::conflict(format!("package id {} already exists", record.id)));
        }

        let _ = inner.by_name_version.insert(key, record.id.clone());
        let _ = inner.packages.insert(record.id.clone(), record.clone());
        log::debug!(target: LOG_TARGET, "Inserted package {}@{} as {}", record.name, record.version, record.id);
        Ok(())
    }

    fn package(&self, id: &PackageId) -> Result<Option<PackageRecord>> {
        Ok(self.locked().packages.get(id).cloned())
    }

    fn package_by_name_version(&self, name: &str, version: &Version) -> Result<Option<PackageRecord>> {
        let inner = self.locked();
        let id = inner.by_name_version.get(&(name.to_string(), version.clone()));
        Ok(id.and_then(|id| inner.packages.get(id)).cloned())
    }

    fn versions_of(&self, name: &str) -> Result<Vec<Version>> {
        let inner = self.locked();
        let mut versions: Vec<_> = inner
            .by_name_version
            .keys()
            .filter(|(n, _)| n == name)
            .map(|(_, v)| v.clone())
            .collect();
        versions.sort();
        Ok(versions)
    }

    fn delete_package(&self, id: &PackageId) -> Result<bool> {
        let mut inner = self.locked();
        let Some(record) = inner.packages.remove(id) else {
            return Ok(false);
        };
        let _ = inner.by_name_version.remove(&(record.name, record.version));
        let _ = inner.ratings.remove(id);
        inner.costs.retain(|(cost_id, _), _| cost_id != id);
        Ok(true)
    }

    fn save_rating(&self, id: &PackageId, rating: &QualityRating) -> Result<()> {
        let _ = self.locked().ratings.insert(id.clone(), rating.clone());
        Ok(())
    }

    fn rating(&self, id: &PackageId) -> Result<Option<QualityRating>> {
        Ok(self.locked().ratings.get(id).cloned())
    }

    fn append_history(&self, entry: &HistoryEntry) -> Result<()> {
        self.locked().history.push(entry.clone());
        Ok(())
    }

    fn history(&self, id: &PackageId) -> Result<Vec<HistoryEntry>> {
        Ok(self.locked().history.iter().filter(|e| &e.package_id == id).cloned().collect())
    }

    fn cached_cost(&self, id: &PackageId, with_dependencies: bool) -> Result<Option<CostRecord>> {
        Ok(self.locked().costs.get(&(id.clone(), with_dependencies)).copied())
    }

    fn cache_cost(&self, id: &PackageId, with_dependencies: bool, record: CostRecord) -> Result<()> {
        let _ = self.locked().costs.insert((id.clone(), with_dependencies), record);
        Ok(())
    }

    fn reset(&self) -> Result<()> {
        *self.locked() = MetadataInner::default();
        log::info!(target: LOG_TARGET, "Metadata store reset");
        Ok(())
    }
}

/// In-memory blob store.
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    blobs: Mutex<HashMap<PackageId, Bytes>>,
}

impl MemoryBlobStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn locked(&self) -> std::sync::MutexGuard<'_, HashMap<PackageId, Bytes>> {
        self.blobs.lock().expect("blob store lock poisoned")
    }
}

impl BlobStore for MemoryBlobStore {
    fn put(&self, id: &PackageId, bytes: &[u8]) -> Result<()> {
        let _ = self.locked().insert(id.clone(), Bytes::copy_from_slice(bytes));
        Ok(())
    }

    fn get(&self, id: &PackageId) -> Result<Option<Bytes>> {
        Ok(self.locked().get(id).cloned())
    }

    fn delete(&self, id: &PackageId) -> Result<bool> {
        Ok(self.locked().remove(id).is_some())
    }

    fn list(&self) -> Result<Vec<PackageId>> {
        Ok(self.locked().keys().cloned().collect())
    }

    fn reset(&self) -> Result<()> {
        self.locked().clear();
        Ok(())
    }
}
