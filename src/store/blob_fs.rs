use super::BlobStore;
use crate::Result;
use crate::error::UpstreamContext;
use crate::ident::PackageId;
use bytes::Bytes;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

const LOG_TARGET: &str = "  fs_blobs";

/// Filesystem-backed blob store: one `<id>.tgz` file per archive under a
/// single directory. Package ids are decimal strings, so they are safe as
/// file names without sanitization.
#[derive(Debug)]
pub struct FsBlobStore {
    dir: PathBuf,
}

impl FsBlobStore {
    /// Open (creating if needed) a blob directory.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).upstream_with(|| format!("unable to create blob directory '{}'", dir.display()))?;
        Ok(Self { dir })
    }

    fn blob_path(&self, id: &PackageId) -> PathBuf {
        self.dir.join(format!("{id}.tgz"))
    }
}

impl BlobStore for FsBlobStore {
    fn put(&self, id: &PackageId, bytes: &[u8]) -> Result<()> {
        let path = self.blob_path(id);
        fs::write(&path, bytes).upstream_with(|| format!("unable to write blob '{}'", path.display()))?;
        log::debug!(target: LOG_TARGET, "Wrote {} bytes for package {id}", bytes.len());
        Ok(())
    }

    fn get(&self, id: &PackageId) -> Result<Option<Bytes>> {
        let path = self.blob_path(id);
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(Bytes::from(bytes))),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).upstream_with(|| format!("unable to read blob '{}'", path.display())),
        }
    }

    fn delete(&self, id: &PackageId) -> Result<bool> {
        let path = self.blob_path(id);
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e).upstream_with(|| format!("unable to delete blob '{}'", path.display())),
        }
    }

    fn list(&self) -> Result<Vec<PackageId>> {
        let entries = fs::read_dir(&self.dir).upstream_with(|| format!("unable to list blob directory '{}'", self.dir.display()))?;

        let mut ids = Vec::new();
        for entry in entries {
            let entry = entry.upstream_with(|| "unable to read blob directory entry".to_string())?;
            let name = entry.file_name();
            if let Some(id) = name.to_str().and_then(|n| n.strip_suffix(".tgz")) {
                ids.push(PackageId::from_raw(id));
            }
        }
        Ok(ids)
    }

    fn reset(&self) -> Result<()> {
        for id in self.list()? {
            let _ = self.delete(&id)?;
        }
        log::info!(target: LOG_TARGET, "Blob store reset");
        Ok(())
    }
}
