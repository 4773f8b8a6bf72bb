use core::fmt::{Display, Formatter};
use semver::Version;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::Arc;

/// Deterministic, content-free identity for a `(name, version)` pair.
///
/// The id is the SHA-256 digest of `"{name}@{version}"`, truncated to its
/// first eight bytes and rendered as a base-10 integer string. Identical
/// pairs always produce identical ids; distinct pairs collide only with
/// cryptographic-hash probability. This string, not the raw name/version,
/// keys the blob store, the size cache, and the history log.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PackageId(Arc<str>);

impl PackageId {
    /// Derive the id for a package name and version.
    #[must_use]
    pub fn derive(name: &str, version: &Version) -> Self {
        let digest = Sha256::digest(format!("{name}@{version}").as_bytes());
        let mut prefix = [0_u8; 8];
        prefix.copy_from_slice(&digest[..8]);
        Self(Arc::from(u64::from_be_bytes(prefix).to_string()))
    }

    /// Wrap an id string received from a caller. No validation beyond
    /// non-emptiness is performed; an unknown id simply fails lookup.
    #[must_use]
    pub fn from_raw(raw: impl AsRef<str>) -> Self {
        Self(Arc::from(raw.as_ref()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for PackageId {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}
