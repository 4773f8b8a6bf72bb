use crate::Result;
use crate::error::{RegistryError, UpstreamContext};
use crate::ident::PackageId;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use semver::Version;
use serde::{Deserialize, Serialize};
use url::Url;

/// The kind of source a package's body was originally supplied as. Fixed
/// for the life of the package: an update must supply the same kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Body was uploaded as an inline archive.
    Archive,

    /// Body was fetched from an external source location.
    Remote,
}

/// The body of an ingestion request: exactly one of an inline archive or a
/// remote source location. The exclusivity invariant the wire shape can't
/// express ("either content or URL, never both, never neither") is a
/// type-system guarantee here; [`PackageSource::from_parts`] is the only
/// place the two-optional-fields shape is ever decoded.
#[derive(Debug, Clone)]
pub enum PackageSource {
    /// A gzipped tarball supplied inline.
    Archive(Bytes),

    /// A source-hosting or public-registry URL.
    Remote(Url),
}

impl PackageSource {
    /// Decode the wire shape: base64 archive content and/or a URL string.
    ///
    /// Supplying both or neither is a client error.
    pub fn from_parts(content: Option<&str>, url: Option<&str>) -> Result<Self> {
        match (content, url) {
            (Some(_), Some(_)) => Err(RegistryError::invalid("exactly one of content or URL must be supplied, not both")),
            (None, None) => Err(RegistryError::invalid("exactly one of content or URL must be supplied")),
            (Some(encoded), None) => {
                let bytes = BASE64
                    .decode(encoded.trim())
                    .map_err(|e| RegistryError::invalid(format!("content is not valid base64: {e}")))?;
                Ok(Self::Archive(Bytes::from(bytes)))
            }
            (None, Some(raw)) => {
                let url = Url::parse(raw).map_err(|e| RegistryError::invalid(format!("malformed URL '{raw}': {e}")))?;
                Ok(Self::Remote(url))
            }
        }
    }

    /// The source kind this body corresponds to.
    #[must_use]
    pub const fn kind(&self) -> SourceKind {
        match self {
            Self::Archive(_) => SourceKind::Archive,
            Self::Remote(_) => SourceKind::Remote,
        }
    }
}

/// Encode archive bytes the way the wire layer expects them.
#[must_use]
pub(crate) fn encode_content(bytes: &[u8]) -> String {
    BASE64.encode(bytes)
}

/// One committed package version. `(name, version)` is unique and immutable
/// once committed; an update creates a new record under a new id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageRecord {
    pub id: PackageId,
    pub name: String,
    pub version: Version,
    pub source_kind: SourceKind,
    pub source_url: Option<Url>,
    pub js_program: Option<String>,
    pub debloated: bool,
    pub created_at: DateTime<Utc>,
}

impl PackageRecord {
    /// Serialize the record for durable storage.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).upstream_with(|| format!("could not serialize package record '{}'", self.id))
    }
}
