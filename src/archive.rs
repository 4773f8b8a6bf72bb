//! Gzipped-tarball handling: manifest extraction and the optional debloat
//! transform applied before storage.

use crate::Result;
use crate::error::{RegistryError, UpstreamContext};
use crate::model::Manifest;
use bytes::Bytes;
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use std::io::Read;
use std::path::Path;

const LOG_TARGET: &str = "   archive";

/// A package archive (gzipped tarball) held in memory.
#[derive(Debug, Clone)]
pub struct Archive {
    bytes: Bytes,
}

impl Archive {
    #[must_use]
    pub const fn new(bytes: Bytes) -> Self {
        Self { bytes }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    #[must_use]
    pub fn into_bytes(self) -> Bytes {
        self.bytes
    }

    /// Extract the package manifest from the archive.
    ///
    /// Archives commonly nest their contents under a single top-level
    /// directory (`package/` in registry tarballs), so the shallowest
    /// `package.json` wins. Returns `Ok(None)` when no manifest exists.
    pub fn manifest(&self) -> Result<Option<Manifest>> {
        let mut tar = tar::Archive::new(GzDecoder::new(&self.bytes[..]));
        let mut best: Option<(usize, String)> = None;

        for entry in tar.entries().upstream_with(|| "could not read archive entries".to_string())? {
            let mut entry = entry.upstream_with(|| "could not read archive entry".to_string())?;
            let path = entry.path().upstream_with(|| "archive entry has an unreadable path".to_string())?;

            let depth = path.components().count();
            let is_manifest = path.file_name().is_some_and(|f| f == "package.json");
            if !is_manifest || best.as_ref().is_some_and(|(d, _)| *d <= depth) {
                continue;
            }

            let mut text = String::new();
            let _ = entry
                .read_to_string(&mut text)
                .upstream_with(|| "could not read manifest from archive".to_string())?;
            best = Some((depth, text));
        }

        let Some((_, text)) = best else {
            return Ok(None);
        };

        let manifest = Manifest::parse(&text).map_err(|e| RegistryError::invalid(format!("archive manifest is not valid JSON: {e}")))?;
        Ok(Some(manifest))
    }
}

/// Rewrite an archive with script assets minified and source maps dropped.
///
/// The transform is intentionally conservative: comment-only and blank
/// lines are stripped from `.js`/`.mjs`/`.cjs` entries, `.map` files are
/// removed, and everything else passes through untouched.
pub fn debloat(archive: &Archive) -> Result<Archive> {
    let before = archive.len();
    let mut tar = tar::Archive::new(GzDecoder::new(&archive.bytes[..]));
    let mut builder = tar::Builder::new(GzEncoder::new(Vec::new(), Compression::default()));

    for entry in tar.entries().upstream_with(|| "could not read archive entries".to_string())? {
        let mut entry = entry.upstream_with(|| "could not read archive entry".to_string())?;
        let path = entry
            .path()
            .upstream_with(|| "archive entry has an unreadable path".to_string())?
            .into_owned();

        if entry.header().entry_type() != tar::EntryType::Regular {
            continue;
        }
        if has_extension(&path, "map") {
            continue;
        }

        let mut data = Vec::new();
        let _ = entry
            .read_to_end(&mut data)
            .upstream_with(|| format!("could not read archive entry '{}'", path.display()))?;

        if is_script(&path)
            && let Ok(text) = core::str::from_utf8(&data)
        {
            data = minify_script(text).into_bytes();
        }

        let mut header = tar::Header::new_gnu();
        header.set_size(data.len() as u64);
        header.set_mode(entry.header().mode().unwrap_or(0o644));
        header.set_cksum();
        builder
            .append_data(&mut header, &path, &data[..])
            .upstream_with(|| format!("could not write archive entry '{}'", path.display()))?;
    }

    let encoder = builder.into_inner().upstream_with(|| "could not finish archive".to_string())?;
    let bytes = encoder.finish().upstream_with(|| "could not compress archive".to_string())?;

    let debloated = Archive::new(Bytes::from(bytes));
    log::debug!(target: LOG_TARGET, "Debloated archive from {before} to {} bytes", debloated.len());
    Ok(debloated)
}

fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension().is_some_and(|e| e == ext)
}

fn is_script(path: &Path) -> bool {
    has_extension(path, "js") || has_extension(path, "mjs") || has_extension(path, "cjs")
}

/// Strip blank lines and whole-line comments from script text. Block
/// comments spanning lines are tracked with a small state flag; string
/// literals containing `//` are left alone because only lines *starting*
/// with comment markers are dropped.
fn minify_script(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_block_comment = false;

    for line in text.lines() {
        let trimmed = line.trim();

        if in_block_comment {
            if let Some(rest) = trimmed.split_once("*/").map(|(_, rest)| rest.trim()) {
                in_block_comment = false;
                if !rest.is_empty() && !rest.starts_with("//") {
                    out.push_str(rest);
                    out.push('\n');
                }
            }
            continue;
        }

        if trimmed.is_empty() || trimmed.starts_with("//") {
            continue;
        }

        if let Some(rest) = trimmed.strip_prefix("/*") {
            match rest.split_once("*/") {
                Some((_, after)) => {
                    let after = after.trim();
                    if !after.is_empty() && !after.starts_with("//") {
                        out.push_str(after);
                        out.push('\n');
                    }
                }
                None => in_block_comment = true,
            }
            continue;
        }

        out.push_str(trimmed);
        out.push('\n');
    }

    out
}
