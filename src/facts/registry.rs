//! Client for the upstream package registry: packument lookup, version
//! resolution, and tarball download.

use crate::Result;
use crate::error::{RegistryError, UpstreamContext};
use crate::model::Manifest;
use bytes::Bytes;
use reqwest::{Client, StatusCode};
use semver::{Version, VersionReq};
use serde::Deserialize;
use std::collections::BTreeMap;
use url::Url;

const LOG_TARGET: &str = "  registry";

/// Tarball location for one published version.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Dist {
    pub tarball: Option<Url>,
}

/// One published version inside a packument. The manifest fields flatten in
/// from the same document.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VersionEntry {
    #[serde(flatten)]
    pub manifest: Manifest,

    #[serde(default)]
    pub dist: Dist,
}

/// The registry's full metadata document for one package name.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Packument {
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default, rename = "dist-tags")]
    pub dist_tags: BTreeMap<String, String>,

    #[serde(default)]
    pub versions: BTreeMap<String, VersionEntry>,
}

impl Packument {
    /// Every published version that parses as semver, ascending.
    #[must_use]
    pub fn published_versions(&self) -> Vec<Version> {
        let mut versions: Vec<_> = self.versions.keys().filter_map(|raw| Version::parse(raw).ok()).collect();
        versions.sort();
        versions
    }

    #[must_use]
    pub fn entry(&self, version: &Version) -> Option<&VersionEntry> {
        self.versions.get(&version.to_string())
    }

    /// The highest published version satisfying `range`, under the upstream
    /// registry's range conventions.
    #[must_use]
    pub fn max_satisfying(&self, range: &str) -> Option<Version> {
        max_satisfying(&self.published_versions(), range)
    }

    /// The repository location recorded for `version`, falling back to the
    /// newest version that names one.
    #[must_use]
    pub fn repository_for(&self, version: &Version) -> Option<String> {
        if let Some(repo) = self.entry(version).and_then(|e| e.manifest.repository.clone()) {
            return Some(repo);
        }

        self.published_versions()
            .iter()
            .rev()
            .find_map(|v| self.entry(v).and_then(|e| e.manifest.repository.clone()))
    }
}

/// Pick the highest of `versions` (ascending order assumed) that satisfies
/// `range`.
///
/// Range handling follows the upstream registry rather than Cargo: a bare
/// `1.2.3` is an exact pin, not a caret range; comparators separated by
/// spaces are an AND; `||` alternatives take the best match across arms;
/// empty, `*`, and `latest` match anything.
#[must_use]
pub fn max_satisfying(versions: &[Version], range: &str) -> Option<Version> {
    let range = range.trim();

    if range.is_empty() || range == "*" || range == "latest" {
        return versions.last().cloned();
    }

    // A bare version is an exact pin.
    if let Ok(exact) = Version::parse(range) {
        return versions.contains(&exact).then_some(exact);
    }

    range
        .split("||")
        .filter_map(|arm| {
            let req = parse_arm(arm)?;
            versions.iter().rev().find(|v| req.matches(v)).cloned()
        })
        .max()
}

/// Parse one `||`-free range arm. Space-separated comparators become the
/// comma-separated AND form the semver crate expects.
fn parse_arm(arm: &str) -> Option<VersionReq> {
    let normalized = arm.split_whitespace().collect::<Vec<_>>().join(", ");

    match VersionReq::parse(&normalized) {
        Ok(req) => Some(req),
        Err(e) => {
            log::debug!(target: LOG_TARGET, "Unresolvable version range '{arm}': {e}");
            None
        }
    }
}

/// Upstream registry operations the cost engine and ingestion pipeline
/// depend on.
#[allow(async_fn_in_trait, reason = "consumed through generics, never through dyn")]
pub trait SourceRegistry: Send + Sync {
    /// The full metadata document for a package name, or `None` if the
    /// registry has never heard of it.
    async fn packument(&self, name: &str) -> Result<Option<Packument>>;

    /// The gzipped tarball of one published version.
    async fn download(&self, name: &str, version: &Version) -> Result<Bytes>;
}

/// [`SourceRegistry`] over the registry's public HTTP API.
#[derive(Debug, Clone)]
pub struct HttpSourceRegistry {
    client: Client,
    base_url: Url,
}

impl HttpSourceRegistry {
    pub fn new(base_url: Url) -> Result<Self> {
        Ok(Self {
            client: Client::builder()
                .user_agent("quay")
                .build()
                .upstream_with(|| "unable to build HTTP client".to_string())?,
            base_url,
        })
    }

    fn packument_url(&self, name: &str) -> Result<Url> {
        // Scoped names keep their slash encoded, per registry convention.
        let encoded = name.replace('/', "%2F");
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| RegistryError::invalid(format!("registry base URL '{}' cannot take a path", self.base_url)))?
            .push(&encoded);
        Ok(url)
    }
}

impl SourceRegistry for HttpSourceRegistry {
    async fn packument(&self, name: &str) -> Result<Option<Packument>> {
        let url = self.packument_url(name)?;
        log::debug!(target: LOG_TARGET, "Fetching packument for '{name}'");

        let resp = self
            .client
            .get(url.clone())
            .send()
            .await
            .upstream_with(|| format!("request to '{url}' failed"))?;

        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let resp = resp
            .error_for_status()
            .upstream_with(|| format!("request to '{url}' failed"))?;
        let packument = resp
            .json()
            .await
            .upstream_with(|| format!("malformed packument for '{name}'"))?;
        Ok(Some(packument))
    }

    async fn download(&self, name: &str, version: &Version) -> Result<Bytes> {
        let packument = self
            .packument(name)
            .await?
            .ok_or_else(|| RegistryError::not_found(format!("package '{name}' is not in the upstream registry")))?;

        let tarball = packument
            .entry(version)
            .and_then(|e| e.dist.tarball.clone())
            .ok_or_else(|| RegistryError::not_found(format!("no tarball published for {name}@{version}")))?;

        log::debug!(target: LOG_TARGET, "Downloading tarball for {name}@{version}");

        let resp = self
            .client
            .get(tarball.clone())
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .upstream_with(|| format!("could not download tarball '{tarball}'"))?;

        resp.bytes()
            .await
            .upstream_with(|| format!("could not read tarball bytes from '{tarball}'"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn versions(raw: &[&str]) -> Vec<Version> {
        let mut parsed: Vec<_> = raw.iter().map(|r| Version::parse(r).unwrap()).collect();
        parsed.sort();
        parsed
    }

    #[test]
    fn bare_version_is_an_exact_pin() {
        let published = versions(&["1.2.2", "1.2.3", "1.3.0"]);
        assert_eq!(max_satisfying(&published, "1.2.3"), Some(Version::new(1, 2, 3)));
        assert_eq!(max_satisfying(&published, "1.2.4"), None);
    }

    #[test]
    fn caret_range_takes_highest_compatible() {
        let published = versions(&["1.2.0", "1.9.9", "2.0.0"]);
        assert_eq!(max_satisfying(&published, "^1.2.0"), Some(Version::new(1, 9, 9)));
    }

    #[test]
    fn space_separated_comparators_are_an_and() {
        let published = versions(&["1.0.0", "1.5.0", "2.0.0"]);
        assert_eq!(max_satisfying(&published, ">=1.0.0 <2.0.0"), Some(Version::new(1, 5, 0)));
    }

    #[test]
    fn or_alternatives_take_the_best_arm() {
        let published = versions(&["0.9.0", "1.5.0", "2.1.0"]);
        assert_eq!(max_satisfying(&published, "^0.9.0 || ^2.0.0"), Some(Version::new(2, 1, 0)));
    }

    #[test]
    fn wildcards_match_everything() {
        let published = versions(&["0.1.0", "3.0.0"]);
        assert_eq!(max_satisfying(&published, "*"), Some(Version::new(3, 0, 0)));
        assert_eq!(max_satisfying(&published, ""), Some(Version::new(3, 0, 0)));
        assert_eq!(max_satisfying(&published, "latest"), Some(Version::new(3, 0, 0)));
    }

    #[test]
    fn unparseable_range_matches_nothing() {
        let published = versions(&["1.0.0"]);
        assert_eq!(max_satisfying(&published, "1.0.0 - 2.0.0"), None);
    }

    #[test]
    fn packument_resolves_repository_with_fallback() {
        let doc: Packument = serde_json::from_str(
            r#"{
                "name": "a",
                "versions": {
                    "1.0.0": {"version": "1.0.0"},
                    "1.1.0": {"version": "1.1.0", "repository": "https://github.com/o/a"}
                }
            }"#,
        )
        .unwrap();

        assert_eq!(doc.repository_for(&Version::new(1, 1, 0)).as_deref(), Some("https://github.com/o/a"));
        // 1.0.0 has no repository of its own; the newest one that does wins.
        assert_eq!(doc.repository_for(&Version::new(1, 0, 0)).as_deref(), Some("https://github.com/o/a"));
    }

    #[test]
    fn packument_reads_dist_tarball() {
        let doc: Packument = serde_json::from_str(
            r#"{
                "versions": {
                    "2.0.0": {"dist": {"tarball": "https://registry.npmjs.org/a/-/a-2.0.0.tgz"}}
                }
            }"#,
        )
        .unwrap();

        let entry = doc.entry(&Version::new(2, 0, 0)).unwrap();
        assert!(entry.dist.tarball.is_some());
    }
}
