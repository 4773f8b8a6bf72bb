use crate::Result;
use crate::error::RegistryError;
use crate::facts::{RepoSpec, SourceRegistry};
use semver::Version;
use url::Url;

const LOG_TARGET: &str = "  pipeline";

/// Translate an ingestion URL into the source-hosting location that will be
/// scored and downloaded.
///
/// A source-hosting URL passes through as-is. A public-registry package
/// page resolves through the package's published repository metadata. Any
/// other shape is a client error.
pub(crate) async fn resolve_source<R: SourceRegistry>(url: &Url, registry: &R) -> Result<RepoSpec> {
    if let Some(name) = registry_package_name(url) {
        let packument = registry
            .packument(&name)
            .await?
            .ok_or_else(|| RegistryError::not_found(format!("package '{name}' is not in the upstream registry")))?;

        let version = latest_version(&packument.dist_tags, &packument.published_versions())
            .ok_or_else(|| RegistryError::invalid(format!("package '{name}' has no published versions")))?;

        let repo = packument
            .repository_for(&version)
            .ok_or_else(|| RegistryError::invalid(format!("package '{name}' publishes no repository location")))?;

        let spec = RepoSpec::parse_str(&repo)?;
        log::debug!(target: LOG_TARGET, "Resolved registry page '{url}' to repository '{spec}'");
        return Ok(spec);
    }

    RepoSpec::parse(url)
}

/// The package name a public-registry package-page URL refers to, if that
/// is what this URL is. Scoped names span two path segments.
fn registry_package_name(url: &Url) -> Option<String> {
    if !matches!(url.host_str(), Some("www.npmjs.com" | "npmjs.com")) {
        return None;
    }

    let segments: Vec<_> = url.path_segments()?.filter(|s| !s.is_empty()).collect();
    match segments.as_slice() {
        ["package", name] => Some((*name).to_string()),
        ["package", scope, name] if scope.starts_with('@') => Some(format!("{scope}/{name}")),
        _ => None,
    }
}

/// The version the registry considers current: the `latest` dist-tag when
/// it parses, otherwise the highest published version.
fn latest_version(dist_tags: &std::collections::BTreeMap<String, String>, published: &[Version]) -> Option<Version> {
    dist_tags
        .get("latest")
        .and_then(|raw| Version::parse(raw).ok())
        .or_else(|| published.last().cloned())
}
