use crate::Result;
use crate::error::RegistryError;
use core::fmt::{Display, Formatter};
use serde::{Deserialize, Serialize};
use url::Url;

/// A parsed source-hosting location: host, owner, and repository name.
///
/// Accepts the URL shapes that appear in manifests and packuments,
/// including `git+https://...` and trailing `.git`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepoSpec {
    url: Url,
    owner: Box<str>,
    repo: Box<str>,
}

impl RepoSpec {
    /// Parse a source-hosting URL. Non-GitHub hosts are rejected; the fact
    /// provider has nowhere else to look.
    pub fn parse(url: &Url) -> Result<Self> {
        let normalized = normalize(url)?;

        if normalized.host_str() != Some("github.com") {
            return Err(RegistryError::invalid(format!("not a supported source-hosting URL: {url}")));
        }

        let path_segments: Vec<_> = normalized.path_segments().map(Iterator::collect).unwrap_or_default();

        if path_segments.len() < 2 || path_segments[0].is_empty() || path_segments[1].is_empty() {
            return Err(RegistryError::invalid(format!("repository URL is missing owner or name: {url}")));
        }

        Ok(Self {
            owner: Box::from(path_segments[0]),
            repo: Box::from(path_segments[1].trim_end_matches(".git")),
            url: normalized,
        })
    }

    /// Parse a repository location string as found in a manifest's
    /// `repository` field.
    pub fn parse_str(raw: &str) -> Result<Self> {
        let url = Url::parse(raw).map_err(|e| RegistryError::invalid(format!("malformed repository URL '{raw}': {e}")))?;
        Self::parse(&url)
    }

    #[must_use]
    pub const fn url(&self) -> &Url {
        &self.url
    }

    #[must_use]
    pub fn owner(&self) -> &str {
        &self.owner
    }

    #[must_use]
    pub fn repo(&self) -> &str {
        &self.repo
    }
}

/// Strip the `git+` scheme prefix manifests often carry and force https.
fn normalize(url: &Url) -> Result<Url> {
    let raw = url.as_str();
    let stripped = raw.strip_prefix("git+").unwrap_or(raw);
    let rewritten = stripped.strip_prefix("git://").map(|rest| format!("https://{rest}"));

    let candidate = rewritten.as_deref().unwrap_or(stripped);
    Url::parse(candidate).map_err(|e| RegistryError::invalid(format!("malformed repository URL '{raw}': {e}")))
}

impl Display for RepoSpec {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}
