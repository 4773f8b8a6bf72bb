use semver::Version;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const LOG_TARGET: &str = "  manifest";

/// A package manifest, as embedded in archives, repositories, and registry
/// packuments. Only the fields the core consumes are modeled; everything
/// else in the document is ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub version: Option<String>,

    #[serde(default, deserialize_with = "deserialize_license")]
    pub license: Option<String>,

    #[serde(default, deserialize_with = "deserialize_repository")]
    pub repository: Option<String>,

    #[serde(default)]
    pub dependencies: BTreeMap<String, String>,
}

impl Manifest {
    /// Parse a manifest from its JSON text.
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// The manifest's version, parsed as semver. Missing or invalid
    /// versions fall back to `1.0.0`; that fallback is deliberate, not an
    /// error.
    #[must_use]
    pub fn effective_version(&self) -> Version {
        self.version
            .as_deref()
            .and_then(|raw| match Version::parse(raw.trim().trim_start_matches('v')) {
                Ok(version) => Some(version),
                Err(e) => {
                    log::debug!(target: LOG_TARGET, "Invalid manifest version '{raw}', defaulting to 1.0.0: {e}");
                    None
                }
            })
            .unwrap_or_else(|| Version::new(1, 0, 0))
    }
}

/// Manifest `license` may be a bare expression string or an object with a
/// `type` field (a long-deprecated shape that still appears in the wild).
fn deserialize_license<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum LicenseField {
        Expression(String),
        Object { r#type: String },
    }

    Ok(Option::<LicenseField>::deserialize(deserializer)?.map(|field| match field {
        LicenseField::Expression(s) | LicenseField::Object { r#type: s } => s,
    }))
}

/// Manifest `repository` may be a bare URL string or an object with a `url`
/// field.
fn deserialize_repository<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RepositoryField {
        Location(String),
        Object { url: String },
    }

    Ok(Option::<RepositoryField>::deserialize(deserializer)?.map(|field| match field {
        RepositoryField::Location(s) | RepositoryField::Object { url: s } => s,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_manifest() {
        let manifest = Manifest::parse(r#"{"name": "left-pad", "version": "1.3.0"}"#).unwrap();
        assert_eq!(manifest.name.as_deref(), Some("left-pad"));
        assert_eq!(manifest.effective_version(), Version::new(1, 3, 0));
        assert!(manifest.dependencies.is_empty());
    }

    #[test]
    fn missing_version_defaults_to_one() {
        let manifest = Manifest::parse(r#"{"name": "x"}"#).unwrap();
        assert_eq!(manifest.effective_version(), Version::new(1, 0, 0));
    }

    #[test]
    fn garbage_version_defaults_to_one() {
        let manifest = Manifest::parse(r#"{"name": "x", "version": "latest"}"#).unwrap();
        assert_eq!(manifest.effective_version(), Version::new(1, 0, 0));
    }

    #[test]
    fn v_prefixed_version_is_accepted() {
        let manifest = Manifest::parse(r#"{"name": "x", "version": "v2.1.0"}"#).unwrap();
        assert_eq!(manifest.effective_version(), Version::new(2, 1, 0));
    }

    #[test]
    fn repository_as_string_and_object() {
        let as_string = Manifest::parse(r#"{"repository": "https://github.com/a/b"}"#).unwrap();
        assert_eq!(as_string.repository.as_deref(), Some("https://github.com/a/b"));

        let as_object = Manifest::parse(r#"{"repository": {"type": "git", "url": "git+https://github.com/a/b.git"}}"#).unwrap();
        assert_eq!(as_object.repository.as_deref(), Some("git+https://github.com/a/b.git"));
    }

    #[test]
    fn license_as_string_and_object() {
        let as_string = Manifest::parse(r#"{"license": "MIT"}"#).unwrap();
        assert_eq!(as_string.license.as_deref(), Some("MIT"));

        let as_object = Manifest::parse(r#"{"license": {"type": "ISC"}}"#).unwrap();
        assert_eq!(as_object.license.as_deref(), Some("ISC"));
    }

    #[test]
    fn dependencies_are_preserved_in_order() {
        let manifest = Manifest::parse(r#"{"dependencies": {"b": "^1.0.0", "a": "2.0.0"}}"#).unwrap();
        let names: Vec<_> = manifest.dependencies.keys().cloned().collect();
        assert_eq!(names, vec!["a", "b"]);
    }
}
