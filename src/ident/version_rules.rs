use semver::Version;

/// Version-compatibility rule applied to updates.
///
/// The new version is accepted unless it is strictly lower than the prior
/// version in lexicographic `(major, minor, patch)` order. Equal versions
/// pass this rule; exact duplicates are caught earlier by the ingestion
/// pipeline's duplicate check.
#[must_use]
pub fn version_compatible(new: &Version, old: &Version) -> bool {
    if new.major != old.major {
        return new.major > old.major;
    }
    if new.minor != old.minor {
        return new.minor > old.minor;
    }
    new.patch >= old.patch
}
