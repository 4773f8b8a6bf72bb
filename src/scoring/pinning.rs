use semver::Version;
use std::collections::BTreeMap;

/// Fraction of dependencies pinned to a single `major.minor` band. No
/// dependencies at all counts as perfect practice.
#[expect(clippy::cast_precision_loss, reason = "counts fit comfortably in f64")]
pub(crate) fn score(dependencies: &BTreeMap<String, String>) -> f64 {
    if dependencies.is_empty() {
        return 1.0;
    }

    let pinned = dependencies.values().filter(|range| is_pinned(range)).count();
    pinned as f64 / dependencies.len() as f64
}

/// Whether a version range admits at most one `major.minor` band.
fn is_pinned(range: &str) -> bool {
    let range = range.trim();

    // An exact version.
    if Version::parse(range).is_ok() {
        return true;
    }

    // Tilde ranges pin the minor when one is given: `~1.2.3` and `~1.2`
    // both mean the 1.2 band, while `~1` floats across minors.
    if let Some(rest) = range.strip_prefix('~') {
        return names_minor(rest);
    }

    // Caret ranges only pin below 1.0: `^0.2.3` is the 0.2 band.
    if let Some(rest) = range.strip_prefix('^') {
        return rest.starts_with("0.") && names_minor(rest);
    }

    // Wildcard patch: `1.2.x` or `1.2.*`.
    if let Some((head, tail)) = range.rsplit_once('.')
        && (tail == "x" || tail == "X" || tail == "*")
    {
        return names_minor(head);
    }

    // A bounded range spanning exactly one minor: `>=1.2.0 <1.3.0`.
    if let Some((lo, hi)) = parse_bounds(range) {
        return hi.major == lo.major && hi.minor == lo.minor + 1 && hi.patch == 0;
    }

    false
}

/// Whether a dotted fragment names at least major and minor components.
fn names_minor(fragment: &str) -> bool {
    let mut parts = fragment.split('.');
    let well_formed = |p: Option<&str>| p.is_some_and(|n| !n.is_empty() && n.chars().all(|c| c.is_ascii_digit()));
    well_formed(parts.next()) && well_formed(parts.next())
}

fn parse_bounds(range: &str) -> Option<(Version, Version)> {
    let (lo, hi) = range.split_once(char::is_whitespace)?;
    let lo = Version::parse(lo.trim().strip_prefix(">=")?).ok()?;
    let hi = Version::parse(hi.trim().strip_prefix('<')?).ok()?;
    Some((lo, hi))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deps(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn no_dependencies_is_perfect() {
        assert!((score(&BTreeMap::new()) - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn exact_and_tilde_are_pinned() {
        assert!(is_pinned("1.2.3"));
        assert!(is_pinned("~1.2.3"));
        assert!(is_pinned("~1.2"));
        assert!(is_pinned("1.2.x"));
        assert!(is_pinned("1.2.*"));
        assert!(is_pinned("^0.2.3"));
        assert!(is_pinned(">=1.2.0 <1.3.0"));
    }

    #[test]
    fn floating_ranges_are_not_pinned() {
        assert!(!is_pinned("^1.2.3"));
        assert!(!is_pinned("~1"));
        assert!(!is_pinned("1.x"));
        assert!(!is_pinned("*"));
        assert!(!is_pinned(">=1.0.0"));
        assert!(!is_pinned(">=1.2.0 <2.0.0"));
    }

    #[test]
    fn score_is_the_pinned_fraction() {
        let d = deps(&[("a", "1.0.0"), ("b", "^2.0.0"), ("c", "~3.1.0"), ("d", "*")]);
        assert!((score(&d) - 0.5).abs() < f64::EPSILON);
    }
}
