use spdx::{Expression, ParseMode};

const LOG_TARGET: &str = "   scoring";

/// License identifiers the registry admits. The deprecated unsuffixed GPL
/// family forms stay on the list because manifests in the wild still use
/// them.
const PERMISSIVE: &[&str] = &[
    "MIT",
    "Apache-2.0",
    "BSD-2-Clause",
    "BSD-3-Clause",
    "ISC",
    "0BSD",
    "Unlicense",
    "Zlib",
    "CC0-1.0",
    "MPL-2.0",
    "LGPL-2.1",
    "LGPL-2.1-only",
    "LGPL-2.1-or-later",
    "LGPL-3.0",
    "LGPL-3.0-only",
    "LGPL-3.0-or-later",
];

/// 1.0 when the declared license expression resolves to an admitted
/// license, 0.0 otherwise, including when nothing was declared or the
/// expression does not parse.
pub(crate) fn score(declared: Option<&str>) -> f64 {
    let Some(raw) = declared else {
        return 0.0;
    };

    // Lax mode accepts the slash-separated and deprecated forms old
    // manifests carry.
    match Expression::parse_mode(raw, ParseMode::LAX) {
        Ok(expr) => {
            let compatible = expr.evaluate(|req| req.license.id().is_some_and(|id| PERMISSIVE.contains(&id.name)));
            if compatible { 1.0 } else { 0.0 }
        }
        Err(e) => {
            log::debug!(target: LOG_TARGET, "Unparseable license expression '{raw}': {e}");
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permissive_licenses_pass() {
        assert!((score(Some("MIT")) - 1.0).abs() < f64::EPSILON);
        assert!((score(Some("Apache-2.0")) - 1.0).abs() < f64::EPSILON);
        assert!((score(Some("ISC")) - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn copyleft_fails() {
        assert!(score(Some("GPL-3.0-only")).abs() < f64::EPSILON);
        assert!(score(Some("AGPL-3.0-only")).abs() < f64::EPSILON);
    }

    #[test]
    fn missing_or_garbage_license_fails() {
        assert!(score(None).abs() < f64::EPSILON);
        assert!(score(Some("See LICENSE file")).abs() < f64::EPSILON);
    }

    #[test]
    fn or_expression_passes_if_either_arm_does() {
        assert!((score(Some("GPL-3.0-only OR MIT")) - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn and_expression_requires_both_arms() {
        assert!(score(Some("MIT AND GPL-3.0-only")).abs() < f64::EPSILON);
        assert!((score(Some("MIT AND Apache-2.0")) - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn slash_separated_legacy_form_is_accepted() {
        assert!((score(Some("MIT/Apache-2.0")) - 1.0).abs() < f64::EPSILON);
    }
}
