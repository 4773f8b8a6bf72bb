use crate::facts::ReviewCoverage;

/// Fraction of added lines, across the sampled merged pull requests, that
/// landed through a reviewed pull request. No additions at all scores zero.
#[expect(clippy::cast_precision_loss, reason = "line counts fit comfortably in f64")]
pub(crate) fn score(coverage: &ReviewCoverage) -> f64 {
    if coverage.total_additions == 0 {
        return 0.0;
    }

    coverage.reviewed_additions as f64 / coverage.total_additions as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_additions_scores_zero() {
        assert!(score(&ReviewCoverage::default()).abs() < f64::EPSILON);
    }

    #[test]
    fn fully_reviewed_history_scores_one() {
        let s = score(&ReviewCoverage {
            reviewed_additions: 400,
            total_additions: 400,
        });
        assert!((s - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn partial_review_is_the_additions_fraction() {
        let s = score(&ReviewCoverage {
            reviewed_additions: 150,
            total_additions: 600,
        });
        assert!((s - 0.25).abs() < f64::EPSILON);
    }
}
