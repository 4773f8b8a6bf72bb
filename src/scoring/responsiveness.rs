use crate::facts::IssueSummary;

const RESPONSIVE_DAYS: f64 = 7.0;

/// Tiered maintainer-responsiveness score from mean issue and pull-request
/// resolution times: 1.0 when both land under seven days, 0.7 when one
/// does, 0.3 otherwise, and 0.0 when nothing has ever been resolved.
pub(crate) fn score(issues: &IssueSummary, pulls: &IssueSummary) -> f64 {
    let issue_fast = issues.mean_close_days.map(|d| d < RESPONSIVE_DAYS);
    let pull_fast = pulls.mean_close_days.map(|d| d < RESPONSIVE_DAYS);

    if issue_fast.is_none() && pull_fast.is_none() {
        return 0.0;
    }

    match u8::from(issue_fast.unwrap_or(false)) + u8::from(pull_fast.unwrap_or(false)) {
        2 => 1.0,
        1 => 0.7,
        _ => 0.3,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolved_in(days: Option<f64>) -> IssueSummary {
        IssueSummary {
            open: 1,
            closed: u64::from(days.is_some()),
            mean_close_days: days,
        }
    }

    #[test]
    fn both_fast_is_full_marks() {
        let s = score(&resolved_in(Some(2.0)), &resolved_in(Some(1.5)));
        assert!((s - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn one_fast_is_partial_credit() {
        let s = score(&resolved_in(Some(2.0)), &resolved_in(Some(30.0)));
        assert!((s - 0.7).abs() < f64::EPSILON);

        let s = score(&resolved_in(None), &resolved_in(Some(2.0)));
        assert!((s - 0.7).abs() < f64::EPSILON);
    }

    #[test]
    fn both_slow_is_minimal_credit() {
        let s = score(&resolved_in(Some(60.0)), &resolved_in(Some(14.0)));
        assert!((s - 0.3).abs() < f64::EPSILON);
    }

    #[test]
    fn nothing_resolved_is_zero() {
        assert!(score(&resolved_in(None), &resolved_in(None)).abs() < f64::EPSILON);
    }

    #[test]
    fn seven_days_exactly_is_not_fast() {
        let s = score(&resolved_in(Some(RESPONSIVE_DAYS)), &resolved_in(None));
        assert!((s - 0.3).abs() < f64::EPSILON);
    }
}
