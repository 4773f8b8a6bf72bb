use crate::facts::IssueSummary;

const COMMIT_WINDOW_DAYS: f64 = 30.0;

/// Mean of three clamped ratios: closed-issue ratio, release-to-open-PR
/// ratio, and recent commit activity.
#[expect(clippy::cast_precision_loss, reason = "counts fit comfortably in f64")]
pub(crate) fn score(issues: &IssueSummary, pulls: &IssueSummary, releases: u64, recent_commits: u64) -> f64 {
    let issue_total = issues.open + issues.closed;
    let closed_ratio = if issue_total == 0 {
        0.0
    } else {
        issues.closed as f64 / issue_total as f64
    };

    // No open pull requests means no release backlog, as long as anything
    // was ever released.
    let release_ratio = if pulls.open == 0 {
        if releases > 0 { 1.0 } else { 0.0 }
    } else {
        (releases as f64 / pulls.open as f64).clamp(0.0, 1.0)
    };

    let activity = (recent_commits as f64 / COMMIT_WINDOW_DAYS).min(1.0);

    (closed_ratio + release_ratio + activity) / 3.0
}
