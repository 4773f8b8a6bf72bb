use crate::facts::Contributor;

/// Knowledge-concentration score: `1 - k/n` where `n` is the collaborator
/// count and `k` is how many top contributors it takes to cover half of all
/// commits. `-1` is the sentinel for "no collaborators known", distinct
/// from a genuine zero.
#[expect(clippy::cast_precision_loss, reason = "counts fit comfortably in f64")]
pub(crate) fn score(contributors: &[Contributor]) -> f64 {
    if contributors.is_empty() {
        return -1.0;
    }

    let total: u64 = contributors.iter().map(|c| c.commits).sum();
    if total == 0 {
        return -1.0;
    }

    let mut commits: Vec<u64> = contributors.iter().map(|c| c.commits).collect();
    commits.sort_unstable_by(|a, b| b.cmp(a));

    let mut covered = 0;
    let mut k = 0;
    for count in commits {
        k += 1;
        covered += count;
        if covered * 2 >= total {
            break;
        }
    }

    1.0 - k as f64 / contributors.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contributors(commits: &[u64]) -> Vec<Contributor> {
        commits
            .iter()
            .enumerate()
            .map(|(i, &commits)| Contributor {
                login: format!("dev{i}"),
                commits,
            })
            .collect()
    }

    #[test]
    fn no_collaborators_is_the_sentinel() {
        assert!((score(&[]) - -1.0).abs() < f64::EPSILON);
        assert!((score(&contributors(&[0, 0])) - -1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn single_maintainer_scores_zero() {
        assert!(score(&contributors(&[100])).abs() < f64::EPSILON);
    }

    #[test]
    fn dominant_contributor_concentrates_knowledge() {
        // One contributor holds 90% of commits: k=1, n=4.
        let s = score(&contributors(&[90, 5, 3, 2]));
        assert!((s - 0.75).abs() < f64::EPSILON);
    }

    #[test]
    fn evenly_spread_commits_score_high() {
        // Four equal contributors: two cover half, k=2, n=4.
        let s = score(&contributors(&[25, 25, 25, 25]));
        assert!((s - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn order_of_input_does_not_matter() {
        assert!((score(&contributors(&[2, 90, 3, 5])) - score(&contributors(&[90, 5, 3, 2]))).abs() < f64::EPSILON);
    }
}
