use serde::{Deserialize, Serialize};

/// One quality rating per package: seven independently computed metric
/// scores with their wall-clock latencies, plus the derived net score.
/// Immutable once written; updates recompute the whole record.
///
/// Field names follow the registry's wire convention.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct QualityRating {
    pub bus_factor: f64,
    pub bus_factor_latency: f64,
    pub correctness: f64,
    pub correctness_latency: f64,
    pub ramp_up: f64,
    pub ramp_up_latency: f64,
    pub responsive_maintainer: f64,
    pub responsive_maintainer_latency: f64,
    pub license_score: f64,
    pub license_score_latency: f64,
    pub good_pinning_practice: f64,
    pub good_pinning_practice_latency: f64,
    pub pull_request: f64,
    pub pull_request_latency: f64,
    pub net_score: f64,
    pub net_score_latency: f64,
}

impl QualityRating {
    /// The rating recorded when no repository facts could be obtained at
    /// all (e.g. an archive upload whose manifest names no repository).
    /// Every metric sits at its "unknown" sentinel, which forces the net
    /// score to zero.
    #[must_use]
    pub const fn unknown() -> Self {
        Self {
            bus_factor: -1.0,
            bus_factor_latency: 0.0,
            correctness: 0.0,
            correctness_latency: 0.0,
            ramp_up: 0.0,
            ramp_up_latency: 0.0,
            responsive_maintainer: 0.0,
            responsive_maintainer_latency: 0.0,
            license_score: 0.0,
            license_score_latency: 0.0,
            good_pinning_practice: 0.0,
            good_pinning_practice_latency: 0.0,
            pull_request: 0.0,
            pull_request_latency: 0.0,
            net_score: 0.0,
            net_score_latency: 0.0,
        }
    }
}
