//! Quality scoring engine.
//!
//! Seven metrics are computed concurrently over repository facts and folded
//! into one net score. The license metric acts as a multiplicative gate: an
//! incompatible or undeterminable license forces the net score to zero no
//! matter what the other six say. A metric whose fact gathering fails is
//! recorded as its "unknown" sentinel rather than aborting the whole
//! computation.

mod bus_factor;
mod correctness;
mod license;
mod pinning;
mod pull_request;
mod ramp_up;
mod responsiveness;

use crate::Result;
use crate::config::RegistryConfig;
use crate::error::RegistryError;
use crate::facts::{FactProvider, RepoSpec};
use crate::model::QualityRating;
use std::time::Instant;

const LOG_TARGET: &str = "   scoring";

const RAMP_UP_WEIGHT: f64 = 0.3;
const CORRECTNESS_WEIGHT: f64 = 0.2;
const RESPONSIVENESS_WEIGHT: f64 = 0.2;
const PINNING_WEIGHT: f64 = 0.1;
const PULL_REQUEST_WEIGHT: f64 = 0.1;
const BUS_FACTOR_WEIGHT: f64 = 0.1;

/// Sentinel recorded when a metric's fact gathering fails.
const UNKNOWN: f64 = 0.0;
const UNKNOWN_BUS_FACTOR: f64 = -1.0;

/// Computes [`QualityRating`]s for one repository at a time.
#[derive(Debug)]
pub struct ScoreEngine<'a, F> {
    facts: &'a F,
    config: &'a RegistryConfig,
}

impl<'a, F: FactProvider> ScoreEngine<'a, F> {
    #[must_use]
    pub const fn new(facts: &'a F, config: &'a RegistryConfig) -> Self {
        Self { facts, config }
    }

    /// Score a repository. Always produces a rating; individual metric
    /// failures degrade to sentinels.
    pub async fn score(&self, repo: &RepoSpec) -> QualityRating {
        log::debug!(target: LOG_TARGET, "Scoring repository '{repo}'");
        let started = Instant::now();

        let (license, correctness, ramp_up, responsiveness, pinning, pull_request, bus_factor) = tokio::join!(
            timed(self.license_metric(repo)),
            timed(self.correctness_metric(repo)),
            timed(self.ramp_up_metric(repo)),
            timed(self.responsiveness_metric(repo)),
            timed(self.pinning_metric(repo)),
            timed(self.pull_request_metric(repo)),
            timed(self.bus_factor_metric(repo)),
        );

        let (license_score, license_score_latency) = recover("License", license, UNKNOWN);
        let (correctness, correctness_latency) = recover("Correctness", correctness, UNKNOWN);
        let (ramp_up, ramp_up_latency) = recover("RampUp", ramp_up, UNKNOWN);
        let (responsive_maintainer, responsive_maintainer_latency) = recover("ResponsiveMaintainer", responsiveness, UNKNOWN);
        let (good_pinning_practice, good_pinning_practice_latency) = recover("GoodPinningPractice", pinning, UNKNOWN);
        let (pull_request, pull_request_latency) = recover("PullRequest", pull_request, UNKNOWN);
        let (bus_factor, bus_factor_latency) = recover("BusFactor", bus_factor, UNKNOWN_BUS_FACTOR);

        let net_score = weighted_net(
            license_score,
            ramp_up,
            correctness,
            responsive_maintainer,
            good_pinning_practice,
            pull_request,
            bus_factor,
        );

        let net_score_latency = started.elapsed().as_secs_f64();
        log::debug!(target: LOG_TARGET, "Repository '{repo}' scored {net_score:.3} in {net_score_latency:.2}s");

        QualityRating {
            bus_factor,
            bus_factor_latency,
            correctness,
            correctness_latency,
            ramp_up,
            ramp_up_latency,
            responsive_maintainer,
            responsive_maintainer_latency,
            license_score,
            license_score_latency,
            good_pinning_practice,
            good_pinning_practice_latency,
            pull_request,
            pull_request_latency,
            net_score,
            net_score_latency,
        }
    }

    async fn license_metric(&self, repo: &RepoSpec) -> Result<f64> {
        let declared = match self.facts.license(repo).await? {
            Some(license) => Some(license),
            // Fall back to whatever the manifest claims.
            None => self.facts.manifest(repo).await?.and_then(|m| m.license),
        };

        Ok(license::score(declared.as_deref()))
    }

    async fn correctness_metric(&self, repo: &RepoSpec) -> Result<f64> {
        let (issues, pulls, releases, commits) = tokio::join!(
            self.facts.issues(repo),
            self.facts.pulls(repo),
            self.facts.release_count(repo),
            self.facts.recent_commits(repo),
        );

        Ok(correctness::score(&issues?, &pulls?, releases?, commits?))
    }

    async fn ramp_up_metric(&self, repo: &RepoSpec) -> Result<f64> {
        Ok(ramp_up::score(&self.facts.file_listing(repo).await?))
    }

    async fn responsiveness_metric(&self, repo: &RepoSpec) -> Result<f64> {
        let (issues, pulls) = tokio::join!(self.facts.issues(repo), self.facts.pulls(repo));
        Ok(responsiveness::score(&issues?, &pulls?))
    }

    async fn pinning_metric(&self, repo: &RepoSpec) -> Result<f64> {
        // A repository without a manifest declares no dependencies.
        let dependencies = self.facts.manifest(repo).await?.map(|m| m.dependencies).unwrap_or_default();
        Ok(pinning::score(&dependencies))
    }

    async fn pull_request_metric(&self, repo: &RepoSpec) -> Result<f64> {
        let coverage = self.facts.review_coverage(repo, self.config.merged_pr_sample).await?;
        Ok(pull_request::score(&coverage))
    }

    async fn bus_factor_metric(&self, repo: &RepoSpec) -> Result<f64> {
        Ok(bus_factor::score(&self.facts.contributors(repo).await?))
    }
}

/// The license score multiplies the weighted sum of the other six metrics.
fn weighted_net(
    license: f64,
    ramp_up: f64,
    correctness: f64,
    responsiveness: f64,
    pinning: f64,
    pull_request: f64,
    bus_factor: f64,
) -> f64 {
    license
        * (RAMP_UP_WEIGHT * ramp_up
            + CORRECTNESS_WEIGHT * correctness
            + RESPONSIVENESS_WEIGHT * responsiveness
            + PINNING_WEIGHT * pinning
            + PULL_REQUEST_WEIGHT * pull_request
            + BUS_FACTOR_WEIGHT * bus_factor)
}

async fn timed<T>(fut: impl Future<Output = T>) -> (T, f64) {
    let started = Instant::now();
    let value = fut.await;
    (value, started.elapsed().as_secs_f64())
}

fn recover(metric: &str, outcome: (Result<f64>, f64), sentinel: f64) -> (f64, f64) {
    match outcome {
        (Ok(value), latency) => (value, latency),
        (Err(e), latency) => {
            log::debug!(target: LOG_TARGET, "Metric {metric} failed, recording sentinel {sentinel}: {e}");
            (sentinel, latency)
        }
    }
}

/// A rating's fate at the admission gate.
pub fn check_gate(rating: &QualityRating, threshold: f64) -> Result<()> {
    if rating.net_score < threshold {
        return Err(RegistryError::QualityGate {
            net_score: rating.net_score,
            threshold,
        });
    }
    Ok(())
}
