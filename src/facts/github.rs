use super::{Contributor, FactProvider, IssueSummary, RepoSpec, ReviewCoverage};
use crate::Result;
use crate::error::UpstreamContext;
use crate::model::Manifest;
use bytes::Bytes;
use chrono::Utc;
use futures::future::join_all;
use octocrab::{Octocrab, models::issues::Issue};
use reqwest::header::LINK;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::sync::LazyLock;

const LOG_TARGET: &str = "    github";
const SECONDS_PER_DAY: f64 = 86400.0;
const COMMIT_LOOKBACK_DAYS: i64 = 30;
const ISSUE_PAGE_SIZE: u8 = 100;
const PULL_PAGE_SIZE: usize = 100;

/// Concurrent per-pull-request detail fetches while sampling review
/// coverage.
const REVIEW_FETCH_BATCH: usize = 16;

/// Pattern to extract the last page number from a GitHub API Link header.
static PAGE_REGEX: LazyLock<regex::Regex> = LazyLock::new(|| regex::Regex::new(r"page=(\d+)>; rel=.last.").expect("invalid regex"));

/// [`FactProvider`] backed by the GitHub REST API.
///
/// Issue and pull-request history goes through octocrab; simple counts use
/// raw requests and read the total off the `Link` pagination header, which
/// costs one request regardless of repository size.
#[derive(Debug, Clone)]
pub struct GithubFactProvider {
    octocrab: Octocrab,
    client: Client,
}

#[derive(Debug, Deserialize)]
struct ContributorRow {
    login: String,
    contributions: u64,
}

#[derive(Debug, Deserialize)]
struct TreeEntry {
    path: String,
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Debug, Deserialize)]
struct TreeResponse {
    tree: Vec<TreeEntry>,
}

#[derive(Debug, Deserialize)]
struct PullRow {
    number: u64,
    merged_at: Option<chrono::DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct PullDetail {
    #[serde(default)]
    additions: u64,
}

#[derive(Debug, Deserialize)]
struct LicenseInfo {
    spdx_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LicenseResponse {
    license: Option<LicenseInfo>,
}

impl GithubFactProvider {
    /// Create a GitHub API client, optionally authenticated.
    pub fn new(token: Option<&str>) -> Result<Self> {
        let mut builder = Octocrab::builder();
        let mut client_builder = Client::builder().user_agent("quay");

        if let Some(t) = token {
            let mut auth_val = reqwest::header::HeaderValue::from_str(&format!("token {t}"))
                .upstream_with(|| "GitHub token contains invalid header characters".to_string())?;
            auth_val.set_sensitive(true);

            let mut headers = reqwest::header::HeaderMap::new();
            let _ = headers.insert(reqwest::header::AUTHORIZATION, auth_val);

            client_builder = client_builder.default_headers(headers);
            builder = builder.personal_token(t);
        }

        Ok(Self {
            octocrab: builder.build().upstream_with(|| "unable to build GitHub client".to_string())?,
            client: client_builder
                .build()
                .upstream_with(|| "unable to build HTTP client".to_string())?,
        })
    }

    async fn count_via_link_header(&self, url: &str) -> Result<u64> {
        log::debug!(target: LOG_TARGET, "Fetching count via Link header from '{url}'");

        let resp = self
            .client
            .get(url)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .upstream_with(|| format!("request to '{url}' failed"))?;

        if let Some(link_header) = resp.headers().get(LINK) {
            let link_str = link_header
                .to_str()
                .upstream_with(|| format!("non-ASCII Link header from '{url}'"))?;
            if let Some(count) = PAGE_REGEX.captures(link_str).and_then(|caps| caps.get(1)) {
                return Ok(count
                    .as_str()
                    .parse()
                    .upstream_with(|| format!("unparseable page count in Link header from '{url}'"))?);
            }
        }

        // No Link header means everything fit on one page.
        let bytes = resp
            .bytes()
            .await
            .upstream_with(|| format!("could not read response body from '{url}'"))?;
        count_json_array_elements(&bytes).upstream_with(|| format!("could not count items in JSON response from '{url}'"))
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .upstream_with(|| format!("request to '{url}' failed"))?;

        resp.json().await.upstream_with(|| format!("malformed JSON response from '{url}'"))
    }

    async fn issue_history(&self, repo: &RepoSpec, want_pulls: bool) -> Result<IssueSummary> {
        log::debug!(target: LOG_TARGET, "Fetching issue history for '{repo}'");

        let mut page = self
            .octocrab
            .issues(repo.owner(), repo.repo())
            .list()
            .state(octocrab::params::State::All)
            .per_page(ISSUE_PAGE_SIZE)
            .send()
            .await
            .upstream_with(|| format!("could not fetch issue history for repository '{repo}'"))?;

        let mut all_issues = page.take_items();

        while let Some(next_uri) = &page.next {
            let next_page = self
                .octocrab
                .get_page::<Issue>(&Some(next_uri.clone()))
                .await
                .upstream_with(|| format!("could not fetch issue history page for repository '{repo}'"))?;

            if let Some(mut next_page) = next_page {
                all_issues.append(&mut next_page.take_items());
                page = next_page;
            } else {
                break;
            }
        }

        let mut open = 0;
        let mut closed = 0;
        let mut close_days = Vec::new();

        for issue in all_issues {
            if issue.pull_request.is_some() != want_pulls {
                continue;
            }

            if issue.state == octocrab::models::IssueState::Open {
                open += 1;
            } else {
                closed += 1;
                if let Some(closed_at) = issue.closed_at {
                    #[expect(clippy::cast_precision_loss, reason = "ages fit comfortably in f64")]
                    let days = (closed_at - issue.created_at).num_seconds() as f64 / SECONDS_PER_DAY;
                    if days.is_finite() && days >= 0.0 {
                        close_days.push(days);
                    }
                }
            }
        }

        #[expect(clippy::cast_precision_loss, reason = "counts fit comfortably in f64")]
        let mean_close_days = (!close_days.is_empty()).then(|| close_days.iter().sum::<f64>() / close_days.len() as f64);

        Ok(IssueSummary {
            open,
            closed,
            mean_close_days,
        })
    }

    /// Numbers of recently merged pull requests, newest first, capped at
    /// `sample`.
    async fn merged_pull_numbers(&self, repo: &RepoSpec, sample: usize) -> Result<Vec<u64>> {
        let mut numbers = Vec::new();
        let mut page_no = 1;

        while numbers.len() < sample {
            let url = format!(
                "https://api.github.com/repos/{}/{}/pulls?state=closed&sort=updated&direction=desc&per_page={PULL_PAGE_SIZE}&page={page_no}",
                repo.owner(),
                repo.repo()
            );
            let rows: Vec<PullRow> = self.get_json(&url).await?;
            let exhausted = rows.len() < PULL_PAGE_SIZE;

            numbers.extend(rows.into_iter().filter(|r| r.merged_at.is_some()).map(|r| r.number));

            if exhausted {
                break;
            }
            page_no += 1;
        }

        numbers.truncate(sample);
        Ok(numbers)
    }

    async fn pull_coverage(&self, repo: &RepoSpec, number: u64) -> Result<(u64, bool)> {
        let base = format!("https://api.github.com/repos/{}/{}/pulls/{number}", repo.owner(), repo.repo());
        let reviews_url = format!("{base}/reviews?per_page=1");

        let (detail, reviews) = tokio::join!(
            self.get_json::<PullDetail>(&base),
            self.count_via_link_header(&reviews_url)
        );

        Ok((detail?.additions, reviews? > 0))
    }
}

impl FactProvider for GithubFactProvider {
    async fn license(&self, repo: &RepoSpec) -> Result<Option<String>> {
        let url = format!("https://api.github.com/repos/{}/{}/license", repo.owner(), repo.repo());

        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .upstream_with(|| format!("request to '{url}' failed"))?;

        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let resp = resp
            .error_for_status()
            .upstream_with(|| format!("request to '{url}' failed"))?;
        let body: LicenseResponse = resp
            .json()
            .await
            .upstream_with(|| format!("malformed license response from '{url}'"))?;

        // GitHub reports unrecognized licenses as NOASSERTION, which tells
        // the license metric nothing.
        Ok(body.license.and_then(|l| l.spdx_id).filter(|id| id != "NOASSERTION"))
    }

    async fn issues(&self, repo: &RepoSpec) -> Result<IssueSummary> {
        self.issue_history(repo, false).await
    }

    async fn pulls(&self, repo: &RepoSpec) -> Result<IssueSummary> {
        self.issue_history(repo, true).await
    }

    async fn release_count(&self, repo: &RepoSpec) -> Result<u64> {
        let url = format!("https://api.github.com/repos/{}/{}/releases?per_page=1", repo.owner(), repo.repo());
        self.count_via_link_header(&url).await
    }

    async fn recent_commits(&self, repo: &RepoSpec) -> Result<u64> {
        let since = (Utc::now() - chrono::Duration::days(COMMIT_LOOKBACK_DAYS)).to_rfc3339();
        let url = format!(
            "https://api.github.com/repos/{}/{}/commits?since={since}&per_page=1",
            repo.owner(),
            repo.repo()
        );
        self.count_via_link_header(&url).await
    }

    async fn contributors(&self, repo: &RepoSpec) -> Result<Vec<Contributor>> {
        // One page of the top 100 is plenty for concentration analysis.
        let url = format!(
            "https://api.github.com/repos/{}/{}/contributors?per_page=100",
            repo.owner(),
            repo.repo()
        );
        let rows: Vec<ContributorRow> = self.get_json(&url).await?;

        Ok(rows
            .into_iter()
            .map(|row| Contributor {
                login: row.login,
                commits: row.contributions,
            })
            .collect())
    }

    async fn file_listing(&self, repo: &RepoSpec) -> Result<Vec<String>> {
        let url = format!(
            "https://api.github.com/repos/{}/{}/git/trees/HEAD?recursive=1",
            repo.owner(),
            repo.repo()
        );
        let tree: TreeResponse = self.get_json(&url).await?;

        Ok(tree.tree.into_iter().filter(|e| e.kind == "blob").map(|e| e.path).collect())
    }

    async fn manifest(&self, repo: &RepoSpec) -> Result<Option<Manifest>> {
        let url = format!("https://raw.githubusercontent.com/{}/{}/HEAD/package.json", repo.owner(), repo.repo());

        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .upstream_with(|| format!("request to '{url}' failed"))?;

        if resp.status() == StatusCode::NOT_FOUND {
            log::debug!(target: LOG_TARGET, "Repository '{repo}' has no root manifest");
            return Ok(None);
        }

        let resp = resp
            .error_for_status()
            .upstream_with(|| format!("request to '{url}' failed"))?;
        let manifest = resp
            .json()
            .await
            .upstream_with(|| format!("malformed manifest in repository '{repo}'"))?;
        Ok(Some(manifest))
    }

    async fn review_coverage(&self, repo: &RepoSpec, sample: usize) -> Result<ReviewCoverage> {
        let numbers = self.merged_pull_numbers(repo, sample).await?;
        log::debug!(target: LOG_TARGET, "Sampling review coverage over {} pull requests for '{repo}'", numbers.len());

        let mut coverage = ReviewCoverage::default();

        for batch in numbers.chunks(REVIEW_FETCH_BATCH) {
            let results = join_all(batch.iter().map(|&n| self.pull_coverage(repo, n))).await;
            for result in results {
                let (additions, reviewed) = result?;
                coverage.total_additions += additions;
                if reviewed {
                    coverage.reviewed_additions += additions;
                }
            }
        }

        Ok(coverage)
    }

    async fn archive(&self, repo: &RepoSpec) -> Result<Bytes> {
        let url = format!("https://codeload.github.com/{}/{}/tar.gz/HEAD", repo.owner(), repo.repo());
        log::debug!(target: LOG_TARGET, "Downloading archive for '{repo}'");

        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .upstream_with(|| format!("could not download archive for repository '{repo}'"))?;

        resp.bytes()
            .await
            .upstream_with(|| format!("could not read archive bytes for repository '{repo}'"))
    }
}

/// Count elements in a JSON array without allocating parsed values.
fn count_json_array_elements(json: &[u8]) -> core::result::Result<u64, serde_json::Error> {
    use serde::de::IgnoredAny;

    let array: Vec<IgnoredAny> = serde_json::from_slice(json)?;
    Ok(array.len() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_json_array_elements() {
        assert_eq!(count_json_array_elements(b"[]").unwrap(), 0);
        assert_eq!(count_json_array_elements(br#"[{"id": 1}]"#).unwrap(), 1);
        assert_eq!(count_json_array_elements(br#"[{"id": 1}, {"id": 2}, {"id": 3}]"#).unwrap(), 3);
        let _ = count_json_array_elements(b"[{broken").unwrap_err();
    }

    #[test]
    fn page_regex_extracts_last_page() {
        let header = r#"<https://api.github.com/repos/a/b/releases?per_page=1&page=2>; rel="next", <https://api.github.com/repos/a/b/releases?per_page=1&page=37>; rel="last""#;
        let caps = PAGE_REGEX.captures(header).unwrap();
        assert_eq!(caps.get(1).unwrap().as_str(), "37");
    }
}
