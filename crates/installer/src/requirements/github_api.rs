//! GitHub release feed client
//!
//! This module fetches releases by tag from the GitHub REST API, including:
//! - Optional token authentication from the environment
//! - Rate limit tracking from `x-ratelimit-*` response headers
//! - Selection of the newest matching asset for a requirement

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use reqwest::Client;
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap};
use tracing::{debug, error, info};
use url::Url;

use crate::config::{DEFAULT_RELEASE_TAG, FeedConfig};
use crate::requirements::error::{RequirementError, Result};
use crate::requirements::host::Notifier;
use crate::requirements::release::{Release, SelectedAsset, select_asset};
use crate::requirements::{PluginRequirement, SelectionOverride};

const HEADER_LIMIT: &str = "x-ratelimit-limit";
const HEADER_REMAINING: &str = "x-ratelimit-remaining";
const HEADER_RESET: &str = "x-ratelimit-reset";

/// Rate limit state reported by the last feed response
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RateLimitStatus {
    pub limit: Option<u32>,
    pub remaining: Option<u32>,
    pub reset_at: Option<DateTime<Utc>>,
}

impl RateLimitStatus {
    /// Parse the `x-ratelimit-*` headers; absent or malformed values stay `None`
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let number = |name: &str| -> Option<u64> {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse().ok())
        };

        Self {
            limit: number(HEADER_LIMIT).and_then(|v| u32::try_from(v).ok()),
            remaining: number(HEADER_REMAINING).and_then(|v| u32::try_from(v).ok()),
            reset_at: number(HEADER_RESET)
                .and_then(|secs| i64::try_from(secs).ok())
                .and_then(|secs| Utc.timestamp_opt(secs, 0).single()),
        }
    }

    /// No quota left until the reset time
    pub fn is_blocked(&self) -> bool {
        self.remaining == Some(0)
    }

    /// Time until the quota resets, if blocked and the reset is in the future
    pub fn time_until_reset(&self) -> Option<Duration> {
        if !self.is_blocked() {
            return None;
        }
        let reset_at = self.reset_at?;
        (reset_at - Utc::now()).to_std().ok()
    }

    /// Format rate limit status for display
    pub fn format_status(&self) -> String {
        let value = |v: Option<u32>| v.map_or_else(|| "?".to_string(), |v| v.to_string());
        let reset = self
            .reset_at
            .map_or_else(|| "unknown".to_string(), |reset_at| reset_at.to_rfc3339());
        format!(
            "Rate limit: {}/{} remaining, resets at {}",
            value(self.remaining),
            value(self.limit),
            reset
        )
    }
}

/// A raw feed response, before any selection logic
#[derive(Debug, Clone)]
pub struct FeedResponse {
    pub url: String,
    pub status: u16,
    pub rate_limit: RateLimitStatus,
    /// Decoded body of a successful response
    pub release: Option<Release>,
}

impl FeedResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Source of tagged releases
#[async_trait]
pub trait ReleaseFeed: Send + Sync {
    /// Fetch the release with `tag` from the feed at `feed_url`
    ///
    /// Non-success statuses are returned, not raised, so the caller can
    /// inspect the rate limit headers.
    async fn fetch_release_by_tag(&self, feed_url: &str, tag: &str) -> Result<FeedResponse>;

    /// Release channel queried when the caller does not name one
    fn release_tag(&self) -> &str {
        DEFAULT_RELEASE_TAG
    }
}

/// Build `{feed_url}/releases/tags/{tag}`
pub fn release_tag_url(feed_url: &str, tag: &str) -> Result<Url> {
    let mut url = Url::parse(feed_url).map_err(|source| RequirementError::InvalidFeedUrl {
        url: feed_url.to_string(),
        source,
    })?;
    url.path_segments_mut()
        .map_err(|_| RequirementError::Configuration {
            message: format!("Feed URL '{}' cannot be a base", feed_url),
        })?
        .pop_if_empty()
        .extend(["releases", "tags", tag]);
    Ok(url)
}

/// GitHub REST API client for release feeds
#[derive(Clone)]
pub struct GitHubApi {
    client: Client,
    config: FeedConfig,
    rate_limit: Arc<Mutex<Option<RateLimitStatus>>>,
}

impl GitHubApi {
    pub fn new(config: FeedConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.timeout)
            .build()
            .map_err(|e| RequirementError::Configuration {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            config,
            rate_limit: Arc::new(Mutex::new(None)),
        })
    }

    /// Client configured from the environment
    pub fn from_env() -> Result<Self> {
        Self::new(FeedConfig::from_env())
    }

    pub fn config(&self) -> &FeedConfig {
        &self.config
    }

    /// Get the rate limit reported by the most recent response
    pub fn rate_limit_status(&self) -> Option<RateLimitStatus> {
        self.rate_limit.lock().ok().and_then(|status| status.clone())
    }

    fn update_rate_limit(&self, status: &RateLimitStatus) {
        if let Ok(mut current) = self.rate_limit.lock() {
            *current = Some(status.clone());
        }
        debug!("{}", status.format_status());
    }
}

#[async_trait]
impl ReleaseFeed for GitHubApi {
    fn release_tag(&self) -> &str {
        &self.config.release_tag
    }

    async fn fetch_release_by_tag(&self, feed_url: &str, tag: &str) -> Result<FeedResponse> {
        let url = release_tag_url(feed_url, tag)?;
        let url_text = url.to_string();

        let mut request = self
            .client
            .get(url)
            .header(ACCEPT, "application/vnd.github+json")
            .header("X-GitHub-Api-Version", "2022-11-28");
        if let Some(token) = &self.config.token {
            request = request.header(AUTHORIZATION, format!("Bearer {}", token));
        }

        debug!("GitHub API request: {}", url_text);
        let response = request.send().await.map_err(|source| RequirementError::Http {
            url: url_text.clone(),
            source,
        })?;

        let status = response.status();
        let rate_limit = RateLimitStatus::from_headers(response.headers());
        self.update_rate_limit(&rate_limit);

        let release = if status.is_success() {
            let body = response.text().await.map_err(|source| RequirementError::Http {
                url: url_text.clone(),
                source,
            })?;
            let release: Release =
                serde_json::from_str(&body).map_err(|source| RequirementError::Decode {
                    url: url_text.clone(),
                    source,
                })?;
            Some(release)
        } else {
            None
        };

        Ok(FeedResponse {
            url: url_text,
            status: status.as_u16(),
            rate_limit,
            release,
        })
    }
}

/// Fetch the release with `tag` and select the requirement's newest asset
///
/// A refused request with no quota left is returned as
/// [`RequirementError::RateLimited`]. Every other failure is shown through
/// the notifier and yields `Ok(None)`.
pub async fn latest_asset_by_tag(
    feed: &dyn ReleaseFeed,
    requirement: &PluginRequirement,
    selection: Option<&SelectionOverride>,
    tag: &str,
    notifier: &dyn Notifier,
) -> Result<Option<SelectedAsset>> {
    let title = format!("Error fetching the latest release url for {}", requirement.name);

    let response = match feed.fetch_release_by_tag(&requirement.feed_url, tag).await {
        Ok(response) => response,
        Err(err) => {
            error!("{}: {}", title, err);
            notifier.show_error(&title, &err.to_string());
            return Ok(None);
        }
    };

    if !response.is_success() {
        if response.rate_limit.is_blocked() {
            let reset_at = response.rate_limit.reset_at;
            info!(
                "GitHub rate limit exceeded, resets at {}",
                reset_at.map_or_else(|| "unknown".to_string(), |r| r.to_rfc3339())
            );
            return Err(RequirementError::RateLimited { reset_at });
        }

        let err = RequirementError::UnexpectedStatus {
            url: response.url,
            status: response.status,
        };
        error!("{}: {}", title, err);
        notifier.show_error(&title, &err.to_string());
        return Ok(None);
    }

    match response.release {
        Some(release) if !release.assets.is_empty() => {
            Ok(select_asset(&release, requirement, selection))
        }
        _ => {
            debug!("Release '{}' has no assets", tag);
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::requirements::ue4ss_requirement;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[derive(Default)]
    struct RecordingNotifier {
        errors: Mutex<Vec<String>>,
    }

    impl Notifier for RecordingNotifier {
        fn show_activity(&self, _id: &str, _message: &str) {}

        fn dismiss(&self, _id: &str) {}

        fn show_error(&self, title: &str, _detail: &str) {
            self.errors.lock().unwrap().push(title.to_string());
        }
    }

    fn requirement_for(server: &MockServer) -> PluginRequirement {
        PluginRequirement {
            feed_url: format!("{}/repos/UE4SS-RE/RE-UE4SS", server.uri()),
            ..ue4ss_requirement().clone()
        }
    }

    const RELEASE_BODY: &str = r#"{
        "tag_name": "experimental",
        "prerelease": true,
        "assets": [
            {
                "name": "UE4SS_v3.0.1-380-gaaaaaaa.zip",
                "browser_download_url": "https://example.com/old.zip",
                "size": 100,
                "created_at": "2024-04-01T00:00:00Z",
                "updated_at": "2024-04-01T00:00:00Z"
            },
            {
                "name": "UE4SS_v3.0.1-394-g437a8ff.zip",
                "browser_download_url": "https://example.com/new.zip",
                "size": 200,
                "created_at": "2024-05-01T00:00:00Z",
                "updated_at": "2024-05-02T00:00:00Z"
            },
            {
                "name": "zDEV-UE4SS_v3.0.1-394-g437a8ff.zip",
                "browser_download_url": "https://example.com/dev.zip",
                "size": 300,
                "created_at": "2024-05-01T00:00:00Z",
                "updated_at": "2024-06-01T00:00:00Z"
            }
        ]
    }"#;

    #[test]
    fn test_release_tag_url() {
        let feed_url = "https://api.github.com/repos/UE4SS-RE/RE-UE4SS";
        let url = release_tag_url(feed_url, "experimental").unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.github.com/repos/UE4SS-RE/RE-UE4SS/releases/tags/experimental"
        );

        let trailing = release_tag_url("https://api.github.com/repos/a/b/", "v1").unwrap();
        assert_eq!(trailing.as_str(), "https://api.github.com/repos/a/b/releases/tags/v1");

        assert!(matches!(
            release_tag_url("not a url", "v1"),
            Err(RequirementError::InvalidFeedUrl { .. })
        ));
    }

    #[test]
    fn test_release_tag_comes_from_config() {
        let api = GitHubApi::new(FeedConfig::default()).unwrap();
        assert_eq!(api.release_tag(), DEFAULT_RELEASE_TAG);

        let api = GitHubApi::new(FeedConfig::default().with_release_tag("nightly")).unwrap();
        assert_eq!(api.release_tag(), "nightly");
    }

    #[test]
    fn test_rate_limit_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(HEADER_LIMIT, "60".parse().unwrap());
        headers.insert(HEADER_REMAINING, "0".parse().unwrap());
        headers.insert(HEADER_RESET, "1700000000".parse().unwrap());

        let status = RateLimitStatus::from_headers(&headers);
        assert_eq!(status.limit, Some(60));
        assert!(status.is_blocked());
        assert_eq!(status.reset_at.unwrap().timestamp(), 1_700_000_000);
        // Reset time in the past
        assert_eq!(status.time_until_reset(), None);

        let missing = RateLimitStatus::from_headers(&HeaderMap::new());
        assert!(!missing.is_blocked());
        assert_eq!(missing, RateLimitStatus::default());
    }

    #[tokio::test]
    async fn test_selects_newest_matching_asset() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/UE4SS-RE/RE-UE4SS/releases/tags/experimental"))
            .and(header("accept", "application/vnd.github+json"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(RELEASE_BODY)
                    .insert_header("content-type", "application/json")
                    .insert_header(HEADER_LIMIT, "60")
                    .insert_header(HEADER_REMAINING, "59")
                    .insert_header(HEADER_RESET, "1700000000"),
            )
            .mount(&server)
            .await;

        let api = GitHubApi::new(FeedConfig::default()).unwrap();
        let notifier = RecordingNotifier::default();
        let requirement = requirement_for(&server);

        let selected = latest_asset_by_tag(&api, &requirement, None, "experimental", &notifier)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(selected.name(), "UE4SS_v3.0.1-394-g437a8ff.zip");
        assert_eq!(selected.download_url(), "https://example.com/new.zip");
        assert_eq!(selected.tag_name(), "experimental");
        assert!(notifier.errors.lock().unwrap().is_empty());

        let status = api.rate_limit_status().unwrap();
        assert_eq!(status.remaining, Some(59));
        assert!(!status.is_blocked());
    }

    #[tokio::test]
    async fn test_override_pins_older_asset() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/UE4SS-RE/RE-UE4SS/releases/tags/experimental"))
            .respond_with(ResponseTemplate::new(200).set_body_string(RELEASE_BODY))
            .mount(&server)
            .await;

        let api = GitHubApi::new(FeedConfig::default()).unwrap();
        let notifier = RecordingNotifier::default();
        let requirement = requirement_for(&server);
        let selection = SelectionOverride::for_version(&requirement, "3.0.1-380-gaaaaaaa");

        let selected =
            latest_asset_by_tag(&api, &requirement, Some(&selection), "experimental", &notifier)
                .await
                .unwrap()
                .unwrap();
        assert_eq!(selected.download_url(), "https://example.com/old.zip");
    }

    #[tokio::test]
    async fn test_rate_limited_response() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/UE4SS-RE/RE-UE4SS/releases/tags/experimental"))
            .respond_with(
                ResponseTemplate::new(403)
                    .set_body_string(r#"{"message": "API rate limit exceeded"}"#)
                    .insert_header(HEADER_LIMIT, "60")
                    .insert_header(HEADER_REMAINING, "0")
                    .insert_header(HEADER_RESET, "1700000000"),
            )
            .mount(&server)
            .await;

        let api = GitHubApi::new(FeedConfig::default()).unwrap();
        let notifier = RecordingNotifier::default();
        let requirement = requirement_for(&server);

        let err = latest_asset_by_tag(&api, &requirement, None, "experimental", &notifier)
            .await
            .unwrap_err();

        match err {
            RequirementError::RateLimited { reset_at } => {
                assert_eq!(reset_at.unwrap().timestamp(), 1_700_000_000);
            }
            other => panic!("Expected rate limit error, got {:?}", other),
        }
        assert!(notifier.errors.lock().unwrap().is_empty());
        assert!(api.rate_limit_status().unwrap().is_blocked());
    }

    #[tokio::test]
    async fn test_not_found_notifies_and_yields_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/UE4SS-RE/RE-UE4SS/releases/tags/missing"))
            .respond_with(
                ResponseTemplate::new(404)
                    .insert_header(HEADER_REMAINING, "42"),
            )
            .mount(&server)
            .await;

        let api = GitHubApi::new(FeedConfig::default()).unwrap();
        let notifier = RecordingNotifier::default();
        let requirement = requirement_for(&server);

        let result = latest_asset_by_tag(&api, &requirement, None, "missing", &notifier)
            .await
            .unwrap();
        assert!(result.is_none());

        let errors = notifier.errors.lock().unwrap();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("UE4SS v3"));
    }

    #[tokio::test]
    async fn test_release_without_assets() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/UE4SS-RE/RE-UE4SS/releases/tags/experimental"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(r#"{"tag_name": "experimental", "assets": []}"#),
            )
            .mount(&server)
            .await;

        let api = GitHubApi::new(FeedConfig::default()).unwrap();
        let notifier = RecordingNotifier::default();
        let requirement = requirement_for(&server);

        let result = latest_asset_by_tag(&api, &requirement, None, "experimental", &notifier)
            .await
            .unwrap();
        assert!(result.is_none());
        assert!(notifier.errors.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_body_notifies() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/UE4SS-RE/RE-UE4SS/releases/tags/experimental"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let api = GitHubApi::new(FeedConfig::default()).unwrap();
        let notifier = RecordingNotifier::default();
        let requirement = requirement_for(&server);

        let result = latest_asset_by_tag(&api, &requirement, None, "experimental", &notifier)
            .await
            .unwrap();
        assert!(result.is_none());
        assert_eq!(notifier.errors.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_token_is_sent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/UE4SS-RE/RE-UE4SS/releases/tags/experimental"))
            .and(header("authorization", "Bearer secret"))
            .respond_with(ResponseTemplate::new(200).set_body_string(RELEASE_BODY))
            .mount(&server)
            .await;

        let api = GitHubApi::new(FeedConfig::default().with_token("secret")).unwrap();
        let response = api
            .fetch_release_by_tag(&requirement_for(&server).feed_url, "experimental")
            .await
            .unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(response.release.unwrap().assets.len(), 3);
    }
}
