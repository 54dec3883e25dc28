//! Configuration types for the release feed client

use std::time::Duration;

/// Release channel UE4SS publishes its v3 builds under
pub const DEFAULT_RELEASE_TAG: &str = "experimental";

/// Configuration for release feed requests
#[derive(Debug, Clone)]
pub struct FeedConfig {
    pub user_agent: String,
    pub timeout: Duration,
    /// Tag looked up on the feed when resolving the latest asset
    pub release_tag: String,
    /// Optional personal access token, raises the anonymous rate limit
    pub token: Option<String>,
}

impl FeedConfig {
    /// Load a configuration, picking up `GITHUB_TOKEN` from the environment or `.env`
    pub fn from_env() -> Self {
        dotenv::dotenv().ok(); // Ignore error if .env not present
        let token = std::env::var("GITHUB_TOKEN")
            .ok()
            .filter(|token| !token.trim().is_empty());

        Self {
            token,
            ..Self::default()
        }
    }

    pub fn with_user_agent<S: Into<String>>(mut self, user_agent: S) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_release_tag<S: Into<String>>(mut self, tag: S) -> Self {
        self.release_tag = tag.into();
        self
    }

    pub fn with_token<S: Into<String>>(mut self, token: S) -> Self {
        self.token = Some(token.into());
        self
    }
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            user_agent: concat!("grounded-installer/", env!("CARGO_PKG_VERSION")).to_string(),
            timeout: Duration::from_secs(30),
            release_tag: DEFAULT_RELEASE_TAG.to_string(),
            token: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = FeedConfig::default();
        assert_eq!(config.release_tag, "experimental");
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert!(config.user_agent.starts_with("grounded-installer/"));
        assert!(config.token.is_none());
    }

    #[test]
    fn test_builder_overrides() {
        let config = FeedConfig::default()
            .with_release_tag("v3.0.1")
            .with_timeout(Duration::from_secs(5))
            .with_token("abc");
        assert_eq!(config.release_tag, "v3.0.1");
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.token.as_deref(), Some("abc"));
    }
}
