//! Error types for companion dependency resolution

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors raised while fetching, selecting or installing a requirement
#[derive(Debug, Error)]
pub enum RequirementError {
    /// The feed refused the request and no quota is left until `reset_at`
    #[error("Release feed rate limit exceeded{}", reset_suffix(.reset_at))]
    RateLimited { reset_at: Option<DateTime<Utc>> },

    #[error("HTTP request to '{url}' failed")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Release feed '{url}' responded with status {status}")]
    UnexpectedStatus { url: String, status: u16 },

    #[error("Failed to decode release payload from '{url}'")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid configuration: {message}")]
    Configuration { message: String },

    #[error("Invalid feed URL '{url}'")]
    InvalidFeedUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    /// The release has no asset matching the requirement's selection
    #[error("No release asset found for '{requirement}'")]
    NoAsset { requirement: String },

    #[error("Download failed: {message}")]
    Download { message: String },

    #[error("Install failed: {message}")]
    Install { message: String },

    #[error("No active profile for the game")]
    NoActiveProfile,
}

fn reset_suffix(reset_at: &Option<DateTime<Utc>>) -> String {
    match reset_at {
        Some(reset_at) => format!(" (resets at {})", reset_at.to_rfc3339()),
        None => String::new(),
    }
}

impl RequirementError {
    /// Whether the caller may retry once the feed quota resets
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, RequirementError::RateLimited { .. })
    }

    /// Check if this error is recoverable by retrying later
    pub fn is_recoverable(&self) -> bool {
        match self {
            RequirementError::RateLimited { .. } => true,
            RequirementError::Http { source, .. } => {
                source.status().is_none_or(|status| status.is_server_error())
            }
            RequirementError::UnexpectedStatus { status, .. } => *status >= 500,
            RequirementError::Download { .. } => true,
            _ => false,
        }
    }

    /// Get error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            RequirementError::RateLimited { .. } => "rate_limited",
            RequirementError::Http { .. } => "http_request",
            RequirementError::UnexpectedStatus { .. } => "unexpected_status",
            RequirementError::Decode { .. } => "decode",
            RequirementError::Configuration { .. } => "configuration",
            RequirementError::InvalidFeedUrl { .. } => "invalid_feed_url",
            RequirementError::NoAsset { .. } => "no_asset",
            RequirementError::Download { .. } => "download",
            RequirementError::Install { .. } => "install",
            RequirementError::NoActiveProfile => "no_active_profile",
        }
    }
}

pub type Result<T> = std::result::Result<T, RequirementError>;

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_rate_limited_message_includes_reset() {
        let reset_at = Utc.timestamp_opt(1_700_000_000, 0).single();
        let err = RequirementError::RateLimited { reset_at };
        assert!(err.is_rate_limited());
        assert!(err.is_recoverable());
        assert!(err.to_string().contains("2023-11-14T22:13:20"));

        let unknown = RequirementError::RateLimited { reset_at: None };
        assert_eq!(unknown.to_string(), "Release feed rate limit exceeded");
    }

    #[test]
    fn test_categories() {
        assert_eq!(RequirementError::NoActiveProfile.category(), "no_active_profile");
        let status = RequirementError::UnexpectedStatus {
            url: "https://example.com".into(),
            status: 404,
        };
        assert_eq!(status.category(), "unexpected_status");
        assert!(!status.is_rate_limited());
        assert!(!status.is_recoverable());
    }
}
