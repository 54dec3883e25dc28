//! Release feed payloads and asset selection

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::requirements::{PluginRequirement, SelectionOverride};

/// A single downloadable file attached to a release
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseAsset {
    pub name: String,
    pub browser_download_url: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub content_type: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A tagged release and its assets
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Release {
    pub tag_name: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub prerelease: bool,
    #[serde(default)]
    pub html_url: Option<String>,
    #[serde(default)]
    pub assets: Vec<ReleaseAsset>,
}

/// An asset chosen from a release, with the release it belongs to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedAsset {
    pub asset: ReleaseAsset,
    pub release: Release,
}

impl SelectedAsset {
    pub fn name(&self) -> &str {
        &self.asset.name
    }

    pub fn download_url(&self) -> &str {
        &self.asset.browser_download_url
    }

    pub fn tag_name(&self) -> &str {
        &self.release.tag_name
    }
}

/// Pick the most recently updated asset accepted by the requirement's filter
///
/// Ties on `updated_at` keep the asset listed first. A requirement without a
/// pattern or file name is a configuration error and selects nothing.
pub fn select_asset(
    release: &Release,
    requirement: &PluginRequirement,
    selection: Option<&SelectionOverride>,
) -> Option<SelectedAsset> {
    let Some(filter) = requirement.asset_filter(selection) else {
        error!(
            "Requirement '{}' needs an archive pattern or archive file name",
            requirement.name
        );
        return None;
    };

    let chosen = release
        .assets
        .iter()
        .filter(|asset| filter.matches(&asset.name))
        .fold(None::<&ReleaseAsset>, |best, asset| match best {
            Some(best) if best.updated_at >= asset.updated_at => Some(best),
            _ => Some(asset),
        })?;

    debug!(
        "Selected asset {} from release {} ({})",
        chosen.name,
        release.tag_name,
        format_bytes(chosen.size, 2)
    );

    Some(SelectedAsset {
        asset: chosen.clone(),
        release: release.clone(),
    })
}

const BYTE_UNITS: [&str; 9] = ["Bytes", "KB", "MB", "GB", "TB", "PB", "EB", "ZB", "YB"];

/// Human-readable size using base 1024, trailing zeros trimmed
pub fn format_bytes(bytes: u64, decimals: usize) -> String {
    if bytes == 0 {
        return "0 Bytes".to_string();
    }

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < BYTE_UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    let mut formatted = format!("{:.*}", decimals, value);
    if formatted.contains('.') {
        let trimmed = formatted.trim_end_matches('0').trim_end_matches('.').len();
        formatted.truncate(trimmed);
    }
    format!("{} {}", formatted, BYTE_UNITS[unit])
}
