//! Version resolution for release assets and pending downloads

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use semver::Version;
use tracing::debug;

use crate::requirements::PluginRequirement;
use crate::requirements::host::PendingDownload;
use crate::requirements::release::SelectedAsset;

static COERCE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+)(?:\.(\d+))?(?:\.(\d+))?").expect("valid coerce pattern"));

/// A semantic version that is always valid
///
/// `0.0.0` is the sentinel for "no version could be extracted" and must not
/// be read as a real release.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ResolvedVersion(Version);

impl ResolvedVersion {
    pub fn new(version: Version) -> Self {
        Self(version)
    }

    pub fn unknown() -> Self {
        Self(Version::new(0, 0, 0))
    }

    pub fn is_unknown(&self) -> bool {
        self.0 == Version::new(0, 0, 0)
    }

    pub fn as_semver(&self) -> &Version {
        &self.0
    }

    /// Strict parse, `None` when the text is not a semantic version
    pub fn parse(text: &str) -> Option<Self> {
        Version::parse(text.trim()).ok().map(Self)
    }
}

impl Default for ResolvedVersion {
    fn default() -> Self {
        Self::unknown()
    }
}

impl fmt::Display for ResolvedVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Coerce loose text such as `v3`, `release-3.1` or `3.0.1-beta` into a version
///
/// The first run of up to three dot-separated numbers wins, missing parts are
/// zero and anything after them is ignored.
pub fn coerce(text: &str) -> Option<Version> {
    let captures = COERCE_RE.captures(text)?;
    let part = |index: usize| -> Option<u64> {
        match captures.get(index) {
            Some(found) => found.as_str().parse().ok(),
            None => Some(0),
        }
    };
    Some(Version::new(part(1)?, part(2)?, part(3)?))
}

/// Version of `file_name` according to the requirement's file version pattern
pub fn version_from_file_name(file_name: &str, requirement: &PluginRequirement) -> Option<Version> {
    let pattern = requirement.file_version_pattern.as_ref()?;
    let captured = pattern.captures(file_name)?.get(1)?;
    Version::parse(captured.as_str()).ok()
}

/// Resolve a version from a release tag, falling back to the asset's file name
pub fn resolve_version(
    tag_name: &str,
    file_name: &str,
    requirement: &PluginRequirement,
) -> ResolvedVersion {
    if let Some(version) = coerce(tag_name) {
        return ResolvedVersion::new(version);
    }
    match version_from_file_name(file_name, requirement) {
        Some(version) => ResolvedVersion::new(version),
        None => {
            debug!("No version found in tag '{}' or file '{}'", tag_name, file_name);
            ResolvedVersion::unknown()
        }
    }
}

/// Resolve the version of a selected release asset
pub fn resolve_asset_version(
    asset: &SelectedAsset,
    requirement: &PluginRequirement,
) -> ResolvedVersion {
    resolve_version(&asset.release.tag_name, &asset.asset.name, requirement)
}

/// Highest version among pending downloads matching the file version pattern
pub fn resolve_version_by_pattern(
    downloads: &[PendingDownload],
    requirement: &PluginRequirement,
) -> ResolvedVersion {
    downloads
        .iter()
        .filter_map(|download| version_from_file_name(&download.local_path, requirement))
        .map(ResolvedVersion::new)
        .fold(ResolvedVersion::unknown(), |latest, version| latest.max(version))
}
