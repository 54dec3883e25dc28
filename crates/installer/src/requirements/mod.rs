//! Companion tool requirements
//!
//! A requirement describes an external dependency the game's mods rely on
//! (UE4SS), where its releases are published and how the right archive is
//! picked from a release. Requirements are immutable; pinning an exact
//! version for one install goes through a [`SelectionOverride`].

pub mod error;
pub mod github_api;
pub mod host;
pub mod orchestrator;
pub mod release;
pub mod version;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::game::ue4ss;
use crate::requirements::host::{InstalledMod, ModStore, PendingDownload};

pub use error::RequirementError;
pub use github_api::{GitHubApi, RateLimitStatus, ReleaseFeed};
pub use orchestrator::{
    DependencyOrchestrator, InstallOutcome, InstallReport, InstallStep, VersionCheck,
};
pub use release::{Release, ReleaseAsset, SelectedAsset};
pub use version::ResolvedVersion;

/// Placeholder replaced by a version string in [`PluginRequirement::archive_name_template`]
pub const VERSION_PLACEHOLDER: &str = "{version}";

/// Static description of an external dependency
#[derive(Debug, Clone)]
pub struct PluginRequirement {
    pub name: String,
    pub user_facing_name: String,
    /// Mod type the dependency is installed as; empty is the default type
    pub mod_type: String,
    /// File whose presence in an installed mod identifies the dependency
    pub assembly_file_name: String,
    /// Release feed API base, e.g. `https://api.github.com/repos/<owner>/<repo>`
    pub feed_url: String,
    pub archive_pattern: Option<Regex>,
    pub archive_file_name: Option<String>,
    /// Exact archive name for a given version, containing [`VERSION_PLACEHOLDER`]
    pub archive_name_template: String,
    /// Extracts the version from an archive name as capture group 1
    pub file_version_pattern: Option<Regex>,
    pub author: String,
    pub source: String,
    pub source_uri: String,
}

/// How assets are filtered for one selection
#[derive(Debug, Clone, Copy)]
pub enum AssetFilter<'a> {
    Pattern(&'a Regex),
    ExactName(&'a str),
}

impl AssetFilter<'_> {
    pub fn matches(&self, asset_name: &str) -> bool {
        match self {
            AssetFilter::Pattern(pattern) => pattern.is_match(asset_name),
            AssetFilter::ExactName(name) => asset_name == *name,
        }
    }
}

/// Per-call replacement of a requirement's archive selection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionOverride {
    pub archive_file_name: String,
}

impl SelectionOverride {
    pub fn exact<S: Into<String>>(archive_file_name: S) -> Self {
        Self {
            archive_file_name: archive_file_name.into(),
        }
    }

    /// Pin the archive for a specific version of the requirement
    pub fn for_version(requirement: &PluginRequirement, version: &str) -> Self {
        Self::exact(requirement.archive_name_for(version))
    }
}

impl PluginRequirement {
    /// Exact archive file name published for `version`
    pub fn archive_name_for(&self, version: &str) -> String {
        self.archive_name_template.replace(VERSION_PLACEHOLDER, version)
    }

    /// Asset filter in effect, the override taking precedence over the pattern
    pub fn asset_filter<'a>(
        &'a self,
        selection: Option<&'a SelectionOverride>,
    ) -> Option<AssetFilter<'a>> {
        if let Some(selection) = selection {
            return Some(AssetFilter::ExactName(&selection.archive_file_name));
        }
        match (&self.archive_pattern, &self.archive_file_name) {
            (Some(pattern), _) => Some(AssetFilter::Pattern(pattern)),
            (None, Some(name)) => Some(AssetFilter::ExactName(name)),
            (None, None) => None,
        }
    }

    /// First installed mod carrying the requirement's assembly file
    pub async fn find_mod(&self, store: &dyn ModStore, game_id: &str) -> Option<InstalledMod> {
        host::find_mod_by_file(store, game_id, &self.mod_type, &self.assembly_file_name).await
    }

    /// First pending download whose archive matches the requirement
    pub fn find_download_id(&self, downloads: &[PendingDownload]) -> Option<String> {
        host::find_download_id_by_pattern(downloads, self)
    }
}

static UE4SS_REQUIREMENT: Lazy<PluginRequirement> = Lazy::new(|| PluginRequirement {
    name: ue4ss::NAME.to_string(),
    user_facing_name: "UE4 Scripting System".to_string(),
    mod_type: String::new(),
    assembly_file_name: ue4ss::DLL_FILE.to_string(),
    feed_url: "https://api.github.com/repos/UE4SS-RE/RE-UE4SS".to_string(),
    // Experimental builds are named after `git describe`
    archive_pattern: Some(
        Regex::new(r"^UE4SS_v(\d+\.\d+\.\d+-\d+-[a-z\d]+)\.zip").expect("valid archive pattern"),
    ),
    archive_file_name: None,
    archive_name_template: "UE4SS_v{version}.zip".to_string(),
    file_version_pattern: Some(Regex::new(r"^UE4SS_v(.+)\.zip").expect("valid version pattern")),
    author: "UE4SS".to_string(),
    source: "user-generated".to_string(),
    source_uri: "https://github.com/UE4SS-RE/RE-UE4SS".to_string(),
});

/// The UE4SS v3 requirement
pub fn ue4ss_requirement() -> &'static PluginRequirement {
    &UE4SS_REQUIREMENT
}
