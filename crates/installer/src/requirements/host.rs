//! Host application seams
//!
//! The mod store, download manager and notification surface belong to the
//! host. This module defines the narrow interfaces used to talk to them and
//! helpers that locate installed mods by walking their file trees.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::game;
use crate::requirements::PluginRequirement;
use crate::requirements::error::Result;

/// Lifecycle state of a mod tracked by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModState {
    Downloading,
    Downloaded,
    Installing,
    Installed,
}

/// A mod record owned by the host's mod store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstalledMod {
    pub id: String,
    /// Empty for the default mod type
    #[serde(rename = "type", default)]
    pub mod_type: String,
    pub state: ModState,
    /// Folder relative to the store's install path
    pub installation_path: String,
    #[serde(default)]
    pub attributes: HashMap<String, Value>,
}

impl InstalledMod {
    pub fn attribute_str(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).and_then(Value::as_str)
    }

    pub fn version(&self) -> Option<&str> {
        self.attribute_str(attributes::VERSION)
    }

    pub fn newest_version(&self) -> Option<&str> {
        self.attribute_str(attributes::NEWEST_VERSION)
    }

    /// `updatedTimestamp` in milliseconds, stored either as a number or a string
    pub fn updated_timestamp(&self) -> Option<i64> {
        match self.attributes.get(attributes::UPDATED_TIMESTAMP)? {
            Value::Number(number) => number.as_i64(),
            Value::String(text) => text.parse().ok(),
            _ => None,
        }
    }

    pub fn is_installed(&self) -> bool {
        self.state == ModState::Installed
    }
}

/// Attribute keys stamped on installed mods
pub mod attributes {
    pub const VERSION: &str = "version";
    pub const NEWEST_VERSION: &str = "newestVersion";
    pub const AUTHOR: &str = "author";
    pub const SOURCE: &str = "source";
    pub const NAME: &str = "name";
    pub const LOGICAL_FILE_NAME: &str = "logicalFileName";
    pub const MOD_NAME: &str = "modName";
    pub const SOURCE_URI: &str = "sourceURI";
    pub const CUSTOM_FILE_NAME: &str = "customFileName";
    pub const MOD_ID: &str = "modId";
    pub const UPDATED_TIMESTAMP: &str = "updatedTimestamp";
    pub const UPLOADED_TIMESTAMP: &str = "uploadedTimestamp";
}

/// A download known to the host's download manager
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingDownload {
    pub id: String,
    pub local_path: String,
}

/// Descriptive metadata attached to a started download
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadInfo {
    pub game: String,
    pub name: String,
    pub mod_name: String,
    pub logical_file_name: String,
    pub custom_file_name: String,
    pub author: String,
    pub source: String,
    #[serde(rename = "sourceURI")]
    pub source_uri: String,
}

impl DownloadInfo {
    pub fn for_requirement(game_id: &str, requirement: &PluginRequirement) -> Self {
        Self {
            game: game_id.to_string(),
            name: requirement.name.clone(),
            mod_name: requirement.name.clone(),
            logical_file_name: requirement.name.clone(),
            custom_file_name: requirement.name.clone(),
            author: requirement.author.clone(),
            source: requirement.source.clone(),
            source_uri: requirement.source_uri.clone(),
        }
    }
}

/// What happens when a download with the same name already exists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RedownloadMode {
    Replace,
    Never,
    Ask,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DownloadOptions {
    pub redownload: RedownloadMode,
    /// Let the host install the archive on its own once downloaded
    pub allow_install: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstallOptions {
    pub allow_auto_enable: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnableOptions {
    pub allow_auto_deploy: bool,
    pub installed: bool,
}

/// The host's mod and profile state
#[async_trait]
pub trait ModStore: Send + Sync {
    /// All mods registered for a game
    async fn mods(&self, game_id: &str) -> Vec<InstalledMod>;

    /// Directory mod folders are installed under
    fn install_path(&self, game_id: &str) -> PathBuf;

    fn active_profile(&self, game_id: &str) -> Option<String>;

    async fn is_enabled(&self, profile_id: &str, mod_id: &str) -> bool;

    async fn set_mod_attribute(
        &self,
        game_id: &str,
        mod_id: &str,
        key: &str,
        value: Value,
    ) -> Result<()>;

    async fn set_mod_enabled(&self, profile_id: &str, mod_id: &str, enabled: bool) -> Result<()>;

    async fn set_mods_enabled(
        &self,
        profile_id: &str,
        mod_ids: &[String],
        enabled: bool,
        options: EnableOptions,
    ) -> Result<()>;
}

/// The host's download and install transport
#[async_trait]
pub trait DownloadManager: Send + Sync {
    async fn pending_downloads(&self) -> Vec<PendingDownload>;

    /// Start downloading from the first reachable URL, returning the download id
    async fn start_download(
        &self,
        urls: &[String],
        info: &DownloadInfo,
        options: DownloadOptions,
    ) -> Result<String>;

    /// Install a finished download, returning the new mod id
    async fn start_install(&self, download_id: &str, options: InstallOptions) -> Result<String>;
}

/// User-visible notifications
pub trait Notifier: Send + Sync {
    /// Show a persistent activity notification until dismissed
    fn show_activity(&self, id: &str, message: &str);

    fn dismiss(&self, id: &str);

    fn show_error(&self, title: &str, detail: &str);
}

/// Mods of the given type, or of the default type
pub async fn mods_for_type(
    store: &dyn ModStore,
    game_id: &str,
    mod_type: &str,
) -> Vec<InstalledMod> {
    store
        .mods(game_id)
        .await
        .into_iter()
        .filter(|installed| installed.mod_type == mod_type || installed.mod_type.is_empty())
        .collect()
}

/// Every file below `dir`, skipping hidden, inaccessible and symlinked entries
///
/// A missing directory yields an empty list; mods can be removed or still
/// extracting while the walk runs.
pub fn walk_mod_files(dir: &Path) -> Vec<PathBuf> {
    WalkDir::new(dir)
        .follow_links(false)
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || !is_hidden(entry.file_name()))
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(err) => {
                debug!("Skipping inaccessible entry under {}: {}", dir.display(), err);
                None
            }
        })
        .filter(|entry| !entry.path_is_symlink() && entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .collect()
}

fn is_hidden(name: &std::ffi::OsStr) -> bool {
    name.to_str().is_some_and(|name| name.starts_with('.'))
}

fn mod_contains_file(install_path: &Path, installed: &InstalledMod, file_name: &str) -> bool {
    let mod_path = game::host_path(install_path, &installed.installation_path);
    walk_mod_files(&mod_path)
        .iter()
        .any(|file| file.to_string_lossy().ends_with(file_name))
}

/// First mod whose installed tree contains a file ending in `file_name`
pub async fn find_mod_by_file(
    store: &dyn ModStore,
    game_id: &str,
    mod_type: &str,
    file_name: &str,
) -> Option<InstalledMod> {
    let install_path = store.install_path(game_id);
    mods_for_type(store, game_id, mod_type)
        .await
        .into_iter()
        .find(|installed| mod_contains_file(&install_path, installed, file_name))
}

/// All mods whose installed tree contains a file ending in `file_name`
pub async fn find_mods_by_file(
    store: &dyn ModStore,
    game_id: &str,
    mod_type: &str,
    file_name: &str,
) -> Vec<InstalledMod> {
    let install_path = store.install_path(game_id);
    mods_for_type(store, game_id, mod_type)
        .await
        .into_iter()
        .filter(|installed| mod_contains_file(&install_path, installed, file_name))
        .collect()
}

/// The most recently updated mod carrying `file_name`
pub async fn find_latest_mod(
    store: &dyn ModStore,
    game_id: &str,
    mod_type: &str,
    file_name: &str,
) -> Option<InstalledMod> {
    find_mods_by_file(store, game_id, mod_type, file_name)
        .await
        .into_iter()
        .fold(None, |latest: Option<InstalledMod>, candidate| match latest {
            Some(latest) if latest.updated_timestamp() >= candidate.updated_timestamp() => {
                Some(latest)
            }
            _ => Some(candidate),
        })
}

/// First pending download whose local path matches the requirement's archive pattern
pub fn find_download_id_by_pattern(
    downloads: &[PendingDownload],
    requirement: &PluginRequirement,
) -> Option<String> {
    let Some(pattern) = requirement.archive_pattern.as_ref() else {
        warn!("Requirement '{}' has no archive pattern", requirement.name);
        return None;
    };
    downloads
        .iter()
        .find(|download| pattern.is_match(&download.local_path))
        .map(|download| download.id.clone())
}

/// Last pending download whose file name equals `file_name`, ignoring case
pub fn find_download_id_by_file(downloads: &[PendingDownload], file_name: &str) -> Option<String> {
    downloads
        .iter()
        .rev()
        .find(|download| {
            let base = download
                .local_path
                .rsplit(['\\', '/'])
                .next()
                .unwrap_or(&download.local_path);
            base.eq_ignore_ascii_case(file_name)
        })
        .map(|download| download.id.clone())
}
