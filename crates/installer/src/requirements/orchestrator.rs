//! Dependency orchestration
//!
//! Keeps the requirement installed and current: checks the feed for a newer
//! build, disables superseded installs, downloads and installs the selected
//! asset, stamps its metadata and enables it.
//!
//! Callers must serialize [`DependencyOrchestrator::install`] per requirement;
//! two concurrent installs may both start downloads.

use std::sync::Arc;

use serde_json::{Value, json};
use tracing::{debug, error, info, warn};

use crate::game;
use crate::requirements::error::{RequirementError, Result};
use crate::requirements::github_api::{ReleaseFeed, latest_asset_by_tag};
use crate::requirements::host::{
    self, DownloadInfo, DownloadManager, DownloadOptions, EnableOptions, InstallOptions,
    InstalledMod, ModStore, Notifier, RedownloadMode, attributes,
};
use crate::requirements::release::SelectedAsset;
use crate::requirements::version::{ResolvedVersion, resolve_asset_version};
use crate::requirements::{PluginRequirement, SelectionOverride};

/// Notification shown while a requirement is being installed
pub const INSTALL_NOTIFICATION_ID: &str = "grounded-installing-requirements";

/// Named steps of an install, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InstallStep {
    Notify,
    DisableConflicts,
    SelectAsset,
    StartDownload,
    StartInstall,
    StampAttributes,
    Enable,
    Dismiss,
}

#[derive(Debug)]
pub enum InstallOutcome {
    Installed { mod_id: String, version: ResolvedVersion },
    /// `step` failed; every step before it completed and is not rolled back
    Aborted { step: InstallStep, error: RequirementError },
}

/// Steps that ran and how the install ended
#[derive(Debug)]
pub struct InstallReport {
    pub completed: Vec<InstallStep>,
    pub outcome: InstallOutcome,
}

impl InstallReport {
    pub fn is_installed(&self) -> bool {
        matches!(self.outcome, InstallOutcome::Installed { .. })
    }
}

/// Result of comparing the installed build with the feed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionCheck {
    /// Not the owning game, or the requirement is not installed
    Skipped,
    /// The installed mod has no recorded version
    Unversioned,
    /// The feed offered no matching asset
    NoRelease,
    /// The feed build's version could not be determined
    Unknown,
    UpToDate { version: String },
    /// `newestVersion` was stamped on the installed mod
    UpdateAvailable { installed: String, newest: ResolvedVersion },
}

/// Drives installation and updates of one requirement
pub struct DependencyOrchestrator {
    requirement: PluginRequirement,
    game_id: String,
    release_tag: String,
    feed: Arc<dyn ReleaseFeed>,
    store: Arc<dyn ModStore>,
    downloads: Arc<dyn DownloadManager>,
    notifier: Arc<dyn Notifier>,
}

impl DependencyOrchestrator {
    pub fn new(
        requirement: PluginRequirement,
        feed: Arc<dyn ReleaseFeed>,
        store: Arc<dyn ModStore>,
        downloads: Arc<dyn DownloadManager>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            requirement,
            game_id: game::GAME_ID.to_string(),
            release_tag: feed.release_tag().to_string(),
            feed,
            store,
            downloads,
            notifier,
        }
    }

    /// Query `tag` instead of the feed's configured release channel
    pub fn with_release_tag<S: Into<String>>(mut self, tag: S) -> Self {
        self.release_tag = tag.into();
        self
    }

    pub fn release_tag(&self) -> &str {
        &self.release_tag
    }

    pub fn requirement(&self) -> &PluginRequirement {
        &self.requirement
    }

    /// The most recently updated installed copy of the requirement
    pub async fn latest_installed(&self) -> Option<InstalledMod> {
        host::find_latest_mod(
            self.store.as_ref(),
            &self.game_id,
            &self.requirement.mod_type,
            &self.requirement.assembly_file_name,
        )
        .await
    }

    /// Record `newestVersion` on the installed mod when the feed has a different build
    ///
    /// Never installs anything. Rate limiting is returned so the caller can retry.
    pub async fn check_version(&self, game_id: &str) -> Result<VersionCheck> {
        if game_id != self.game_id {
            return Ok(VersionCheck::Skipped);
        }
        let Some(installed) = self.latest_installed().await else {
            debug!("{} is not installed, skipping version check", self.requirement.name);
            return Ok(VersionCheck::Skipped);
        };

        let Some(current) = installed.version().map(str::to_string) else {
            return Ok(VersionCheck::Unversioned);
        };

        let asset = latest_asset_by_tag(
            self.feed.as_ref(),
            &self.requirement,
            None,
            &self.release_tag,
            self.notifier.as_ref(),
        )
        .await?;
        let Some(asset) = asset else {
            return Ok(VersionCheck::NoRelease);
        };

        let newest = resolve_asset_version(&asset, &self.requirement);
        if newest.is_unknown() {
            warn!("Could not resolve a version for {}", asset.name());
            return Ok(VersionCheck::Unknown);
        }

        if current == newest.to_string() {
            debug!("{} {} is up to date", self.requirement.name, current);
            return Ok(VersionCheck::UpToDate { version: current });
        }

        info!(
            "{} {} is installed, {} is available",
            self.requirement.name, current, newest
        );
        self.store
            .set_mod_attribute(
                &self.game_id,
                &installed.id,
                attributes::NEWEST_VERSION,
                json!(newest.to_string()),
            )
            .await?;

        Ok(VersionCheck::UpdateAvailable {
            installed: current,
            newest,
        })
    }

    /// Install the recorded `newestVersion` unless the installed mod is already current
    pub async fn update(&self) -> Option<InstallReport> {
        let installed = self.latest_installed().await?;
        let version = installed.version();
        let newest = installed.newest_version();

        if version == newest {
            warn!(
                "{} will not be updated, version {:?} equals newest version",
                self.requirement.name, version
            );
            return None;
        }

        Some(self.install(newest).await)
    }

    /// Install the requirement, pinned to `version` when given
    ///
    /// Failures are logged and reported, never raised. The progress
    /// notification is dismissed in every case.
    pub async fn install(&self, version: Option<&str>) -> InstallReport {
        let selection =
            version.map(|version| SelectionOverride::for_version(&self.requirement, version));
        let mut completed = Vec::new();

        let result = self.run_install(selection.as_ref(), &mut completed).await;

        self.notifier.dismiss(INSTALL_NOTIFICATION_ID);
        completed.push(InstallStep::Dismiss);

        let outcome = match result {
            Ok((mod_id, version)) => {
                info!("Installed {} {} as {}", self.requirement.name, version, mod_id);
                InstallOutcome::Installed { mod_id, version }
            }
            Err((step, err)) => {
                error!(
                    "Failed to install {} at {:?} ({}): {}",
                    self.requirement.name,
                    step,
                    err.category(),
                    err
                );
                InstallOutcome::Aborted { step, error: err }
            }
        };

        InstallReport { completed, outcome }
    }

    async fn run_install(
        &self,
        selection: Option<&SelectionOverride>,
        completed: &mut Vec<InstallStep>,
    ) -> std::result::Result<(String, ResolvedVersion), (InstallStep, RequirementError)> {
        let message = format!("Installing {}...", self.requirement.name);
        self.notifier.show_activity(INSTALL_NOTIFICATION_ID, &message);
        completed.push(InstallStep::Notify);

        let step = InstallStep::DisableConflicts;
        let profile_id = self
            .store
            .active_profile(&self.game_id)
            .ok_or((step, RequirementError::NoActiveProfile))?;
        self.disable_conflicts(&profile_id).await.map_err(|e| (step, e))?;
        completed.push(step);

        let step = InstallStep::SelectAsset;
        let asset = latest_asset_by_tag(
            self.feed.as_ref(),
            &self.requirement,
            selection,
            &self.release_tag,
            self.notifier.as_ref(),
        )
        .await
        .map_err(|e| (step, e))?
        .ok_or_else(|| {
            (
                step,
                RequirementError::NoAsset {
                    requirement: self.requirement.name.clone(),
                },
            )
        })?;
        let version = resolve_asset_version(&asset, &self.requirement);
        completed.push(step);

        let step = InstallStep::StartDownload;
        let info = DownloadInfo::for_requirement(&self.game_id, &self.requirement);
        info!("Downloading {} from {}", asset.name(), asset.download_url());
        let download_id = self
            .downloads
            .start_download(
                &[asset.download_url().to_string()],
                &info,
                DownloadOptions {
                    redownload: RedownloadMode::Replace,
                    allow_install: false,
                },
            )
            .await
            .map_err(|e| (step, e))?;
        completed.push(step);

        let step = InstallStep::StartInstall;
        let mod_id = self
            .downloads
            .start_install(&download_id, InstallOptions { allow_auto_enable: false })
            .await
            .map_err(|e| (step, e))?;
        completed.push(step);

        let step = InstallStep::StampAttributes;
        for (key, value) in self.stamped_attributes(&info, &asset, &version) {
            self.store
                .set_mod_attribute(&self.game_id, &mod_id, key, value)
                .await
                .map_err(|e| (step, e))?;
        }
        completed.push(step);

        let step = InstallStep::Enable;
        self.store
            .set_mods_enabled(
                &profile_id,
                std::slice::from_ref(&mod_id),
                true,
                EnableOptions {
                    allow_auto_deploy: true,
                    installed: true,
                },
            )
            .await
            .map_err(|e| (step, e))?;
        completed.push(step);

        Ok((mod_id, version))
    }

    /// Disable every enabled, installed copy of the requirement
    async fn disable_conflicts(&self, profile_id: &str) -> Result<()> {
        let existing = host::find_mods_by_file(
            self.store.as_ref(),
            &self.game_id,
            &self.requirement.mod_type,
            &self.requirement.assembly_file_name,
        )
        .await;

        for installed in existing.iter().filter(|m| m.is_installed()) {
            if !self.store.is_enabled(profile_id, &installed.id).await {
                debug!("{} is already disabled", installed.id);
                continue;
            }
            debug!("Disabling {}", installed.id);
            self.store.set_mod_enabled(profile_id, &installed.id, false).await?;
        }
        Ok(())
    }

    fn stamped_attributes(
        &self,
        info: &DownloadInfo,
        asset: &SelectedAsset,
        version: &ResolvedVersion,
    ) -> Vec<(&'static str, Value)> {
        vec![
            (attributes::VERSION, json!(version.to_string())),
            (attributes::AUTHOR, json!(info.author)),
            (attributes::SOURCE, json!(info.source)),
            (attributes::NAME, json!(info.name)),
            (attributes::LOGICAL_FILE_NAME, json!(info.logical_file_name)),
            (attributes::MOD_NAME, json!(info.mod_name)),
            (attributes::SOURCE_URI, json!(info.source_uri)),
            (attributes::CUSTOM_FILE_NAME, json!(info.custom_file_name)),
            (attributes::MOD_ID, json!(info.name)),
            (attributes::UPDATED_TIMESTAMP, json!(asset.asset.updated_at.timestamp_millis())),
            (attributes::UPLOADED_TIMESTAMP, json!(asset.asset.created_at.timestamp_millis())),
        ]
    }
}
