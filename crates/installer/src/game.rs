//! Grounded installation layout
//!
//! Directory conventions, identifiers and file names for the one game this
//! crate targets. Archive paths and install destinations use the Windows
//! separator regardless of the host platform.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::error;

/// Nexus Mods domain for the game
pub const GAME_ID: &str = "grounded";
pub const GAME_NAME: &str = "Grounded";

/// Executable relative to the game root
pub const DEFAULT_EXECUTABLE: &str = "Grounded.exe";
pub const XBOX_EXECUTABLE: &str = "gamelaunchhelper.exe";

pub const STEAM_APP_ID: &str = "962130";
pub const XBOX_APP_ID: &str = "Microsoft.Maine";

/// Separator used by archive listings and install destinations
pub const SEPARATOR: char = '\\';

pub const STEAM_DIR_NAME: &str = "Win64";
pub const XBOX_DIR_NAME: &str = "WinGDK";
pub const BINARIES_PREFIX: &str = "Maine\\Binaries";

/// Destination for pak content, both plain and blueprint logic mods
pub const PAKS_PATH: &str = "Maine\\Content\\Paks";
/// Script mods directory name under the binaries path
pub const SCRIPT_MODS_DIR: &str = "Mods";

pub const PAK_EXTENSION: &str = "pak";

/// UE4SS (the script injector) layout
pub mod ue4ss {
    pub const NAME: &str = "UE4SS v3";
    pub const DLL_FILE: &str = "UE4SS.dll";
    /// Marker file relative to the injector root
    pub const MARKER_PATH: &str = "ue4ss\\UE4SS.dll";
    pub const SETTINGS_FILE: &str = "UE4SS-settings.ini";
    pub const MODS_FILE: &str = "mods.txt";
    pub const MODS_FILE_BACKUP: &str = "mods.txt.original";
    pub const SHARED_DIR: &str = "shared";
}

/// Storefront the game was discovered through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameStore {
    Steam,
    Xbox,
}

impl GameStore {
    pub const ALL: [GameStore; 2] = [GameStore::Steam, GameStore::Xbox];

    /// Architecture directory under `Maine\Binaries`
    pub fn binaries_dir_name(self) -> &'static str {
        match self {
            GameStore::Steam => STEAM_DIR_NAME,
            GameStore::Xbox => XBOX_DIR_NAME,
        }
    }

    /// Binaries path relative to the game root
    pub fn binaries_path(self) -> String {
        join_path([BINARIES_PREFIX, self.binaries_dir_name()])
    }

    pub fn executable(self) -> &'static str {
        match self {
            GameStore::Steam => DEFAULT_EXECUTABLE,
            GameStore::Xbox => XBOX_EXECUTABLE,
        }
    }
}

/// Where and how the host found the game
#[derive(Debug, Clone)]
pub struct GameDiscovery {
    pub path: PathBuf,
    pub store: Option<GameStore>,
}

impl GameDiscovery {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            path: path.into(),
            store: None,
        }
    }

    pub fn with_store(mut self, store: GameStore) -> Self {
        self.store = Some(store);
        self
    }
}

/// Resolve the binaries path for a discovered installation
///
/// A known store maps directly. Otherwise every candidate is probed under
/// the game root and the first one present on disk wins.
pub fn resolve_binaries_path(discovery: &GameDiscovery) -> Option<String> {
    if let Some(store) = discovery.store {
        return Some(store.binaries_path());
    }

    let found = GameStore::ALL
        .into_iter()
        .map(GameStore::binaries_path)
        .find(|candidate| host_path(&discovery.path, candidate).is_dir());

    if found.is_none() {
        error!(
            "Unable to find the binaries path under {}",
            discovery.path.display()
        );
    }
    found
}

/// Directory UE4SS script mods are deployed to for the given binaries path
pub fn script_mods_path(binaries_path: &str) -> String {
    join_path([binaries_path, SCRIPT_MODS_DIR])
}

/// Join path fragments with the Windows separator
///
/// Forward slashes are normalized, empty segments are dropped, and the
/// result is always relative.
pub fn join_path<I, S>(parts: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut joined = String::new();
    for part in parts {
        for segment in part
            .as_ref()
            .split(|c| c == SEPARATOR || c == '/')
            .filter(|segment| !segment.is_empty())
        {
            if !joined.is_empty() {
                joined.push(SEPARATOR);
            }
            joined.push_str(segment);
        }
    }
    joined
}

/// Final segment of a separator-delimited path
pub fn base_name(path: &str) -> &str {
    path.rsplit(SEPARATOR).next().unwrap_or(path)
}

/// Everything before the final segment, or an empty string
pub fn dir_name(path: &str) -> &str {
    match path.rfind(SEPARATOR) {
        Some(idx) => &path[..idx],
        None => "",
    }
}

/// Map a Windows-style relative path onto a host directory
pub fn host_path(root: &Path, relative: &str) -> PathBuf {
    relative
        .split(|c| c == SEPARATOR || c == '/')
        .filter(|segment| !segment.is_empty())
        .fold(root.to_path_buf(), |acc, segment| acc.join(segment))
}
