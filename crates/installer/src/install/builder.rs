//! Instruction synthesis
//!
//! Builders take the anchor found by the matcher, keep the files under its
//! root and re-root them below a destination directory. The UE4SS builder
//! additionally rewrites two well-known files from the staging area.

use tracing::{debug, warn};

use crate::game::{self, GameDiscovery, GameStore, ue4ss};
use crate::install::directives::Instruction;
use crate::install::error::Result;
use crate::install::matcher::{ShapeMatch, filter_under_root};
use crate::install::staging::StagingReader;

/// Literal substitutions applied to `UE4SS-settings.ini`, in order
pub const SETTINGS_PATCHES: &[(&str, &str)] = &[
    // The object array cache crashes the game on load
    ("bUseUObjectArrayCache = true", "bUseUObjectArrayCache = false"),
    ("DumpOffsetsAndSizes = 1", "DumpOffsetsAndSizes = 0"),
    ("GraphicsAPI = opengl", "GraphicsAPI = dx11"),
    ("GuiConsoleEnabled = 1", "GuiConsoleEnabled = 0"),
];

/// Destination directory an archetype re-roots its files under
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DestinationRule {
    /// Directory relative to the game root; empty keeps the archive-relative path
    pub target_root: String,
}

impl DestinationRule {
    pub fn under<S: Into<String>>(target_root: S) -> Self {
        Self {
            target_root: target_root.into(),
        }
    }

    /// Keep each file's own relative path
    pub fn preserve() -> Self {
        Self::under("")
    }

    /// Destination for an archive entry, given the anchor's strip offset
    ///
    /// `None` when the offset does not fall on a character boundary of `file`.
    pub fn destination(&self, file: &str, offset: usize) -> Option<String> {
        let kept = file.get(offset..)?;
        Some(game::join_path([self.target_root.as_str(), kept]))
    }
}

/// Inputs shared by every builder
pub struct BuildContext<'a> {
    /// Binaries path of the discovered installation, relative to the game root
    pub binaries_path: String,
    pub reader: &'a dyn StagingReader,
}

impl<'a> BuildContext<'a> {
    pub fn new<S: Into<String>>(binaries_path: S, reader: &'a dyn StagingReader) -> Self {
        Self {
            binaries_path: binaries_path.into(),
            reader,
        }
    }

    /// Context for a discovered installation, assuming Steam when the layout is unknown
    pub fn for_discovery(discovery: &GameDiscovery, reader: &'a dyn StagingReader) -> Self {
        let binaries_path = game::resolve_binaries_path(discovery)
            .unwrap_or_else(|| GameStore::Steam.binaries_path());
        Self::new(binaries_path, reader)
    }

    /// Script mods directory for this installation
    pub fn script_mods_path(&self) -> String {
        game::script_mods_path(&self.binaries_path)
    }
}

/// Plain copy instructions for every file under the anchor's root
pub fn build_copy_instructions<S: AsRef<str>>(
    files: &[S],
    anchor: &ShapeMatch<'_>,
    rule: &DestinationRule,
) -> Vec<Instruction> {
    filter_under_root(files, anchor.root)
        .into_iter()
        .filter_map(|file| {
            let destination = destination_or_skip(rule, &file, anchor)?;
            Some(Instruction::copy(file, destination))
        })
        .collect()
}

/// Instructions for the UE4SS injector itself
///
/// `mods.txt` is preserved as a backup instead of being copied, the settings
/// file is patched, and the sequence ends with a single default mod type.
pub async fn build_ue4ss_instructions<S: AsRef<str>>(
    files: &[S],
    anchor: &ShapeMatch<'_>,
    rule: &DestinationRule,
    reader: &dyn StagingReader,
) -> Result<Vec<Instruction>> {
    let mut instructions = Vec::new();

    for file in filter_under_root(files, anchor.root) {
        let Some(destination) = destination_or_skip(rule, &file, anchor) else {
            continue;
        };

        match game::base_name(&file) {
            ue4ss::MODS_FILE => {
                let content = reader.read_staged_file(&file).await?;
                let backup =
                    game::join_path([game::dir_name(&destination), ue4ss::MODS_FILE_BACKUP]);
                debug!("Backing up {} to {}", file, backup);
                instructions.push(Instruction::generate_file(content, backup));
            }
            ue4ss::SETTINGS_FILE => {
                let content = reader.read_staged_file(&file).await?;
                debug!("Patching {}", file);
                let patched = patch_settings(&content);
                instructions.push(Instruction::generate_file(patched, destination));
            }
            _ => instructions.push(Instruction::copy(file, destination)),
        }
    }

    instructions.push(Instruction::set_mod_type(""));
    Ok(instructions)
}

/// Apply [`SETTINGS_PATCHES`] to settings file content
pub fn patch_settings(content: &str) -> String {
    SETTINGS_PATCHES
        .iter()
        .fold(content.to_string(), |acc, (from, to)| acc.replace(from, to))
}

fn destination_or_skip(
    rule: &DestinationRule,
    file: &str,
    anchor: &ShapeMatch<'_>,
) -> Option<String> {
    let destination = rule.destination(file, anchor.offset);
    if destination.is_none() {
        warn!(
            "Skipping '{}': it cannot be re-rooted at offset {} of anchor '{}'",
            file, anchor.offset, anchor.path
        );
    }
    destination
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::install::matcher::{PathShape, find_first_match};
    use crate::install::error::InstallError;
    use async_trait::async_trait;
    use std::collections::HashMap;

    struct MemoryReader(HashMap<String, String>);

    #[async_trait]
    impl StagingReader for MemoryReader {
        async fn read_staged_file(&self, archive_path: &str) -> Result<String> {
            self.0.get(archive_path).cloned().ok_or_else(|| InstallError::StagingRead {
                path: archive_path.into(),
                source: std::io::Error::from(std::io::ErrorKind::NotFound),
            })
        }
    }

    fn files(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    const SETTINGS: &str = "[General]\nbUseUObjectArrayCache = true\n\
        [CXXHeaderGenerator]\nDumpOffsetsAndSizes = 1\n\
        [Debug]\nConsoleEnabled = 0\nGuiConsoleEnabled = 1\nGraphicsAPI = opengl\n";

    #[test]
    fn test_patch_settings() {
        let patched = patch_settings(SETTINGS);
        assert!(patched.contains("bUseUObjectArrayCache = false"));
        assert!(patched.contains("DumpOffsetsAndSizes = 0"));
        assert!(patched.contains("GuiConsoleEnabled = 0"));
        assert!(patched.contains("GraphicsAPI = dx11"));
        assert!(!patched.contains("opengl"));
        assert!(patched.contains("ConsoleEnabled = 0"));
    }

    #[test]
    fn test_patch_settings_leaves_unknown_content() {
        assert_eq!(patch_settings("[Other]\nKey = 1\n"), "[Other]\nKey = 1\n");
    }

    #[test]
    fn test_copy_instructions_reroot() {
        let list = files(&["Wrap\\LogicMods\\Cool\\Cool.pak", "Wrap\\LogicMods\\"]);
        let anchor = find_first_match(&list, PathShape::LogicModsPak).unwrap();
        let rule = DestinationRule::under(game::PAKS_PATH);

        let instructions = build_copy_instructions(&list, &anchor, &rule);
        assert_eq!(
            instructions,
            vec![Instruction::copy(
                "Wrap\\LogicMods\\Cool\\Cool.pak",
                "Maine\\Content\\Paks\\LogicMods\\Cool\\Cool.pak"
            )]
        );
    }

    #[test]
    fn test_destination_outside_char_boundary() {
        let rule = DestinationRule::under("Mods");
        assert_eq!(rule.destination("ab", 10), None);
        assert_eq!(rule.destination("\u{e9}\u{e9}\\x", 3), None);
        assert_eq!(
            DestinationRule::preserve().destination("x\\y.txt", 0),
            Some("x\\y.txt".to_string())
        );
    }

    #[test]
    fn test_copy_skips_sibling_split_by_anchor_offset() {
        let list = files(&["ab\\ModA\\Scripts\\main.lua", "\u{e9}\u{e9}\\ab\\ModA\\x.lua"]);
        let anchor = find_first_match(&list, PathShape::LuaScript).unwrap();
        assert_eq!(anchor.offset, 3);
        let rule = DestinationRule::under("Maine\\Binaries\\Win64\\Mods");

        let instructions = build_copy_instructions(&list, &anchor, &rule);
        assert_eq!(
            instructions,
            vec![Instruction::copy(
                "ab\\ModA\\Scripts\\main.lua",
                "Maine\\Binaries\\Win64\\Mods\\ModA\\Scripts\\main.lua"
            )]
        );
    }

    #[tokio::test]
    async fn test_ue4ss_instructions() {
        let list = files(&[
            "ue4ss\\",
            "dwmapi.dll",
            "ue4ss\\UE4SS.dll",
            "ue4ss\\UE4SS-settings.ini",
            "ue4ss\\Mods\\mods.txt",
            "ue4ss\\Mods\\BPModLoaderMod\\Scripts\\main.lua",
        ]);
        let reader = MemoryReader(HashMap::from([
            ("ue4ss\\UE4SS-settings.ini".to_string(), SETTINGS.to_string()),
            ("ue4ss\\Mods\\mods.txt".to_string(), "BPModLoaderMod : 1\n".to_string()),
        ]));
        let anchor = find_first_match(&list, PathShape::InjectorMarker).unwrap();

        let rule = DestinationRule::preserve();
        let instructions = build_ue4ss_instructions(&list, &anchor, &rule, &reader)
            .await
            .unwrap();

        assert_eq!(instructions.len(), 6);
        assert_eq!(instructions[0], Instruction::copy("dwmapi.dll", "dwmapi.dll"));
        assert_eq!(instructions[1], Instruction::copy("ue4ss\\UE4SS.dll", "ue4ss\\UE4SS.dll"));
        assert_eq!(
            instructions[2],
            Instruction::generate_file(patch_settings(SETTINGS), "ue4ss\\UE4SS-settings.ini")
        );
        assert_eq!(
            instructions[3],
            Instruction::generate_file("BPModLoaderMod : 1\n", "ue4ss\\Mods\\mods.txt.original")
        );
        assert_eq!(instructions[5], Instruction::set_mod_type(""));
        assert_eq!(instructions.iter().filter(|i| i.is_set_mod_type()).count(), 1);
        assert!(instructions.iter().all(|i| i.source() != Some("ue4ss\\Mods\\mods.txt")));
    }

    #[tokio::test]
    async fn test_ue4ss_instructions_missing_staged_file() {
        let list = files(&["ue4ss\\UE4SS.dll", "ue4ss\\UE4SS-settings.ini"]);
        let reader = MemoryReader(HashMap::new());
        let anchor = find_first_match(&list, PathShape::InjectorMarker).unwrap();

        let rule = DestinationRule::preserve();
        let result = build_ue4ss_instructions(&list, &anchor, &rule, &reader).await;
        assert!(matches!(result, Err(InstallError::StagingRead { .. })));
    }
}
