//! Structural path matching over archive file lists
//!
//! File lists use the `\` separator. Entries ending in the separator are
//! directory markers. Matching always walks the list in archive order, so the
//! first matching entry is the anchor for the whole archive.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::game::{self, SEPARATOR, ue4ss};

static LUA_SCRIPT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\\]+\\Scripts\\main\.lua$").expect("valid lua script pattern"));
static CPP_SCRIPT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\\]+\\dlls\\main\.dll$").expect("valid cpp script pattern"));
static LOGIC_MODS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"LogicMods\\.+\.pak$").expect("valid logic mods pattern"));
/// Archives that wrap their content in a `Grounded\` folder are re-rooted past it
static GENERIC_ROOT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^.*Grounded\\").expect("valid generic root pattern"));

pub const LUA_SCRIPT_SUFFIX: &str = "\\Scripts\\main.lua";
pub const CPP_SCRIPT_SUFFIX: &str = "\\dlls\\main.dll";

/// The structural shapes an archive entry can be tested against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PathShape {
    /// `ue4ss\UE4SS.dll`, optionally below a wrapper folder
    InjectorMarker,
    /// Any path with a `shared` directory segment
    SharedLibrary,
    /// `<name>\Scripts\main.lua`
    LuaScript,
    /// `<name>\dlls\main.dll`
    CppScript,
    /// `LogicMods\...\*.pak`
    LogicModsPak,
    /// Any file with a `.pak` extension
    PakFile,
    /// Any file entry
    AnyFile,
}

/// The anchor entry found for a shape
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShapeMatch<'a> {
    /// The matching archive entry
    pub path: &'a str,
    /// Byte offset where the kept part of each path begins
    pub offset: usize,
    /// Root directory of the content inside the archive
    pub root: &'a str,
}

impl PathShape {
    /// Test a single entry, returning the match anchored in it
    pub fn match_path(self, path: &str) -> Option<ShapeMatch<'_>> {
        match self {
            PathShape::InjectorMarker => {
                let offset = suffix_offset_ignore_case(path, ue4ss::MARKER_PATH)?;
                Some(ShapeMatch { path, offset, root: &path[..offset] })
            }
            PathShape::SharedLibrary => {
                let offset = directory_segment_offset(path, ue4ss::SHARED_DIR)?;
                Some(ShapeMatch { path, offset, root: &path[..offset] })
            }
            PathShape::LuaScript => {
                let found = LUA_SCRIPT_RE.find(path)?;
                Some(ShapeMatch {
                    path,
                    offset: found.start(),
                    root: root_prefix(path, LUA_SCRIPT_SUFFIX.len()),
                })
            }
            PathShape::CppScript => {
                let found = CPP_SCRIPT_RE.find(path)?;
                Some(ShapeMatch {
                    path,
                    offset: found.start(),
                    root: root_prefix(path, CPP_SCRIPT_SUFFIX.len()),
                })
            }
            PathShape::LogicModsPak => {
                let found = LOGIC_MODS_RE.find(path)?;
                Some(ShapeMatch {
                    path,
                    offset: found.start(),
                    root: &path[..found.start()],
                })
            }
            PathShape::PakFile => {
                if is_directory_marker(path) || !has_extension(path, game::PAK_EXTENSION) {
                    return None;
                }
                let base = game::base_name(path);
                Some(ShapeMatch {
                    path,
                    offset: path.len() - base.len(),
                    root: game::dir_name(path),
                })
            }
            PathShape::AnyFile => {
                if is_directory_marker(path) {
                    return None;
                }
                let offset = GENERIC_ROOT_RE.find(path).map_or(0, |found| found.end());
                Some(ShapeMatch { path, offset, root: &path[..offset] })
            }
        }
    }
}

/// First entry in archive order matching the shape
pub fn find_first_match<S: AsRef<str>>(files: &[S], shape: PathShape) -> Option<ShapeMatch<'_>> {
    files
        .iter()
        .find_map(|file| shape.match_path(file.as_ref()))
}

/// Whether any entry matches the shape
pub fn contains_match<S: AsRef<str>>(files: &[S], shape: PathShape) -> bool {
    find_first_match(files, shape).is_some()
}

/// Strip a known trailing suffix of `suffix_len` bytes from the matched path
pub fn root_prefix(matched_path: &str, suffix_len: usize) -> &str {
    let end = matched_path.len().saturating_sub(suffix_len);
    matched_path.get(..end).unwrap_or("")
}

/// Keep file entries containing `root` anywhere in their path
///
/// Containment is a plain substring test, not a path-prefix test, so sibling
/// paths that happen to contain the root string are kept as well.
pub fn filter_under_root<S: AsRef<str>>(files: &[S], root: &str) -> Vec<String> {
    files
        .iter()
        .map(|file| file.as_ref())
        .filter(|file| file.contains(root) && !is_directory_marker(file))
        .map(str::to_string)
        .collect()
}

pub fn is_directory_marker(path: &str) -> bool {
    path.ends_with(SEPARATOR)
}

fn has_extension(path: &str, extension: &str) -> bool {
    match game::base_name(path).rsplit_once('.') {
        Some((stem, ext)) => !stem.is_empty() && ext.eq_ignore_ascii_case(extension),
        None => false,
    }
}

/// Offset of `suffix` at the end of `path`, at a segment boundary
fn suffix_offset_ignore_case(path: &str, suffix: &str) -> Option<usize> {
    let offset = path.len().checked_sub(suffix.len())?;
    let tail = path.get(offset..)?;
    if !tail.eq_ignore_ascii_case(suffix) {
        return None;
    }
    if offset == 0 || path[..offset].ends_with(SEPARATOR) {
        Some(offset)
    } else {
        None
    }
}

/// Offset of the first directory segment equal to `segment`
fn directory_segment_offset(path: &str, segment: &str) -> Option<usize> {
    let mut start = 0;
    for part in path.split(SEPARATOR) {
        let end = start + part.len();
        // A directory segment is always followed by a separator
        if end < path.len() && part.eq_ignore_ascii_case(segment) {
            return Some(start);
        }
        start = end + SEPARATOR.len_utf8();
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn files(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_injector_marker() {
        let m = PathShape::InjectorMarker.match_path("ue4ss\\UE4SS.dll").unwrap();
        assert_eq!(m.offset, 0);
        assert_eq!(m.root, "");

        let wrapped = PathShape::InjectorMarker
            .match_path("UE4SS_v3\\ue4ss\\UE4SS.dll")
            .unwrap();
        assert_eq!(wrapped.root, "UE4SS_v3\\");

        assert!(PathShape::InjectorMarker.match_path("notue4ss\\UE4SS.dll").is_none());
        assert!(PathShape::InjectorMarker.match_path("UE4SS.dll").is_none());
    }

    #[test]
    fn test_shared_library_segment() {
        let m = PathShape::SharedLibrary
            .match_path("Pack\\shared\\UEHelpers\\UEHelpers.lua")
            .unwrap();
        assert_eq!(m.offset, 5);
        assert_eq!(m.root, "Pack\\");

        assert!(PathShape::SharedLibrary.match_path("Pack\\shared").is_none());
        assert!(PathShape::SharedLibrary.match_path("Pack\\unshared\\a.lua").is_none());
        assert!(PathShape::SharedLibrary.match_path("shared\\a.lua").is_some());
    }

    #[test]
    fn test_lua_script_uses_nearest_segment() {
        let m = PathShape::LuaScript
            .match_path("Outer\\ModA\\Scripts\\main.lua")
            .unwrap();
        assert_eq!(&m.path[m.offset..], "ModA\\Scripts\\main.lua");
        assert_eq!(m.root, "Outer\\ModA");

        assert!(PathShape::LuaScript.match_path("Scripts\\main.lua").is_none());
        assert!(PathShape::LuaScript.match_path("ModA\\Scripts\\main.lua.bak").is_none());
    }

    #[test]
    fn test_cpp_script() {
        let m = PathShape::CppScript.match_path("ModB\\dlls\\main.dll").unwrap();
        assert_eq!(m.offset, 0);
        assert_eq!(m.root, "ModB");
    }

    #[test]
    fn test_logic_mods_pak() {
        let m = PathShape::LogicModsPak
            .match_path("Wrapper\\LogicMods\\Cool\\Cool.pak")
            .unwrap();
        assert_eq!(m.root, "Wrapper\\");
        assert_eq!(&m.path[m.offset..], "LogicMods\\Cool\\Cool.pak");
    }

    #[test]
    fn test_pak_extension_case_insensitive() {
        let m = PathShape::PakFile.match_path("Paks\\MyMod.PAK").unwrap();
        assert_eq!(m.root, "Paks");
        assert_eq!(&m.path[m.offset..], "MyMod.PAK");

        let bare = PathShape::PakFile.match_path("mymod.pak").unwrap();
        assert_eq!(bare.root, "");
        assert_eq!(bare.offset, 0);

        assert!(PathShape::PakFile.match_path("mymod.pak.txt").is_none());
        assert!(PathShape::PakFile.match_path(".pak").is_none());
    }

    #[test]
    fn test_any_file_strips_game_folder() {
        let m = PathShape::AnyFile
            .match_path("Wrapper\\Grounded\\Maine\\Content\\x.txt")
            .unwrap();
        assert_eq!(m.root, "Wrapper\\Grounded\\");

        let plain = PathShape::AnyFile.match_path("readme.txt").unwrap();
        assert_eq!(plain.root, "");
        assert!(PathShape::AnyFile.match_path("dir\\").is_none());
    }

    #[test]
    fn test_find_first_match_in_archive_order() {
        let list = files(&["b\\Scripts\\main.lua", "a\\Scripts\\main.lua"]);
        let m = find_first_match(&list, PathShape::LuaScript).unwrap();
        assert_eq!(m.path, "b\\Scripts\\main.lua");
        assert!(!contains_match(&list, PathShape::CppScript));
    }

    #[test]
    fn test_root_prefix() {
        assert_eq!(root_prefix("ModA\\Scripts\\main.lua", LUA_SCRIPT_SUFFIX.len()), "ModA");
        assert_eq!(root_prefix("x", 10), "");
    }

    #[test]
    fn test_filter_under_root_substring_and_dirs() {
        let list = files(&[
            "ModA\\",
            "ModA\\Scripts\\main.lua",
            "Other\\ModA.txt",
            "Unrelated\\file.txt",
        ]);
        let filtered = filter_under_root(&list, "ModA");
        assert_eq!(filtered, vec!["ModA\\Scripts\\main.lua", "Other\\ModA.txt"]);
    }

    #[test]
    fn test_filter_under_root_idempotent() {
        let list = files(&["ModA\\", "ModA\\a.lua", "ModB\\b.lua", "x\\ModA\\c.lua"]);
        let once = filter_under_root(&list, "ModA");
        let twice = filter_under_root(&once, "ModA");
        assert_eq!(once, twice);
    }
}
