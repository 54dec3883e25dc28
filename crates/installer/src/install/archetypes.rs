//! Archetype classification cascade
//!
//! Every archetype pairs a structural test with an instruction builder. The
//! registry evaluates tests in ascending priority and the first archetype
//! that accepts the file list builds the instructions. The generic archetype
//! is the terminal catch-all and accepts any non-empty list.

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::game;
use crate::install::builder::{
    BuildContext, DestinationRule, build_copy_instructions, build_ue4ss_instructions,
};
use crate::install::directives::Instruction;
use crate::install::error::{InstallError, Result};
use crate::install::matcher::{PathShape, ShapeMatch, contains_match, find_first_match};

/// Known mod content shapes for the game
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ArchetypeKind {
    /// The UE4SS injector itself
    Ue4ss,
    /// Shared Lua libraries used by UE4SS mods
    Ue4ssShared,
    Ue4ssLua,
    Ue4ssCpp,
    /// Blueprint mods loaded by the UE4SS BP mod loader
    LogicMods,
    Pak,
    Generic,
}

impl ArchetypeKind {
    pub const ALL: [ArchetypeKind; 7] = [
        ArchetypeKind::Ue4ss,
        ArchetypeKind::Ue4ssShared,
        ArchetypeKind::Ue4ssLua,
        ArchetypeKind::Ue4ssCpp,
        ArchetypeKind::LogicMods,
        ArchetypeKind::Pak,
        ArchetypeKind::Generic,
    ];

    /// Installer key registered with the host
    pub fn key(self) -> &'static str {
        match self {
            ArchetypeKind::Ue4ss => "grounded-ue4ss",
            ArchetypeKind::Ue4ssShared => "grounded-ue4ss-shared",
            ArchetypeKind::Ue4ssLua => "grounded-ue4ss_lua",
            ArchetypeKind::Ue4ssCpp => "grounded-ue4ss_cpp",
            ArchetypeKind::LogicMods => "grounded-ue4ss_BPLogicMods",
            ArchetypeKind::Pak => "grounded-paks",
            ArchetypeKind::Generic => "grounded-generic",
        }
    }

    /// Lower priorities are tried first
    pub fn priority(self) -> u32 {
        match self {
            ArchetypeKind::Ue4ss => 10,
            ArchetypeKind::Ue4ssShared => 20,
            ArchetypeKind::Ue4ssLua => 25,
            ArchetypeKind::Ue4ssCpp => 30,
            ArchetypeKind::LogicMods => 35,
            ArchetypeKind::Pak => 40,
            ArchetypeKind::Generic => 90,
        }
    }

    pub fn shape(self) -> PathShape {
        match self {
            ArchetypeKind::Ue4ss => PathShape::InjectorMarker,
            ArchetypeKind::Ue4ssShared => PathShape::SharedLibrary,
            ArchetypeKind::Ue4ssLua => PathShape::LuaScript,
            ArchetypeKind::Ue4ssCpp => PathShape::CppScript,
            ArchetypeKind::LogicMods => PathShape::LogicModsPak,
            ArchetypeKind::Pak => PathShape::PakFile,
            ArchetypeKind::Generic => PathShape::AnyFile,
        }
    }

    pub fn is_catch_all(self) -> bool {
        matches!(self, ArchetypeKind::Generic)
    }

    /// Structural test; no I/O and no state
    pub fn test<S: AsRef<str>>(self, files: &[S]) -> bool {
        match self {
            ArchetypeKind::Generic => !files.is_empty(),
            _ => contains_match(files, self.shape()),
        }
    }

    /// Where this archetype's files are re-rooted
    pub fn destination_rule(self, ctx: &BuildContext<'_>) -> DestinationRule {
        match self {
            ArchetypeKind::Ue4ssShared | ArchetypeKind::Ue4ssLua | ArchetypeKind::Ue4ssCpp => {
                DestinationRule::under(ctx.script_mods_path())
            }
            ArchetypeKind::LogicMods | ArchetypeKind::Pak => {
                DestinationRule::under(game::PAKS_PATH)
            }
            ArchetypeKind::Ue4ss | ArchetypeKind::Generic => DestinationRule::preserve(),
        }
    }

    /// Build the ordered instructions for a file list this archetype accepted
    pub async fn build<S: AsRef<str>>(
        self,
        files: &[S],
        ctx: &BuildContext<'_>,
    ) -> Result<Vec<Instruction>> {
        let anchor = match find_first_match(files, self.shape()) {
            Some(anchor) => anchor,
            // Directory-only listings keep everything at the archive root
            None if self.is_catch_all() => ShapeMatch {
                path: "",
                offset: 0,
                root: "",
            },
            None => return Err(InstallError::MissingAnchor { archetype: self.key() }),
        };
        debug!(
            "Archetype {} anchored on '{}' with root '{}'",
            self.key(),
            anchor.path,
            anchor.root
        );

        let rule = self.destination_rule(ctx);
        match self {
            ArchetypeKind::Ue4ss => {
                build_ue4ss_instructions(files, &anchor, &rule, ctx.reader).await
            }
            _ => Ok(build_copy_instructions(files, &anchor, &rule)),
        }
    }
}

impl std::fmt::Display for ArchetypeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

/// Result of installing a file list
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstallPlan {
    pub archetype: ArchetypeKind,
    pub instructions: Vec<Instruction>,
}

/// Ordered table of archetypes owned by one game
#[derive(Debug, Clone)]
pub struct ArchetypeRegistry {
    game_id: String,
    archetypes: Vec<ArchetypeKind>,
}

impl Default for ArchetypeRegistry {
    fn default() -> Self {
        Self::new(game::GAME_ID, ArchetypeKind::ALL)
    }
}

impl ArchetypeRegistry {
    /// Build a registry, ordering archetypes by priority and dropping duplicates
    pub fn new<S, I>(game_id: S, archetypes: I) -> Self
    where
        S: Into<String>,
        I: IntoIterator<Item = ArchetypeKind>,
    {
        let mut archetypes: Vec<ArchetypeKind> = archetypes.into_iter().collect();
        archetypes.sort_by_key(|kind| kind.priority());
        archetypes.dedup();

        if !archetypes.last().is_some_and(|kind| kind.is_catch_all()) {
            warn!("Archetype registry has no catch-all; some content will be unsupported");
        }

        Self {
            game_id: game_id.into(),
            archetypes,
        }
    }

    pub fn game_id(&self) -> &str {
        &self.game_id
    }

    /// Archetypes in evaluation order
    pub fn archetypes(&self) -> &[ArchetypeKind] {
        &self.archetypes
    }

    /// First archetype, by priority, whose test accepts the file list
    pub fn classify<S: AsRef<str>>(&self, files: &[S], game_id: &str) -> Option<ArchetypeKind> {
        if game_id != self.game_id {
            return None;
        }
        self.archetypes.iter().copied().find(|kind| kind.test(files))
    }

    /// Classify the file list and synthesize its instructions
    pub async fn install_content<S: AsRef<str>>(
        &self,
        files: &[S],
        game_id: &str,
        ctx: &BuildContext<'_>,
    ) -> Result<InstallPlan> {
        let archetype = self
            .classify(files, game_id)
            .ok_or_else(|| InstallError::Unsupported {
                game_id: game_id.to_string(),
            })?;

        let instructions = archetype.build(files, ctx).await?;
        info!(
            "Installing {} files as {} ({} instructions)",
            files.len(),
            archetype,
            instructions.len()
        );

        Ok(InstallPlan {
            archetype,
            instructions,
        })
    }
}
