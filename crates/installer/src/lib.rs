//! Grounded Installer Library
//!
//! This library classifies Grounded mod archives into install archetypes,
//! turns them into placement instructions for the host's installer, and
//! keeps the UE4SS companion runtime installed and current from its GitHub
//! release feed.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use grounded_installer::{
//!     ArchetypeRegistry, BuildContext, FsStagingReader, GameStore, game,
//! };
//!
//! # async fn example() -> Result<(), grounded_installer::InstallError> {
//! let files = vec![
//!     "ModA\\Scripts\\main.lua".to_string(),
//!     "ModA\\enabled.txt".to_string(),
//! ];
//!
//! // Classify the archive listing
//! let registry = ArchetypeRegistry::default();
//! let kind = registry.classify(&files, game::GAME_ID);
//! println!("Archetype: {:?}", kind);
//!
//! // Build placement instructions for a Steam install
//! let reader = FsStagingReader::new("/path/to/staging");
//! let ctx = BuildContext::new(GameStore::Steam.binaries_path(), &reader);
//! let plan = registry.install_content(&files, game::GAME_ID, &ctx).await?;
//! for instruction in &plan.instructions {
//!     println!("{:?}", instruction);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Features
//!
//! - **Archetype cascade**: UE4SS, shared libraries, Lua, C++, LogicMods, pak and generic mods
//! - **Instruction synthesis**: copy, generated files and mod type assignment
//! - **Release feed**: GitHub release lookup with rate limit handling
//! - **Dependency orchestration**: version checks, updates and installs through host seams

pub mod config;
pub mod game;
pub mod install;
pub mod requirements;

// Re-export commonly used types for convenience
pub use config::FeedConfig;
pub use game::{GameDiscovery, GameStore};
pub use install::{
    ArchetypeKind, ArchetypeRegistry, BuildContext, FsStagingReader, InstallError, InstallPlan,
    Instruction, StagingReader,
};
pub use requirements::{
    DependencyOrchestrator, GitHubApi, InstallOutcome, InstallReport, PluginRequirement,
    ReleaseFeed, RequirementError, ResolvedVersion, VersionCheck, ue4ss_requirement,
};
