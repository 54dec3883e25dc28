use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use grounded_installer::game::{self, GameStore};
use grounded_installer::install::{ArchetypeRegistry, BuildContext, FsStagingReader};
use grounded_installer::requirements::github_api::latest_asset_by_tag;
use grounded_installer::requirements::host::Notifier;
use grounded_installer::requirements::release::format_bytes;
use grounded_installer::requirements::version::resolve_asset_version;
use grounded_installer::requirements::{GitHubApi, SelectionOverride, ue4ss_requirement};

#[derive(Parser, Debug)]
#[command(
    name = "grounded",
    about = "Grounded mod archive classifier and UE4SS release lookup",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Classify an archive listing and print its install plan
    Classify {
        /// File with one archive-relative path per line, `-` for stdin
        listing: PathBuf,

        /// Game the archive is installed for
        #[arg(long, default_value = game::GAME_ID)]
        game: String,

        /// Extracted archive, needed for UE4SS settings patching
        #[arg(long)]
        staging: Option<PathBuf>,

        /// Store edition of the game install
        #[arg(long, value_enum, default_value = "steam")]
        store: StoreArg,
    },

    /// Look up the latest UE4SS build on the release feed
    Latest {
        /// Release tag to query
        #[arg(long)]
        tag: Option<String>,

        /// Pin an exact UE4SS version instead of the newest build
        #[arg(long)]
        pin: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum StoreArg {
    Steam,
    Xbox,
}

impl From<StoreArg> for GameStore {
    fn from(store: StoreArg) -> Self {
        match store {
            StoreArg::Steam => GameStore::Steam,
            StoreArg::Xbox => GameStore::Xbox,
        }
    }
}

/// Prints host notifications to stderr
struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn show_activity(&self, _id: &str, message: &str) {
        eprintln!("{}", message);
    }

    fn dismiss(&self, _id: &str) {}

    fn show_error(&self, title: &str, detail: &str) {
        eprintln!("{}: {}", title, detail);
    }
}

fn initialize_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    initialize_tracing(cli.verbose);

    match cli.command {
        Command::Classify {
            listing,
            game,
            staging,
            store,
        } => classify_command(listing, game, staging, store.into()).await,
        Command::Latest { tag, pin } => latest_command(tag, pin).await,
    }
}

async fn classify_command(
    listing: PathBuf,
    game_id: String,
    staging: Option<PathBuf>,
    store: GameStore,
) -> Result<()> {
    let contents = if listing.as_os_str() == "-" {
        std::io::read_to_string(std::io::stdin()).context("Failed to read listing from stdin")?
    } else {
        std::fs::read_to_string(&listing)
            .with_context(|| format!("Failed to read listing {}", listing.display()))?
    };
    let files: Vec<String> = contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect();
    debug!("Read {} entries from {}", files.len(), listing.display());

    let registry = ArchetypeRegistry::default();
    let reader = FsStagingReader::new(staging.unwrap_or_else(|| PathBuf::from(".")));
    let ctx = BuildContext::new(store.binaries_path(), &reader);

    let plan = registry
        .install_content(&files, &game_id, &ctx)
        .await
        .context("Failed to build install plan")?;
    info!("Classified {} as {}", listing.display(), plan.archetype);

    let output = serde_json::json!({
        "archetype": plan.archetype.key(),
        "instructions": plan.instructions,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

async fn latest_command(tag: Option<String>, pin: Option<String>) -> Result<()> {
    let api = GitHubApi::from_env().context("Failed to create release feed client")?;
    let requirement = ue4ss_requirement();
    let tag = tag.unwrap_or_else(|| api.config().release_tag.clone());
    let selection = pin.map(|version| SelectionOverride::for_version(requirement, &version));

    let asset = latest_asset_by_tag(&api, requirement, selection.as_ref(), &tag, &ConsoleNotifier)
        .await
        .context("Release feed lookup failed")?;

    if let Some(status) = api.rate_limit_status() {
        debug!("{}", status.format_status());
    }

    let Some(asset) = asset else {
        anyhow::bail!("No {} asset found on release '{}'", requirement.name, tag);
    };

    println!("Asset:   {}", asset.name());
    println!("Size:    {}", format_bytes(asset.asset.size, 2));
    println!("Updated: {}", asset.asset.updated_at.to_rfc3339());
    println!("Version: {}", resolve_asset_version(&asset, requirement));
    println!("URL:     {}", asset.download_url());
    Ok(())
}
