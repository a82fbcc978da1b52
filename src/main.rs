//! cmswitch - Championship Manager 01/02 database switcher

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use cmswitch::settings::Settings;
use cmswitch::switcher::{ProgressEvent, SwitchOutcome};
use cmswitch::{status_message, Catalog, GameLayout, SwitchError, Switcher};
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "cmswitch")]
#[command(version)]
#[command(about = "Switch, import and export Championship Manager 01/02 databases")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging (use RUST_LOG=debug for more detail)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Game installation directory (overrides saved settings)
    #[arg(short, long, global = true, env = "CMSWITCH_GAME_DIR")]
    game: Option<PathBuf>,

    /// Folder with the bundled database archives (defaults to <game>/resources)
    #[arg(short, long, global = true, env = "CMSWITCH_RESOURCES_DIR")]
    resources: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// List the available databases
    List,

    /// Show which database is installed
    Status,

    /// Switch to a built-in database
    Switch {
        /// Database name, as shown by `list`
        name: String,
    },

    /// Load a custom database archive
    Import {
        /// Path to the archive (bare names are looked up in "Custom Databases")
        archive: PathBuf,
    },

    /// Save the current data folder as a custom database archive
    Export {
        /// Archive name or path (bare names go to "Custom Databases")
        name: PathBuf,
    },

    /// Remember --game and --resources for later runs
    SaveSettings,
}

fn progress_bar() -> Result<ProgressBar> {
    let pb = ProgressBar::new(100);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}% | {msg}")?
            .progress_chars("=>-"),
    );
    pb.enable_steady_tick(Duration::from_millis(100));
    Ok(pb)
}

/// Runs one switcher operation behind a progress bar and prints its status.
fn run_with_progress<F>(switcher: Switcher, operation: F) -> Result<()>
where
    F: FnOnce(&Switcher) -> Result<SwitchOutcome, SwitchError>,
{
    let pb = progress_bar()?;
    let bar = pb.clone();
    let switcher = switcher.with_progress(Arc::new(move |event: ProgressEvent| {
        bar.set_position(event.percent as u64);
        bar.set_message(event.message);
    }));

    let result = operation(&switcher);
    pb.finish_and_clear();

    // The error's display text is the status line, anyhow prints it on exit
    let status = status_message(&result);
    match result {
        Ok(SwitchOutcome::Exported { path, .. }) => {
            println!("{}", status);
            println!("Saved to {}", path.display());
            Ok(())
        }
        Ok(_) => {
            println!("{}", status);
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

/// Builds a switcher from command line options, falling back to saved settings.
fn open_switcher(game: &Option<PathBuf>, resources: &Option<PathBuf>, settings: &Settings) -> Result<Switcher> {
    let game_dir = game
        .clone()
        .or_else(|| settings.game_dir.clone())
        .context("No game directory set. Pass --game or run `cmswitch --game <dir> save-settings`")?;
    let resources_dir = resources
        .clone()
        .unwrap_or_else(|| settings.effective_resources_dir(&game_dir));

    let catalog = Catalog::load(&resources_dir)
        .with_context(|| format!("Failed to load catalog from {}", resources_dir.display()))?;
    Ok(Switcher::new(catalog, GameLayout::new(game_dir)))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Only initialize logging if verbose or RUST_LOG is set
    if cli.verbose || std::env::var("RUST_LOG").is_ok() {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::from_default_env()
                    .add_directive(if cli.verbose { "cmswitch=debug".parse()? } else { "cmswitch=warn".parse()? }),
            )
            .init();
    }

    let mut settings = Settings::load();

    match cli.command {
        Commands::List => {
            let switcher = open_switcher(&cli.game, &cli.resources, &settings)?;
            let active = switcher.active_database().map(|(name, _)| name);
            println!("{:<24} {:<20} {:<6} PREREQUISITE", "NAME", "LABEL", "WIPE");
            for db in switcher.catalog().iter() {
                let marker = if active.as_deref() == Some(db.name.as_str()) { "*" } else { " " };
                println!(
                    "{}{:<23} {:<20} {:<6} {}",
                    marker,
                    db.name,
                    db.label,
                    if db.delete_data_folder { "yes" } else { "no" },
                    db.prerequisite.as_deref().unwrap_or("-")
                );
            }
        }

        Commands::Status => {
            let switcher = open_switcher(&cli.game, &cli.resources, &settings)?;
            match switcher.active_database() {
                Some((name, label)) => println!("Active database: {} ({})", label, name),
                None if switcher.layout().has_data_folder() => {
                    println!("Data folder present, but no database detector file found")
                }
                None => println!("No data folder at {}", switcher.layout().data_dir.display()),
            }
        }

        Commands::Switch { name } => {
            let switcher = open_switcher(&cli.game, &cli.resources, &settings)?;
            run_with_progress(switcher, |s| s.switch(&name))?;
        }

        Commands::Import { archive } => {
            let switcher = open_switcher(&cli.game, &cli.resources, &settings)?;
            let path = switcher.layout().resolve_import_path(&archive);
            run_with_progress(switcher, |s| s.import(&path))?;
        }

        Commands::Export { name } => {
            let switcher = open_switcher(&cli.game, &cli.resources, &settings)?;
            run_with_progress(switcher, |s| s.export(&name))?;
        }

        Commands::SaveSettings => {
            if cli.game.is_some() {
                settings.game_dir = cli.game;
            }
            if cli.resources.is_some() {
                settings.resources_dir = cli.resources;
            }
            let path = settings.save()?;
            println!("Settings saved to {}", path.display());
        }
    }

    Ok(())
}
