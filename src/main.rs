use std::env;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::info;
use photomatch::{config, intake, matcher::Matcher, reply, storage::ReferenceStore};

#[derive(Parser)]
#[command(name = "photomatch")]
#[command(
    version,
    about = "Check received photos against previously saved reference photos"
)]
struct Cli {
    /// Config file (defaults to the platform config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Reference store directory (defaults to the platform data dir)
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Save a photo as a new reference
    Save {
        /// Image file, or - for stdin
        photo: PathBuf,
    },
    /// Compare a photo against every saved reference
    Compare {
        /// Image file, or - for stdin
        photo: PathBuf,

        /// Override the configured match threshold
        #[arg(short, long)]
        threshold: Option<f64>,

        /// Print the outcome as JSON instead of reply text
        #[arg(long)]
        json: bool,
    },
    /// List saved references
    List,
    /// Remove all saved references
    Purge,
    /// Open config file in editor
    Config,
}

fn main() -> Result<()> {
    env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .format_target(false)
        .format_timestamp(None)
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(cli.config.as_deref())?;
    let store = cli
        .store
        .as_deref()
        .map(ReferenceStore::open)
        .unwrap_or_default();

    match cli.command {
        Commands::Save { photo } => save(&store, &photo),
        Commands::Compare {
            photo,
            threshold,
            json,
        } => {
            let mut matcher = Matcher::from_config(&cfg);
            if let Some(threshold) = threshold {
                matcher = matcher.with_threshold(threshold);
            }
            compare(&store, &matcher, &photo, json)
        }
        Commands::List => list(&store),
        Commands::Purge => purge(&store),
        Commands::Config => open_config(cli.config.as_deref()),
    }
}

fn save(store: &ReferenceStore, photo: &Path) -> Result<()> {
    let bytes = intake::read_photo(photo)?;
    // refuse to store something that can never be compared
    photomatch::decode::decode(&bytes).context("decoding photo to save")?;

    let entry = store.append(&bytes).context("Failed to save reference")?;
    info!("Saved reference {} in {}", entry.id, store.root().display());
    println!("{}", reply::SAVED);
    Ok(())
}

fn compare(store: &ReferenceStore, matcher: &Matcher, photo: &Path, json: bool) -> Result<()> {
    if !(0.0..=1.0).contains(&matcher.threshold) {
        anyhow::bail!("threshold must be within [0, 1], got {}", matcher.threshold);
    }

    let bytes = intake::read_photo(photo)?;
    let references = store.load().context("Failed to load references")?;
    info!("Found {} stored reference(s)", references.len());

    let outcome = matcher.evaluate(&bytes, &references)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        println!("{}", reply::render(&outcome));
    }
    Ok(())
}

fn list(store: &ReferenceStore) -> Result<()> {
    let references = store.load().context("Failed to load references")?;
    info!(
        "{} reference(s) in {}",
        references.len(),
        store.root().display()
    );
    for entry in &references {
        let state = if entry.buffer.is_some() {
            "image"
        } else {
            "missing buffer"
        };
        println!("{}\t{}", entry.id, state);
    }
    Ok(())
}

fn purge(store: &ReferenceStore) -> Result<()> {
    info!("Purging references in {}", store.root().display());

    store.purge().context("Failed to purge references")?;

    info!("✓ All references purged");
    Ok(())
}

fn open_config(path: Option<&Path>) -> Result<()> {
    let config_path = path.unwrap_or(config::CONFIG_PATH.as_path());
    if !config_path.exists() {
        config::save_config(&config::Config::default(), Some(config_path))?;
    }
    let editor = env::var("EDITOR").unwrap_or_else(|_| "vi".to_string());

    info!("Opening config file: {:?}", config_path);

    let status = std::process::Command::new(editor)
        .arg(config_path)
        .status()
        .context("Failed to open editor")?;

    if !status.success() {
        anyhow::bail!("Editor exited with non-zero status");
    }

    Ok(())
}
