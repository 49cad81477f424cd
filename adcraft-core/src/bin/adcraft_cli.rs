//! AdCraft CLI - local driver for the creative engine
//!
//! Commands: catalog, upload, generate, regenerate, switch, approve, active, lineage
//! Outputs JSON to stdout, logs to stderr
//! Returns exit code 2 on any engine error

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use serde_json::json;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use adcraft_core::{
    builtin_catalog, Collaborators, EngineConfig, EngineResult, Format, FsStorage,
    GenerateRequest, Language, MemoryStore, Studio, ZonePolicy,
};

#[derive(Parser)]
#[command(name = "adcraft-cli")]
#[command(about = "AdCraft CLI - ad creative composition engine", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// JSON config file, applied before ADCRAFT_* environment variables
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Root directory for the originals and generated buckets
    #[arg(long, global = true)]
    storage_root: Option<PathBuf>,

    /// Store snapshot kept between runs
    #[arg(long, global = true)]
    state_file: Option<PathBuf>,

    /// Extra font directory (repeatable)
    #[arg(long = "font-dir", global = true)]
    font_dirs: Vec<PathBuf>,

    /// Fixed RNG seed for reproducible picks
    #[arg(long, global = true)]
    seed: Option<u64>,

    /// What to do with out-of-bounds safe zones: clamp or reject
    #[arg(long, global = true)]
    zone_policy: Option<ZonePolicy>,
}

#[derive(Clone, Copy, ValueEnum)]
enum Target {
    Style,
    Headline,
}

#[derive(Subcommand)]
enum Commands {
    /// List families and styles
    Catalog,

    /// Upload a product photo (PNG, JPEG or WebP)
    Upload {
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Generate creatives for one or more images
    Generate {
        /// Image ID (repeatable)
        #[arg(short, long = "image", required = true)]
        images: Vec<String>,

        /// Family ID (repeatable); all families when omitted
        #[arg(long = "family", conflicts_with = "auto")]
        families: Vec<String>,

        /// Let the advisor pick a family per image
        #[arg(long)]
        auto: bool,

        #[arg(short, long, default_value = "en")]
        language: Language,

        #[arg(long, default_value = "4:5")]
        format: Format,

        /// Render every style of each family instead of one
        #[arg(long)]
        all_styles: bool,
    },

    /// Replace a result with a new style or headline
    Regenerate {
        #[arg(short, long)]
        result: String,

        #[arg(long, value_enum)]
        what: Target,
    },

    /// Switch language and/or format for several results
    Switch {
        /// Result ID (repeatable)
        #[arg(short, long = "result", required = true)]
        results: Vec<String>,

        #[arg(short, long)]
        language: Option<Language>,

        #[arg(long)]
        format: Option<Format>,
    },

    /// Approve a result, or revoke approval
    Approve {
        #[arg(short, long)]
        result: String,

        #[arg(long)]
        revoke: bool,
    },

    /// List active results for an image
    Active {
        #[arg(short, long)]
        image: String,
    },

    /// Show the supersession chain a result belongs to
    Lineage {
        #[arg(short, long)]
        result: String,
    },
}

fn load_config(cli: &Cli) -> EngineResult<EngineConfig> {
    let mut config = EngineConfig::load(cli.config.as_deref())?;
    if let Some(root) = &cli.storage_root {
        config.storage_root = root.clone();
    }
    if let Some(state) = &cli.state_file {
        config.state_file = state.clone();
    }
    if !cli.font_dirs.is_empty() {
        config.font_dirs = cli.font_dirs.clone();
    }
    if cli.seed.is_some() {
        config.seed = cli.seed;
    }
    if let Some(policy) = cli.zone_policy {
        config.zone_policy = policy;
    }
    Ok(config)
}

impl Commands {
    /// Whether the command can write to the store.
    fn mutates(&self) -> bool {
        !matches!(self, Commands::Catalog | Commands::Active { .. } | Commands::Lineage { .. })
    }
}

fn execute(studio: &Studio, command: Commands) -> EngineResult<serde_json::Value> {
    let output = match command {
        Commands::Catalog => {
            let catalog = studio.catalog();
            json!({
                "engineVersion": adcraft_core::ENGINE_VERSION,
                "families": catalog.families(),
                "styles": catalog.styles().iter().map(|s| &s.definition).collect::<Vec<_>>(),
                "zones": catalog.zone_vocabulary(),
            })
        }

        Commands::Upload { file } => {
            let bytes = std::fs::read(&file)?;
            let filename = file
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            serde_json::to_value(studio.upload_image(&filename, &bytes)?)?
        }

        Commands::Generate { images, families, auto, language, format, all_styles } => {
            let mut request = GenerateRequest::new(language, format).families(families);
            if auto {
                request = request.auto();
            }
            if all_styles {
                request = request.all_styles();
            }
            let results = match images.as_slice() {
                [image] => studio.generate(image, &request)?,
                _ => studio.generate_batch(&images, &request)?,
            };
            serde_json::to_value(results)?
        }

        Commands::Regenerate { result, what } => {
            let replacement = match what {
                Target::Style => studio.regenerate_style(&result)?,
                Target::Headline => studio.regenerate_headline(&result)?,
            };
            serde_json::to_value(replacement)?
        }

        Commands::Switch { results, language, format } => {
            let replacements = studio.switch(&results, language, format)?;
            let skipped: Vec<&String> = results
                .iter()
                .filter(|id| !replacements.iter().any(|r| &r.superseded_id == *id))
                .collect();
            json!({ "replacements": replacements, "skipped": skipped })
        }

        Commands::Approve { result, revoke } => {
            serde_json::to_value(studio.set_approval(&result, !revoke)?)?
        }

        Commands::Active { image } => serde_json::to_value(studio.active_results(&image)?)?,

        Commands::Lineage { result } => serde_json::to_value(studio.lineage(&result)?)?,
    };
    Ok(output)
}

/// A failed mutating command may already have persisted images, specs or
/// results, so the snapshot is written whether or not it succeeded.
fn run(cli: Cli) -> EngineResult<serde_json::Value> {
    let config = load_config(&cli)?;
    let store = Arc::new(MemoryStore::load(&config.state_file)?);
    let storage = Arc::new(FsStorage::new(config.storage_root.clone()));
    let catalog = Arc::new(builtin_catalog()?);
    let studio = Studio::new(&config, catalog, Collaborators::stock(storage, store.clone()));

    let dirty = cli.command.mutates();
    let outcome = execute(&studio, cli.command);
    if !dirty {
        return outcome;
    }

    let saved = store.save(&config.state_file);
    match &saved {
        Ok(()) => tracing::debug!(state = %config.state_file.display(), "state saved"),
        Err(e) if outcome.is_err() => tracing::error!(error = %e, "state not saved after failed command"),
        Err(_) => {}
    }
    let output = outcome?;
    saved?;
    Ok(output)
}

fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "adcraft_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match run(Cli::parse()) {
        Ok(output) => {
            println!("{:#}", output);
            ExitCode::SUCCESS
        }
        Err(e) => {
            let output = json!({
                "error": e.to_string(),
                "kind": e.kind(),
                "transient": e.is_transient(),
            });
            println!("{}", output);
            ExitCode::from(2)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use adcraft_core::{EngineError, Store};

    #[test]
    fn test_flags_override_config() {
        let cli = Cli::parse_from([
            "adcraft-cli",
            "--seed",
            "9",
            "--zone-policy",
            "reject",
            "--font-dir",
            "assets/fonts",
            "catalog",
        ]);
        let config = load_config(&cli).unwrap();
        assert_eq!(config.seed, Some(9));
        assert_eq!(config.zone_policy, ZonePolicy::Reject);
        assert_eq!(config.font_dirs, vec![PathBuf::from("assets/fonts")]);
    }

    #[test]
    fn test_generate_parses_format_tags() {
        let cli = Cli::parse_from([
            "adcraft-cli", "generate", "-i", "img_1", "--family", "promo", "--format", "9:16", "-l", "de",
        ]);
        match cli.command {
            Commands::Generate { images, families, format, language, .. } => {
                assert_eq!(images, vec!["img_1"]);
                assert_eq!(families, vec!["promo"]);
                assert_eq!(format, Format::Story);
                assert_eq!(language, Language::De);
            }
            _ => panic!("expected generate"),
        }
    }

    #[test]
    fn test_failed_batch_still_saves_what_it_rendered() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("storage");
        let state = dir.path().join("state.json");
        let photo = dir.path().join("product.png");
        image::RgbImage::from_pixel(40, 50, image::Rgb([90, 120, 200])).save(&photo).unwrap();

        let cli = |rest: &[&str]| {
            let mut args = vec![
                "adcraft-cli",
                "--storage-root",
                root.to_str().unwrap(),
                "--state-file",
                state.to_str().unwrap(),
                "--seed",
                "3",
            ];
            args.extend_from_slice(rest);
            Cli::parse_from(args)
        };

        let uploaded = run(cli(&["upload", "-f", photo.to_str().unwrap()])).unwrap();
        let image_id = uploaded["id"].as_str().unwrap().to_string();

        let err = run(cli(&["generate", "-i", image_id.as_str(), "-i", "img_missing", "--family", "promo"]))
            .unwrap_err();
        assert!(matches!(err, EngineError::NotFound { entity: "image", .. }));

        let store = MemoryStore::load(&state).unwrap();
        assert_eq!(store.list_active_for_image(&image_id).unwrap().len(), 1);
    }

    #[test]
    fn test_read_only_commands_do_not_mutate() {
        assert!(!Cli::parse_from(["adcraft-cli", "catalog"]).command.mutates());
        assert!(!Cli::parse_from(["adcraft-cli", "active", "-i", "img_1"]).command.mutates());
        assert!(Cli::parse_from(["adcraft-cli", "approve", "-r", "rr_1"]).command.mutates());
    }
}
