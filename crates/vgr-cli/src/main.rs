use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;
use vgr_core::DecoderConfig;

mod commands;
mod frames;

#[derive(Parser)]
#[command(name = "vgr")]
#[command(about = "Vainglory replay decoder", long_about = None)]
struct Cli {
    /// Decoder configuration (TOML); defaults are used when omitted
    #[arg(short, long, global = true, env = "VGR_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, Debug, Default, ValueEnum)]
pub enum OutputFormat {
    /// Full match results as a JSON array
    #[default]
    Json,
    /// One JSON object per player per line
    Ndjson,
    /// One tab-separated row per player
    Tsv,
}

#[derive(Subcommand)]
enum Command {
    /// Decode every match in a frame directory
    #[command(visible_alias = "d")]
    Decode {
        /// Directory of `<match>.<frame>.vgr` files, or one frame file
        input: PathBuf,

        /// Ground-truth JSON for side resolution and calibration
        #[arg(short, long)]
        truth: Option<PathBuf>,

        /// Calibration snapshot used when the corpus cannot calibrate itself
        #[arg(long)]
        calibration: Option<PathBuf>,

        #[arg(short, long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,

        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Fit calibration on a corpus and report leave-one-out accuracy
    Calibrate {
        input: PathBuf,

        #[arg(short, long)]
        truth: PathBuf,

        /// Where to save the snapshot fitted on all matches
        #[arg(short, long, default_value = "calibration.json")]
        output: PathBuf,
    },

    /// Count headers and credit actions; rank actions against truth gold
    Survey {
        input: PathBuf,

        #[arg(short, long)]
        truth: Option<PathBuf>,

        /// Number of headers to list per match
        #[arg(long, default_value_t = 20)]
        top: usize,
    },

    /// Search frames for a byte pattern (e.g. "10 04 1D ?? ?? 05 DC")
    Search {
        input: PathBuf,

        pattern: String,

        /// Bytes of context shown per hit
        #[arg(long, default_value_t = 16)]
        context: usize,

        /// Maximum hits per match
        #[arg(short, long, default_value_t = 50)]
        limit: usize,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("vgr=info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Command::Decode {
            input,
            truth,
            calibration,
            format,
            output,
        } => commands::decode::run(
            config,
            &input,
            truth.as_deref(),
            calibration.as_deref(),
            format,
            output.as_deref(),
        ),
        Command::Calibrate {
            input,
            truth,
            output,
        } => commands::calibrate::run(config, &input, &truth, &output),
        Command::Survey { input, truth, top } => {
            commands::survey::run(config, &input, truth.as_deref(), top)
        }
        Command::Search {
            input,
            pattern,
            context,
            limit,
        } => commands::search::run(&input, &pattern, context, limit),
    }
}

fn load_config(path: Option<&Path>) -> Result<DecoderConfig> {
    match path {
        Some(path) => {
            let config = DecoderConfig::load(path)
                .with_context(|| format!("Failed to load config {}", path.display()))?;
            info!("Loaded config from {}", path.display());
            Ok(config)
        }
        None => Ok(DecoderConfig::default()),
    }
}
