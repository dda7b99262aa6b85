use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indexmap::IndexMap;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use codeshape::ast::TreeFilter;
use codeshape::{Mixer, SampleSize};

const MIXER_ENV: &str = "CODESHAPE_MIXER";
const COMPACT_ENV: &str = "CODESHAPE_COMPACT";

#[derive(Parser)]
#[command(author, version = env!("CARGO_PKG_VERSION"), about = "Structural analyses of JavaScript functions", long_about = None)]
struct Cli {
    /// Print single-line JSON instead of pretty JSON
    #[arg(long, global = true)]
    compact: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List every function, the available ones, and their normalized forms
    Functions {
        /// Source file, or `-` for stdin
        file: PathBuf,
    },

    /// Declared names of the first function and where they occur
    Vars {
        /// Source file, or `-` for stdin
        file: PathBuf,
    },

    /// Nesting tree of every syntax node
    Lifecycle {
        /// Source file, or `-` for stdin
        file: PathBuf,
    },

    /// Per-character matrix of enclosing syntax nodes
    Phenogram {
        /// Source file, or `-` for stdin
        file: PathBuf,

        /// Resample to <columns>x<rows>
        #[arg(long)]
        sample: Option<SampleSize>,
    },

    /// Phenograms of several files, computed in parallel
    MultiPhenogram {
        /// Source files
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Resample every matrix to <columns>x<rows>
        #[arg(long)]
        sample: Option<SampleSize>,
    },

    /// Blended per-character colors of variable flow
    HeatMap {
        /// Source file, or `-` for stdin
        file: PathBuf,

        /// Blend weighting (average, power, geometric, harmonic)
        #[arg(long, env = MIXER_ENV, default_value = "average")]
        mixer: Mixer,

        /// JSON object of node type -> color laid over the default palette
        #[arg(long)]
        palette: Option<PathBuf>,
    },

    /// Merged tree of the ancestor chains of identifiers
    IdentifierTree {
        /// Source file, or `-` for stdin
        file: PathBuf,

        /// Only follow identifiers with these names
        #[arg(long, value_delimiter = ',')]
        names: Option<Vec<String>>,

        /// Only keep ancestors of these node types
        #[arg(long, value_delimiter = ',', conflicts_with = "exclude")]
        include: Option<Vec<String>>,

        /// Drop ancestors of these node types
        #[arg(long, value_delimiter = ',')]
        exclude: Option<Vec<String>>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let compact = cli.compact || env_flag(COMPACT_ENV);

    match cli.command {
        Commands::Functions { file } => {
            let source = read_source(&file)?;
            emit(&codeshape::function_list(&source)?, compact)
        }
        Commands::Vars { file } => {
            let source = read_source(&file)?;
            emit(&codeshape::var_list(&source)?, compact)
        }
        Commands::Lifecycle { file } => {
            let source = read_source(&file)?;
            emit(&codeshape::lifecycle_data(&source)?, compact)
        }
        Commands::Phenogram { file, sample } => {
            let source = read_source(&file)?;
            emit(&codeshape::phenogram(&source, sample)?, compact)
        }
        Commands::MultiPhenogram { files, sample } => {
            let sources = files
                .iter()
                .map(|file| read_source(file))
                .collect::<Result<Vec<_>>>()?;
            emit(&codeshape::multi_phenogram(&sources, sample)?, compact)
        }
        Commands::HeatMap {
            file,
            mixer,
            palette,
        } => {
            let source = read_source(&file)?;
            let overrides = match palette {
                Some(path) => read_palette(&path)?,
                None => IndexMap::new(),
            };
            emit(&codeshape::heat_map(&source, mixer, &overrides)?, compact)
        }
        Commands::IdentifierTree {
            file,
            names,
            include,
            exclude,
        } => {
            let source = read_source(&file)?;
            let filter = TreeFilter::new(names, include, exclude)?;
            emit(&codeshape::identifier_tree(&source, &filter)?, compact)
        }
    }
}

fn env_flag(name: &str) -> bool {
    std::env::var(name)
        .map(|value| matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(false)
}

fn read_source(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut source = String::new();
        std::io::stdin()
            .read_to_string(&mut source)
            .context("Failed to read source from stdin")?;
        return Ok(source);
    }
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn read_palette(path: &Path) -> Result<IndexMap<String, String>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read palette {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("Invalid palette JSON in {}", path.display()))
}

fn emit<T: Serialize>(value: &T, compact: bool) -> Result<()> {
    let json = if compact {
        serde_json::to_string(value)?
    } else {
        serde_json::to_string_pretty(value)?
    };
    println!("{}", json);
    Ok(())
}
