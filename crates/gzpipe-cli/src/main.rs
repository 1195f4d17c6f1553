//! gzpipe - streaming gzip compression tool
//!
//! Compresses files into gzip members through a streaming DEFLATE engine,
//! with a choice of allocator for the engine's internal memory.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use console::style;
use gzpipe_config::{AllocatorKind, Config, ConfigBuilder, ConfigFormat, ConfigLoader};
use gzpipe_types::{CompressionLevel, CompressionStats, CompressionStrategy};
use std::path::PathBuf;
use std::time::Instant;
use tracing::{error, info};

mod compress;
mod display;

use compress::{CompressOptions, EngineMemory};

/// gzpipe - streaming gzip compression tool
#[derive(Parser)]
#[command(
    name = "gzpipe",
    version = env!("CARGO_PKG_VERSION"),
    about = "Streaming gzip compression tool",
    long_about = "gzpipe compresses files into gzip members through a streaming DEFLATE engine.\n\
                  The engine's memory can be served by its own allocator, Rust's global\n\
                  allocator, or a tracking allocator with an optional byte budget."
)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Quiet mode - minimal output
    #[arg(short, long)]
    quiet: bool,

    /// Verbose mode - detailed output
    #[arg(short, long)]
    verbose: bool,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compress files to <file>.gz
    Compress {
        /// Files or directories to compress
        #[arg(required = true)]
        paths: Vec<PathBuf>,
        /// Write compressed data to standard output
        #[arg(short = 'c', long)]
        stdout: bool,
        /// Keep input files
        #[arg(short, long)]
        keep: bool,
        /// Overwrite existing output files
        #[arg(short, long)]
        force: bool,
        /// Compress files in directories recursively
        #[arg(short, long)]
        recursive: bool,
        /// Compression level (-1 for engine default, 0-9)
        #[arg(short, long, allow_hyphen_values = true, value_parser = clap::value_parser!(i32).range(-1..=9))]
        level: Option<i32>,
        /// Matching strategy
        #[arg(short, long, value_enum)]
        strategy: Option<StrategyArg>,
        /// Allocator serving the engine's memory
        #[arg(short, long, value_enum)]
        allocator: Option<AllocatorArg>,
        /// Byte budget for engine allocations
        #[arg(long)]
        memory_limit: Option<u64>,
    },
    /// Show configuration
    Config {
        /// Show default configuration
        #[arg(long)]
        default: bool,
        /// Output format
        #[arg(long, value_enum, default_value = "yaml")]
        format: FormatArg,
    },
}

#[derive(clap::ValueEnum, Clone, Copy)]
enum StrategyArg {
    Default,
    Filtered,
    HuffmanOnly,
    Rle,
    Fixed,
}

impl From<StrategyArg> for CompressionStrategy {
    fn from(strategy: StrategyArg) -> Self {
        match strategy {
            StrategyArg::Default => CompressionStrategy::Default,
            StrategyArg::Filtered => CompressionStrategy::Filtered,
            StrategyArg::HuffmanOnly => CompressionStrategy::HuffmanOnly,
            StrategyArg::Rle => CompressionStrategy::Rle,
            StrategyArg::Fixed => CompressionStrategy::Fixed,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Copy)]
enum AllocatorArg {
    Engine,
    Global,
    Tracking,
}

impl From<AllocatorArg> for AllocatorKind {
    fn from(allocator: AllocatorArg) -> Self {
        match allocator {
            AllocatorArg::Engine => AllocatorKind::Engine,
            AllocatorArg::Global => AllocatorKind::Global,
            AllocatorArg::Tracking => AllocatorKind::Tracking,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Copy)]
enum FormatArg {
    Yaml,
    Toml,
    Json,
}

impl From<FormatArg> for ConfigFormat {
    fn from(format: FormatArg) -> Self {
        match format {
            FormatArg::Yaml => ConfigFormat::Yaml,
            FormatArg::Toml => ConfigFormat::Toml,
            FormatArg::Json => ConfigFormat::Json,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = load_config(cli.config.as_ref())?;

    init_logging(cli.debug, cli.quiet, cli.verbose, &config.logging.level)?;

    info!("gzpipe v{} starting", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Compress {
            paths,
            stdout,
            keep,
            force,
            recursive,
            level,
            strategy,
            allocator,
            memory_limit,
        } => {
            let mut config = config;
            if let Some(level) = level {
                config.compression.level =
                    CompressionLevel::new(level).map_err(anyhow::Error::msg)?;
            }
            if let Some(strategy) = strategy {
                config.compression.strategy = strategy.into();
            }
            if let Some(allocator) = allocator {
                config.memory.allocator = allocator.into();
            }
            if memory_limit.is_some() {
                config.memory.limit_bytes = memory_limit;
            }
            ConfigBuilder::validate(&config)?;

            let options = CompressOptions {
                to_stdout: stdout,
                keep,
                force,
                recursive,
            };
            // Progress output would interleave with the compressed stream.
            let quiet = cli.quiet || stdout;
            compress_command(&paths, options, &config, quiet)?;
        }
        Commands::Config { default, format } => {
            let source = cli.config.or_else(ConfigLoader::config_exists);
            config_command(&config, source, default, format.into())?;
        }
    }

    Ok(())
}

fn load_config(path: Option<&PathBuf>) -> Result<Config> {
    let config = match path {
        Some(path) => ConfigLoader::load_from_file(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => ConfigLoader::load_default()?,
    };
    Ok(config)
}

fn init_logging(debug: bool, quiet: bool, verbose: bool, configured: &str) -> Result<()> {
    use tracing_subscriber::{fmt, EnvFilter};

    let level = if debug {
        "debug"
    } else if verbose {
        "info"
    } else if quiet {
        "error"
    } else {
        configured
    };

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .context("Invalid log filter")?;

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .init();

    Ok(())
}

fn compress_command(
    paths: &[PathBuf],
    options: CompressOptions,
    config: &Config,
    quiet: bool,
) -> Result<()> {
    let inputs = compress::collect_inputs(paths, options.recursive)?;
    info!(
        "Compressing {} file(s) with level {}, strategy {}, allocator {}",
        inputs.len(),
        config.compression.level.get(),
        config.compression.strategy.name(),
        config.memory.allocator
    );

    if !quiet {
        eprintln!(
            "{} Compressing {} file(s)",
            style("→").green().bold(),
            style(inputs.len()).cyan()
        );
    }

    let total_bytes = inputs
        .iter()
        .filter_map(|path| std::fs::metadata(path).ok())
        .map(|metadata| metadata.len())
        .sum();
    let pb = display::create_progress_bar(total_bytes, quiet);

    let memory = EngineMemory::from_config(&config.memory);
    let start = Instant::now();
    let mut totals = CompressionStats::new();
    let mut compressed = 0;
    let mut failed = 0;

    for input in &inputs {
        if let Some(pb) = &pb {
            pb.set_message(input.display().to_string());
        }
        match compress::compress_file(input, options, &memory, &config.compression, pb.as_ref()) {
            Ok(stats) => {
                totals.merge(&stats);
                compressed += 1;
            }
            Err(e) => {
                error!("{:#}", e);
                failed += 1;
            }
        }
    }

    if let Some(pb) = pb {
        pb.finish_with_message("Compression completed");
    }

    if !quiet {
        display::print_summary(
            compressed,
            failed,
            &totals,
            start.elapsed(),
            memory.snapshot(),
        );
    }

    if failed > 0 {
        anyhow::bail!("{} of {} file(s) failed", failed, inputs.len());
    }
    info!("Compression completed successfully");
    Ok(())
}

fn config_command(
    config: &Config,
    source: Option<PathBuf>,
    default: bool,
    format: ConfigFormat,
) -> Result<()> {
    let (title, shown) = if default {
        ("Default configuration:", Config::default())
    } else {
        ("Current configuration:", config.clone())
    };

    println!("{} {}", style("⚙").blue().bold(), title);
    if !default {
        match source {
            Some(path) => println!("# loaded from {}", path.display()),
            None => println!("# no configuration file found, showing defaults and overrides"),
        }
    }
    print!("{}", ConfigLoader::to_string(&shown, format)?);
    Ok(())
}
