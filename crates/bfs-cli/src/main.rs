//! bfs-cli - Command-line interface for the bfs archiver
//!
//! Packs a directory tree into a single `.bfs` file and unpacks it again:
//! - `compress` walks a directory, honouring its ignore list
//! - `extract` recreates the tree under an output directory
//! - `list` shows the entries of an archive
//! - `config` shows the effective configuration

use anyhow::Result;
use bfs_core::archive::{self, ExtractOptions, PackOptions};
use bfs_core::config::Config;
use bfs_core::progress::ProgressReporter;
use bfs_core::{Algorithm, ErrorKind};
use clap::{ArgAction, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

const EXIT_OTHER: i32 = 1;
const EXIT_IO: i32 = 2;
const EXIT_VALIDATION: i32 = 3;
const EXIT_FORMAT: i32 = 4;

/// bfs - pack a directory into one file and back
#[derive(Parser)]
#[command(name = "bfs")]
#[command(author, version, about = "A single-file directory archiver", long_about = None)]
struct Cli {
    /// Enable verbose output for debugging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Show progress bar during operations
    #[arg(long, global = true)]
    progress: bool,

    /// Configuration file to use instead of the default location
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Pack a directory into an archive
    Compress {
        /// Directory to pack
        #[arg(short, long)]
        input: PathBuf,

        /// Archive file to write
        #[arg(short, long)]
        output: PathBuf,

        /// Skip the files listed in the ignore file (true or false)
        #[arg(short = 'I', long = "useIgnoreFile", action = ArgAction::Set, value_name = "BOOL")]
        use_ignore_file: Option<bool>,

        /// Compression algorithm (store, lz4, zstd, gzip, xz, brotli)
        #[arg(long)]
        codec: Option<Algorithm>,

        /// Compression level
        #[arg(long)]
        level: Option<u32>,

        /// Follow symlinks (pack link targets instead of skipping links)
        #[arg(long)]
        follow_symlinks: bool,
    },

    /// Extract an archive into a directory
    Extract {
        /// Archive file to read
        #[arg(short, long)]
        input: PathBuf,

        /// Output directory
        #[arg(short, long)]
        output: PathBuf,

        /// Compression algorithm the archive was written with
        #[arg(long)]
        codec: Option<Algorithm>,
    },

    /// List archive contents
    List {
        /// Archive file to inspect
        #[arg(short, long)]
        input: PathBuf,

        /// Compression algorithm the archive was written with
        #[arg(long)]
        codec: Option<Algorithm>,

        /// Output format as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show configuration
    Config {
        /// Show current configuration
        #[arg(long, conflicts_with = "path")]
        show: bool,

        /// Show configuration file path
        #[arg(long, conflicts_with = "show")]
        path: bool,
    },
}

fn setup_logging(verbose: bool, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // Help and version go to stdout and are not failures
            let code = if e.use_stderr() { EXIT_VALIDATION } else { 0 };
            let _ = e.print();
            process::exit(code);
        }
    };

    setup_logging(cli.verbose, cli.quiet);

    match run(cli) {
        Ok(()) => process::exit(0),
        Err(e) => {
            let exit_code = map_error_to_exit_code(&e);
            match e.downcast_ref::<bfs_core::Error>() {
                Some(core_err) => error!("{}: {}", core_err.kind(), e),
                None => error!("Error: {:#}", e),
            }
            process::exit(exit_code);
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Compress {
            input,
            output,
            use_ignore_file,
            codec,
            level,
            follow_symlinks,
        } => {
            let mut options = PackOptions::from_config(&config);
            if let Some(use_ignore_file) = use_ignore_file {
                options.use_ignore_file = use_ignore_file;
            }
            if let Some(codec) = codec {
                options.algorithm = codec;
            }
            if let Some(level) = level {
                options.level = level;
            }
            options.follow_symlinks |= follow_symlinks;

            info!("Packing {:?} into {:?}", input, output);
            let mut reporter = ProgressReporter::new(cli.progress);
            let summary = archive::pack_with_progress(&input, &output, &options, &mut reporter)?;
            info!(
                "Compression complete: {} files, {} bytes",
                summary.entries, summary.archive_size
            );
        }

        Commands::Extract {
            input,
            output,
            codec,
        } => {
            let options = extract_options(&config, codec);

            info!("Extracting {:?} into {:?}", input, output);
            let mut reporter = ProgressReporter::new(cli.progress);
            let summary =
                archive::extract_with_progress(&input, &output, &options, &mut reporter)?;
            info!(
                "Extraction complete: {} files, {} bytes",
                summary.entries, summary.bytes_written
            );
        }

        Commands::List { input, codec, json } => {
            let options = extract_options(&config, codec);
            let entries = archive::inspect_file(&input, &options)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&entries)?);
            } else {
                println!("{:>12} {:>12}  Path", "Size", "Compressed");
                for entry in &entries {
                    println!(
                        "{:>12} {:>12}  {}",
                        entry.size, entry.compressed_size, entry.path
                    );
                }
                let total: u64 = entries.iter().map(|e| e.size).sum();
                println!("{} files, {} bytes", entries.len(), total);
            }
        }

        Commands::Config { show: _, path } => {
            if path {
                let config_path = match cli.config {
                    Some(path) => path,
                    None => Config::config_path()?,
                };
                println!("{}", config_path.display());
            } else {
                println!("{}", toml::to_string_pretty(&config)?);
            }
        }
    }

    Ok(())
}

/// Load the configuration, falling back to defaults when no file exists
fn load_config(path: Option<&Path>) -> Result<Config> {
    let config = match path {
        Some(path) if path.exists() => Config::load_from(path)?,
        Some(path) => {
            debug!(path = ?path, "Configuration file not found, using defaults");
            Config::default()
        }
        None => Config::load()?,
    };
    Ok(config)
}

fn extract_options(config: &Config, codec: Option<Algorithm>) -> ExtractOptions {
    let mut options = ExtractOptions::from_config(config);
    if let Some(codec) = codec {
        options.algorithm = codec;
    }
    options
}

/// Map errors to exit codes:
/// - 0: Success
/// - 1: Anything else
/// - 2: IO error
/// - 3: Invalid arguments or inputs
/// - 4: Malformed archive
fn map_error_to_exit_code(err: &anyhow::Error) -> i32 {
    if let Some(core_err) = err.downcast_ref::<bfs_core::Error>() {
        match core_err.kind() {
            ErrorKind::Io => EXIT_IO,
            ErrorKind::Validation => EXIT_VALIDATION,
            ErrorKind::Format => EXIT_FORMAT,
        }
    } else if err.is::<std::io::Error>() {
        EXIT_IO
    } else {
        EXIT_OTHER
    }
}
