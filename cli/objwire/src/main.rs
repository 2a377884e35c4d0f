//! objwire CLI: inspect, decode and produce objwire binary object streams.

mod commands;
mod config;

use std::io;
use std::path::{Path, PathBuf};
use std::process;

use anyhow::Result;
use clap::{Parser, Subcommand};
use clap_verbosity_flag::{Verbosity, WarnLevel};

use config::ObjwireConfig;

#[derive(Parser)]
#[command(name = "objwire", version, about = "Binary object-graph streams")]
struct Cli {
    /// Configuration file (defaults to the nearest objwire.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(flatten)]
    verbose: Verbosity<WarnLevel>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the records of a stream
    Dump {
        /// Stream file
        stream: PathBuf,
    },
    /// Deserialize a stream and print its graph
    Decode {
        /// Stream file
        stream: PathBuf,
        /// Print the graph as a JSON document instead of a text listing
        #[arg(long)]
        json: bool,
    },
    /// Serialize a JSON graph document into a stream
    Encode {
        /// JSON graph document
        input: PathBuf,
        /// Stream file to write
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Round-trip a JSON graph document and verify it comes back unchanged
    Check {
        /// JSON graph document
        input: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(cli.verbose.log_level_filter())
        .init();

    if let Err(e) = run(cli) {
        eprintln!("error: {e:#}");
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = load_config(cli.config.as_deref())?;
    let mut out = io::stdout().lock();

    match cli.command {
        Commands::Dump { stream } => commands::dump::run(&config, &stream, &mut out),
        Commands::Decode { stream, json } => commands::decode::run(&config, &stream, json, &mut out),
        Commands::Encode { input, output } => {
            commands::encode::run(&config, &input, &output, &mut out)
        }
        Commands::Check { input } => commands::check::run(&config, &input, &mut out),
    }
}

/// An explicit `--config` must exist; otherwise search upward from the
/// current directory and fall back to defaults.
fn load_config(explicit: Option<&Path>) -> Result<ObjwireConfig> {
    if let Some(path) = explicit {
        return ObjwireConfig::load(path);
    }
    let cwd = std::env::current_dir()?;
    match ObjwireConfig::find_and_load(&cwd)? {
        Some((config, dir)) => {
            log::debug!("using {}", dir.join(config::CONFIG_FILE).display());
            Ok(config)
        }
        None => Ok(ObjwireConfig::default()),
    }
}
