mod cli_utils;
mod commands;

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use commands::{cmd_batch, cmd_inspect, cmd_query, OpenOptions};

#[derive(Parser)]
#[command(name = "geobin")]
#[command(
    about = "IP geolocation lookups against BIN databases",
    long_about = "geobin - IP geolocation lookups against fixed-schema BIN databases\n\n\
    Resolves IPv4 and IPv6 addresses (including IPv4-mapped, 6to4 and Teredo\n\
    forms) to country, region, city, coordinates and the other columns the\n\
    database carries. Files are memory-mapped unless --direct is given.\n\n\
    Examples:\n\
      geobin query IP2LOCATION-LITE-DB11.BIN 8.8.8.8 2001:4860:4860::8888\n\
      geobin inspect IP2LOCATION-LITE-DB11.BIN\n\
      geobin batch IP2LOCATION-LITE-DB11.BIN access-ips.txt.gz --format csv -j 8"
)]
#[command(version)]
struct Cli {
    /// Log more (-v debug, -vv trace); RUST_LOG takes precedence
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// JSON config supplying use_memory_map and cache_capacity defaults
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve one or more addresses
    Query {
        /// Path to the BIN database
        #[arg(value_name = "DATABASE")]
        database: PathBuf,

        /// Addresses to resolve
        #[arg(value_name = "ADDRESS", required = true)]
        addresses: Vec<String>,

        /// Read the file directly instead of memory-mapping it
        #[arg(long)]
        direct: bool,

        /// No output, exit code only (0 = every address resolved)
        #[arg(short, long)]
        quiet: bool,
    },

    /// Show header metadata and schema columns
    Inspect {
        /// Path to the BIN database
        #[arg(value_name = "DATABASE")]
        database: PathBuf,

        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Resolve addresses read from files or stdin
    Batch {
        /// Path to the BIN database
        #[arg(value_name = "DATABASE")]
        database: PathBuf,

        /// Address lists (one per line, .gz accepted), or "-" for stdin
        #[arg(value_name = "INPUT", required = true)]
        inputs: Vec<PathBuf>,

        /// Output format: json (NDJSON) or csv
        #[arg(long, default_value = "json")]
        format: String,

        /// Worker threads (default: auto)
        #[arg(short = 'j', long)]
        threads: Option<String>,

        /// Read the file directly instead of memory-mapping it
        #[arg(long)]
        direct: bool,

        /// Print statistics to stderr when done
        #[arg(short, long)]
        stats: bool,
    },
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "geobin=warn",
        1 => "geobin=debug",
        _ => "geobin=trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .try_init()
        .ok();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Query {
            database,
            addresses,
            direct,
            quiet,
        } => cmd_query(
            OpenOptions::new(database, cli.config, direct)?,
            addresses,
            quiet,
        ),
        Commands::Inspect { database, json } => {
            cmd_inspect(OpenOptions::new(database, cli.config, false)?, json)
        }
        Commands::Batch {
            database,
            inputs,
            format,
            threads,
            direct,
            stats,
        } => cmd_batch(
            OpenOptions::new(database, cli.config, direct)?,
            inputs,
            format,
            threads,
            stats,
        ),
    }
}
