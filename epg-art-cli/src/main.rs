//! epg-art CLI
//!
//! Fetches episode artwork from Schedules Direct for the programs in a
//! guide catalog.

mod commands;
mod error;
mod progress;

use std::io::Write;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use env_logger::{Builder, Target};
use log::LevelFilter;
use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;

use commands::ingest::IngestOptions;
use error::CliError;

#[derive(Parser)]
#[command(name = "epg-art")]
#[command(about = "Ingest episode artwork from Schedules Direct", long_about = None)]
struct Cli {
    /// Show debug output
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only show warnings and errors; hide progress
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch and apply artwork for every program in a catalog
    Ingest {
        /// Catalog JSON file to read programs from
        catalog: PathBuf,

        /// Write the updated catalog here instead of back to the input
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Do not write the catalog back after the pass
        #[arg(long, conflicts_with = "output")]
        no_save: bool,

        /// Use this cache file instead of the default location
        #[arg(long)]
        cache: Option<PathBuf>,

        /// Remove expired cache records before the pass
        #[arg(long)]
        purge_expired: bool,

        /// Artwork size tag (Sm, Md, Lg, Ms)
        #[arg(long)]
        size: Option<String>,

        /// Preferred aspect ratio (e.g., 4x3, 16x9)
        #[arg(long)]
        aspect: Option<String>,

        /// Programs per metadata request
        #[arg(long)]
        batch_size: Option<usize>,

        /// Maximum metadata requests in flight
        #[arg(long)]
        concurrency: Option<usize>,

        /// Remember programs that have no artwork
        #[arg(long)]
        cache_negative: bool,

        #[command(flatten)]
        account: AccountArgs,
    },

    /// Obtain a token and show account status
    Token {
        /// Discard any held token and request a new one
        #[arg(short, long)]
        force: bool,

        #[command(flatten)]
        account: AccountArgs,
    },

    /// Manage the artwork cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,

        /// Use this cache file instead of the default location
        #[arg(long, global = true)]
        cache: Option<PathBuf>,
    },

    /// Manage settings and credentials
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Account overrides for commands that talk to the service.
#[derive(clap::Args, Clone)]
struct AccountArgs {
    /// Schedules Direct username (overrides settings and environment)
    #[arg(long)]
    username: Option<String>,

    /// Schedules Direct password (overrides settings and environment)
    #[arg(long)]
    password: Option<String>,
}

#[derive(Subcommand)]
enum CacheAction {
    /// Show cache location and record counts
    Info,
    /// List keys whose records have expired
    Expired,
    /// Remove expired records
    Purge,
    /// Remove every record
    Clear,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show effective settings and credential sources
    Show,
    /// Print the settings file path
    Path,
    /// Write a settings file with default values
    Init {
        /// Overwrite an existing settings file
        #[arg(short, long)]
        force: bool,
    },
    /// Store account credentials in the settings file
    Credentials {
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: String,
    },
}

fn init_logger(verbose: bool, quiet: bool) {
    let level = if verbose {
        LevelFilter::Debug
    } else if quiet {
        LevelFilter::Warn
    } else {
        LevelFilter::Info
    };

    let mut builder = Builder::new();
    builder
        .target(Target::Stdout)
        .filter_level(LevelFilter::Warn)
        .filter_module("epg_art", level)
        .filter_module("epg_art_sd", level)
        .filter_module("epg_art_core", level)
        .format(|buf, record| writeln!(buf, "{}", record.args()));
    if let Ok(filters) = std::env::var("RUST_LOG") {
        builder.parse_filters(&filters);
    }
    builder.init();
}

fn run(cli: Cli) -> Result<(), CliError> {
    let quiet = cli.quiet;
    match cli.command {
        Commands::Ingest {
            catalog,
            output,
            no_save,
            cache,
            purge_expired,
            size,
            aspect,
            batch_size,
            concurrency,
            cache_negative,
            account,
        } => commands::ingest::run_ingest(
            IngestOptions {
                catalog,
                cache,
                output,
                no_save,
                purge_expired,
                size,
                aspect,
                batch_size,
                concurrency,
                cache_negative,
                username: account.username,
                password: account.password,
            },
            quiet,
        ),
        Commands::Token { force, account } => {
            commands::token::run_token(force, account.username, account.password, quiet)
        }
        Commands::Cache { action, cache } => match action {
            CacheAction::Info => commands::cache::run_cache_info(cache),
            CacheAction::Expired => commands::cache::run_cache_expired(cache),
            CacheAction::Purge => commands::cache::run_cache_purge(cache),
            CacheAction::Clear => commands::cache::run_cache_clear(cache),
        },
        Commands::Config { action } => match action {
            ConfigAction::Show => commands::config::run_config_show(),
            ConfigAction::Path => {
                commands::config::run_config_path();
                Ok(())
            }
            ConfigAction::Init { force } => commands::config::run_config_init(force),
            ConfigAction::Credentials { username, password } => {
                commands::config::run_config_credentials(username, password)
            }
        },
    }
}

fn main() {
    let cli = Cli::parse();
    init_logger(cli.verbose, cli.quiet);

    if let Err(e) = run(cli) {
        log::error!(
            "{} {}",
            "\u{2718}".if_supports_color(Stdout, |t| t.red()),
            e
        );
        std::process::exit(1);
    }
}
