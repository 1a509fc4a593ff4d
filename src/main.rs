//! # vn-roster CLI (`vnr`)
//!
//! ## Usage
//!
//! ```bash
//! vnr --config ./config/vnr.toml fetch [OPTIONS]
//! ```
//!
//! ## Examples
//!
//! ```bash
//! # Two VNs into a fresh store
//! vnr fetch --vn-ids v17 v11 --out data/db.json
//!
//! # Extend the store with the first three pages of the most-voted VNs
//! vnr fetch --top-vns 3 --out data/db.json --append
//!
//! # Print normalized records as JSON lines
//! vnr fetch --vn-ids 17
//! ```
//!
//! Every failure, including "nothing to fetch", exits with status 1.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{error, info};

use vn_roster::client::VndbClient;
use vn_roster::config;
use vn_roster::fetch::PacingPolicy;
use vn_roster::harvest::{HarvestOptions, HarvestOutcome, Harvester};
use vn_roster::logging;
use vn_roster::scoring::TraitPolicy;
use vn_roster::traits::TokioSleeper;

/// vn-roster — harvest VNDB characters into an incremental JSON store.
#[derive(Parser)]
#[command(
    name = "vnr",
    about = "Fetch VNDB character data and assign signature traits",
    version
)]
struct Cli {
    /// Path to configuration file (TOML). Built-in defaults are used when
    /// the file does not exist.
    #[arg(long, global = true, default_value = "./config/vnr.toml")]
    config: PathBuf,

    /// Also write log lines to this file.
    #[arg(long, global = true)]
    logfile: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch characters, label and normalize them, and write the store.
    Fetch {
        /// One or more VN ids, e.g. `v5` or `5`.
        #[arg(long = "vn-ids", short = 'v', num_args = 1..)]
        vn_ids: Vec<String>,

        /// Also fetch this many pages of the top-VN listing.
        #[arg(long = "top-vns", short = 't', default_value_t = 0)]
        top_vns: u32,

        /// First listing page when using `--top-vns`.
        #[arg(long, default_value_t = 1)]
        start: u32,

        /// Sort key for the top-VN listing.
        #[arg(long, default_value = "votecount")]
        sort: String,

        /// Seconds to sleep before the first request and after each batch.
        #[arg(long)]
        sleep: Option<f64>,

        /// Retries per VN before the run is aborted.
        #[arg(long)]
        retries: Option<u32>,

        /// Store file. Without it, records are printed to stdout.
        #[arg(long, short = 'o')]
        out: Option<PathBuf>,

        /// Merge into the existing store instead of replacing it.
        #[arg(long)]
        append: bool,

        /// Dump raw catalog records and exit.
        #[arg(long)]
        raw: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = logging::init_logging(cli.logfile.as_deref()) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
    if let Some(path) = &cli.logfile {
        info!(path = %path.display(), "File logging enabled");
    }

    if let Err(e) = run(cli).await {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut cfg = config::load_config_or_default(&cli.config)?;

    match cli.command {
        Commands::Fetch {
            vn_ids,
            top_vns,
            start,
            sort,
            sleep,
            retries,
            out,
            append,
            raw,
        } => {
            if let Some(secs) = sleep {
                cfg.pacing.batch_interval_secs = secs;
            }
            if let Some(n) = retries {
                cfg.pacing.max_retries = n;
            }
            config::validate(&cfg)?;

            let client = VndbClient::new(&cfg.api)?;
            let harvester = Harvester {
                client: &client,
                sleeper: &TokioSleeper,
                pacing: PacingPolicy::from_config(&cfg.pacing),
                scoring: TraitPolicy::from_config(&cfg.scoring),
            };
            let opts = HarvestOptions {
                vn_ids,
                top_pages: top_vns,
                start_page: start,
                sort,
                out: out.or(cfg.store.path.clone()),
                append,
                raw,
            };

            let mut stdout = std::io::stdout().lock();
            match harvester.run(&opts, &mut stdout).await {
                Ok(outcome) => report(&outcome),
                Err(e) if e.is_nothing_to_do() => {
                    error!("{} - exiting", e);
                    std::process::exit(1);
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    Ok(())
}

fn report(outcome: &HarvestOutcome) {
    match outcome {
        HarvestOutcome::RawDumped { characters } => {
            info!(characters, "Raw dump complete");
        }
        HarvestOutcome::Printed { records } => {
            info!(records, "Printed records");
        }
        HarvestOutcome::Written {
            path,
            new_records,
            total_characters,
            total_vns,
        } => {
            info!(
                path = %path.display(),
                new_records,
                total_characters,
                total_vns,
                "ok"
            );
        }
    }
}
