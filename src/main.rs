use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use log::{error, info};

use emploi_scraper_lib::sink::json_store::DEFAULT_STORE_FILE;
use emploi_scraper_lib::sink::{ALL_OFFERS_COLLECTION, LAST_CHANCE_COLLECTION};
use emploi_scraper_lib::{logger, Settings};
use emploi_scraper_lib::{
    CutoffComparison, FirestoreSink, HttpFetcher, JobRecord, JsonStoreSink, RetryExhaustion,
    ScrapeOptions, Scraper, Sink, UndatedPolicy,
};

#[derive(Parser)]
#[command(name = "emploi-scraper")]
#[command(about = "Scrapes emploi-public.ma job offers and upserts them into a document store")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Collection to write to (defaults to the command's collection)
    #[arg(long, global = true)]
    collection: Option<String>,

    /// Also write the scraped offers to this JSON file
    #[arg(long, global = true)]
    output: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = SinkKind::Firestore, global = true)]
    sink: SinkKind,

    /// Store file for the json-store sink
    #[arg(long, default_value = DEFAULT_STORE_FILE, global = true)]
    store_path: PathBuf,

    /// Timeout of each HTTP request
    #[arg(long, default_value_t = 30, global = true)]
    timeout_secs: u64,
}

#[derive(Subcommand)]
enum Commands {
    /// Walk every listing page and keep offers whose deadline has not passed
    All(AllArgs),

    /// Scrape the "Dernière chance pour postuler" section of the listing
    LastChance,
}

#[derive(Args)]
struct AllArgs {
    /// Cutoff date such as "15 Janvier 2026" (defaults to SCRAPE_CUTOFF_DATE, then today)
    #[arg(long)]
    cutoff: Option<String>,

    /// Drop offers whose deadline equals the cutoff
    #[arg(long)]
    strict_cutoff: bool,

    /// Drop offers without a readable deadline
    #[arg(long)]
    drop_undated: bool,

    #[arg(long, default_value_t = 3)]
    max_attempts: u32,

    /// Base delay between retries, multiplied by the attempt number
    #[arg(long, default_value_t = 5)]
    backoff_secs: u64,

    /// Move on to the next page when every attempt timed out, instead of stopping
    #[arg(long)]
    skip_exhausted_pages: bool,

    /// With --skip-exhausted-pages, stop after this many pages in a row were skipped
    #[arg(long, default_value_t = 3)]
    max_consecutive_skips: u32,

    #[arg(long)]
    max_pages: Option<u32>,

    #[arg(long, default_value_t = 2)]
    page_delay_secs: u64,
}

#[derive(Clone, Copy, ValueEnum)]
enum SinkKind {
    Firestore,
    JsonStore,
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    // Loads .env first, so RUST_LOG set there reaches the logger.
    let settings = Settings::from_env()?;
    logger::init();

    let timeout = Duration::from_secs(cli.timeout_secs);

    // Configuration problems must surface before any request is sent.
    let mut sink = build_sink(&cli, &settings, timeout)?;
    let fetcher = HttpFetcher::new(timeout)?;

    let (report, default_collection) = match &cli.command {
        Commands::All(args) => {
            let options = scrape_options(args, &settings)?;
            info!("Keeping offers with a deadline from {} on", options.cutoff);
            (Scraper::new(fetcher, options).scrape_all(), ALL_OFFERS_COLLECTION)
        }
        Commands::LastChance => {
            let options = ScrapeOptions {
                base_url: settings.base_url.clone(),
                listing_url: settings.listing_url.clone(),
                ..Default::default()
            };
            (Scraper::new(fetcher, options).scrape_last_chance(), LAST_CHANCE_COLLECTION)
        }
    };

    let records = report.records;
    info!("Total jobs scraped: {}", records.len());

    if let Some(path) = &cli.output {
        write_snapshot(path, &records)?;
    }

    if records.is_empty() {
        error!("No offers scraped.");
        return Ok(ExitCode::FAILURE);
    }

    let collection = cli.collection.as_deref().unwrap_or(default_collection);
    sink.upsert(&records, collection)
        .with_context(|| format!("Failed to upsert offers into {}", collection))?;

    println!("{}", serde_json::to_string_pretty(&records)?);
    Ok(ExitCode::SUCCESS)
}

fn build_sink(cli: &Cli, settings: &Settings, timeout: Duration) -> Result<Box<dyn Sink>> {
    match cli.sink {
        SinkKind::Firestore => {
            let account = settings.require_service_account()?;
            info!("Writing to Firestore project {}", account.project_id);
            Ok(Box::new(FirestoreSink::new(account, timeout)?))
        }
        SinkKind::JsonStore => {
            let sink = JsonStoreSink::new(&cli.store_path);
            info!("Writing to local store {:?}", sink.path());
            Ok(Box::new(sink))
        }
    }
}

fn scrape_options(args: &AllArgs, settings: &Settings) -> Result<ScrapeOptions> {
    let mut options = ScrapeOptions {
        base_url: settings.base_url.clone(),
        listing_url: settings.listing_url.clone(),
        comparison: if args.strict_cutoff {
            CutoffComparison::Strict
        } else {
            CutoffComparison::Inclusive
        },
        undated: if args.drop_undated {
            UndatedPolicy::Drop
        } else {
            UndatedPolicy::Keep
        },
        max_attempts: args.max_attempts,
        backoff_step: Duration::from_secs(args.backoff_secs),
        on_retry_exhausted: if args.skip_exhausted_pages {
            RetryExhaustion::SkipPage
        } else {
            RetryExhaustion::AbortRun
        },
        max_consecutive_skips: args.max_consecutive_skips,
        page_delay: Duration::from_secs(args.page_delay_secs),
        max_pages: args.max_pages,
        ..Default::default()
    };
    if let Some(cutoff) = settings.cutoff(args.cutoff.as_deref())? {
        options.cutoff = cutoff;
    }
    Ok(options)
}

fn write_snapshot(path: &Path, records: &[JobRecord]) -> Result<()> {
    let json = serde_json::to_string_pretty(records)?;
    fs::write(path, json).with_context(|| format!("Failed to write {:?}", path))?;
    info!("Wrote {} offers to {:?}", records.len(), path);
    Ok(())
}
