use anyhow::{Context, Result};
use chrono::{Datelike, SecondsFormat, Utc};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use harvester::cli::{Cli, Commands};
use harvester::config::Config;
use harvester::domain::window::parse_date;
use harvester::domain::{TimestampNormalizer, Window};
use harvester::services::{CursorController, HarvestService};
use harvester::sources::{BarchartClient, BarchartStoryParser};
use harvester::storage::{ArtifactStore, JsonArtifactStore};

fn main() {
    init_tracing();

    if let Err(e) = run() {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::from_env().context("Failed to load configuration")?;

    match cli.command {
        Commands::Fetch {
            section,
            date,
            limit,
            max_iterations,
            delay_ms,
            output_dir,
            dry_run,
        } => {
            if let Some(section) = section {
                config.section = section;
            }
            if let Some(limit) = limit {
                config.count_limit = limit;
            }
            if let Some(max_iterations) = max_iterations {
                config.max_iterations = max_iterations;
            }
            if let Some(delay_ms) = delay_ms {
                config.delay_ms = delay_ms;
            }
            if let Some(output_dir) = output_dir {
                config.output_dir = output_dir;
            }
            cmd_fetch(&config, date.as_deref(), dry_run)
        }
        Commands::Window { date } => cmd_window(&config, &date),
        Commands::ParseTime { text, year } => cmd_parse_time(&config, &text, year),
    }
}

fn cmd_fetch(config: &Config, date: Option<&str>, dry_run: bool) -> Result<()> {
    let target_date = date.map(parse_date).transpose()?;
    let harvest_config = config.harvest_config(target_date)?;
    let offset = harvest_config.feed_offset;

    let client = BarchartClient::new(&config.section).context("Failed to build HTTP client")?;
    // One client for both roles so the session cookies carry over to page requests
    let service = HarvestService::new(&client, &client, BarchartStoryParser::new(), harvest_config);

    if dry_run {
        eprintln!("Dry run mode - the artifact will be printed, not written\n");
    }

    let outcome = service
        .harvest()
        .with_context(|| format!("Harvest of section '{}' failed", config.section))?;

    // Unbounded runs are filed under today's date in the feed's offset
    let artifact_date =
        target_date.unwrap_or_else(|| Utc::now().with_timezone(&offset).date_naive());

    if dry_run {
        println!("{}", JsonArtifactStore::render(&outcome.records)?);
        eprintln!(
            "{} records from {} pages ({})",
            outcome.records.len(),
            outcome.pages_fetched,
            outcome.reason
        );
        return Ok(());
    }

    let store = JsonArtifactStore::new(&config.output_dir);
    let saved = store
        .save(artifact_date, &config.section, &outcome.records)
        .context("Failed to write artifact")?;

    println!("Harvest complete: {}", outcome.reason);
    println!("  Records: {}", outcome.records.len());
    println!("  Pages:   {}", outcome.pages_fetched);
    match saved {
        Some(path) => println!("  Output:  {}", path.display()),
        None => println!("  Output:  none (no news items were fetched)"),
    }

    if !outcome.reason.is_success() {
        info!(reason = %outcome.reason, "Partial results were saved");
    }

    Ok(())
}

fn cmd_window(config: &Config, date: &str) -> Result<()> {
    let window = Window::parse_day(date, config.feed_offset()?)?;
    let cursor = CursorController::initialize(Some(&window), Utc::now()).current();

    println!("Start:  {}", window.start.to_rfc3339_opts(SecondsFormat::Secs, true));
    println!("End:    {}", window.end.to_rfc3339_opts(SecondsFormat::Micros, true));
    println!("Cursor: {}", cursor);

    Ok(())
}

fn cmd_parse_time(config: &Config, text: &str, year: Option<i32>) -> Result<()> {
    let offset = config.feed_offset()?;
    let reference_year = year.unwrap_or_else(|| Utc::now().with_timezone(&offset).year());

    let instant = TimestampNormalizer::new(offset).normalize(text, reference_year)?;

    println!("{}", instant.to_rfc3339_opts(SecondsFormat::Secs, true));
    println!("{}", instant.timestamp());

    Ok(())
}
