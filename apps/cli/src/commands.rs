//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use internscout_core::{
    DateReport, KeywordAnalysis, Orchestrator, ProgressReporter, ProgressStore, RunSummary, Stats,
    export_json,
};
use internscout_crawler::{ChromeFactory, FeedSource, HttpFeed};
use internscout_shared::{AppConfig, ScrapeConfig, init_config, load_config, load_config_from};
use internscout_storage::Storage;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// InternScout — resumable internship crawler and keyword tagger.
#[derive(Parser)]
#[command(
    name = "internscout",
    version,
    about = "Crawl internship postings, extract their descriptions, and tag them with keywords.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file (defaults to ~/.internscout/internscout.toml).
    #[arg(long, global = true, env = "INTERNSCOUT_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Scrape every new posting since the cutoff, resuming from the checkpoint.
    Run {
        /// Number of concurrent workers (browser sessions).
        #[arg(short, long)]
        workers: Option<usize>,

        /// Feed endpoint override.
        #[arg(long)]
        feed_url: Option<String>,

        /// Date cutoff override, as epoch seconds.
        #[arg(long)]
        cutoff: Option<i64>,
    },

    /// Delete the progress checkpoint so the next run starts over.
    Reset,

    /// Show statistics about stored postings.
    Stats {
        /// Show keyword pairs and per-category skill counts instead.
        #[arg(long)]
        keywords: bool,
    },

    /// List stored postings, most recently scraped first.
    List {
        /// Maximum number of postings to show.
        #[arg(short, long)]
        limit: Option<u32>,
    },

    /// Export stored postings as a JSON array.
    Export {
        /// Output file.
        #[arg(short, long, default_value = "internships.json")]
        out: PathBuf,
    },

    /// Fetch the feed and show how posting dates fall around the cutoff.
    CheckDates,

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "internscout=info",
        1 => "internscout=debug",
        _ => "internscout=trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.as_deref();
    match cli.command {
        Command::Run {
            workers,
            feed_url,
            cutoff,
        } => cmd_run(config_path, workers, feed_url, cutoff).await,
        Command::Reset => cmd_reset(config_path),
        Command::Stats { keywords } => cmd_stats(config_path, keywords).await,
        Command::List { limit } => cmd_list(config_path, limit).await,
        Command::Export { out } => cmd_export(config_path, &out).await,
        Command::CheckDates => cmd_check_dates(config_path).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(config_path),
        },
    }
}

fn resolve_config(path: Option<&Path>) -> Result<AppConfig> {
    Ok(match path {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    })
}

async fn open_readonly(config: &AppConfig) -> Result<Storage> {
    let path = Path::new(&config.storage.database_path);
    Storage::open_readonly(path)
        .await
        .map_err(|e| eyre!("{e} (run `internscout run` first)"))
}

// ---------------------------------------------------------------------------
// run / reset
// ---------------------------------------------------------------------------

async fn cmd_run(
    config_path: Option<&Path>,
    workers: Option<usize>,
    feed_url: Option<String>,
    cutoff: Option<i64>,
) -> Result<()> {
    let app = resolve_config(config_path)?;
    let mut scrape = ScrapeConfig::from(&app);
    if let Some(workers) = workers {
        scrape.worker_count = workers;
    }
    if let Some(url) = feed_url {
        scrape.feed_url = url;
    }
    if let Some(cutoff) = cutoff {
        scrape.date_cutoff_timestamp = cutoff;
    }
    scrape.validate()?;

    let storage = Arc::new(Storage::open(Path::new(&app.storage.database_path)).await?);
    let feed = Arc::new(HttpFeed::new(scrape.feed_url.clone(), scrape.feed_timeout)?);
    let factory = ChromeFactory::from_config(&scrape);
    let checkpoint = ProgressStore::new(&app.storage.checkpoint_path);

    info!(
        workers = scrape.worker_count,
        feed = %scrape.feed_url,
        cutoff = scrape.date_cutoff_timestamp,
        "starting scrape"
    );

    let orchestrator = Orchestrator::new(scrape, feed, factory, storage, checkpoint)
        .with_reporter(Arc::new(CliProgress::new()));

    let interrupt = CancellationToken::new();
    tokio::spawn(watch_interrupts(interrupt.clone()));

    let summary = orchestrator.run(&interrupt).await?;
    print_summary(&summary);
    Ok(())
}

/// First Ctrl-C lets in-flight batches finish; the second exits immediately.
async fn watch_interrupts(interrupt: CancellationToken) {
    if tokio::signal::ctrl_c().await.is_err() {
        return;
    }
    eprintln!("\nInterrupt received, finishing in-flight batches. Press Ctrl-C again to quit now.");
    interrupt.cancel();

    if tokio::signal::ctrl_c().await.is_ok() {
        warn!("forced exit, unfinished batches will be retried next run");
        std::process::exit(130);
    }
}

fn print_summary(summary: &RunSummary) {
    println!();
    if summary.interrupted && summary.dispatched == 0 {
        println!("  Run interrupted before any posting was dispatched.");
    } else if summary.interrupted {
        println!("  Run interrupted; in-flight batches were saved.");
    } else {
        println!("  Run complete!");
    }
    println!("  Run ID:            {}", summary.run_id);
    println!("  Fetched:           {}", summary.fetched);
    println!("  Since cutoff:      {}", summary.eligible);
    println!("  Already processed: {}", summary.already_processed);
    println!("  Dispatched:        {}", summary.dispatched);
    println!("  Saved:             {}", summary.persisted);
    println!("  Failed to save:    {}", summary.failed);
    println!("  Not attempted:     {}", summary.unattempted);
    if summary.failed_batches > 0 {
        println!("  Failed batches:    {}", summary.failed_batches);
    }
    println!("  Time:              {:.1}s", summary.elapsed.as_secs_f64());
    println!();
}

fn cmd_reset(config_path: Option<&Path>) -> Result<()> {
    let app = resolve_config(config_path)?;
    let store = ProgressStore::new(&app.storage.checkpoint_path);
    store.reset()?;
    println!("Progress reset: {} removed.", store.path().display());
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn posting_scraped(&self, id: &str, current: usize, total: usize) {
        self.spinner
            .set_message(format!("Scraping [{current}/{total}] {id}"));
    }

    fn batch_completed(&self, worker_id: usize, persisted: usize, failed: usize) {
        self.spinner.println(format!(
            "  worker {worker_id}: saved {persisted}, failed {failed}"
        ));
    }

    fn done(&self, _summary: &RunSummary) {
        self.spinner.finish_and_clear();
    }
}

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

async fn cmd_stats(config_path: Option<&Path>, keywords: bool) -> Result<()> {
    let app = resolve_config(config_path)?;
    let storage = open_readonly(&app).await?;
    let postings = storage.list_postings(None).await?;

    if keywords {
        print_keyword_analysis(&KeywordAnalysis::compute(&postings));
        return Ok(());
    }

    let stats = Stats::compute(&postings);
    let rule = "=".repeat(50);
    println!("\n{rule}\nINTERNSHIP DATABASE STATISTICS\n{rule}");
    println!("\nTotal internships: {}", stats.total);
    if stats.total == 0 {
        println!("No internships in database yet.");
        return Ok(());
    }
    println!(
        "Internships with keywords: {} ({:.1}%)",
        stats.with_keywords,
        stats.keyword_share_percent()
    );

    print_ranked("Top 10 Companies by Number of Positions", &stats.top_companies, "position(s)");
    print_ranked("Top 10 Locations", &stats.top_locations, "position(s)");

    println!("\nSeasons:");
    for (season, count) in &stats.seasons {
        println!("  {season}: {count} position(s)");
    }
    println!("\nSponsorship Status:");
    for (sponsorship, count) in &stats.sponsorships {
        println!("  {sponsorship}: {count} position(s)");
    }

    if !stats.top_keywords.is_empty() {
        print_ranked("Top 20 Keywords", &stats.top_keywords, "occurrences");
    }

    println!("\nMost Recently Scraped:");
    for recent in &stats.recent {
        println!("  - {} - {}", recent.company_name, recent.title);
        if let Some(at) = recent.scraped_at {
            println!("    Scraped at: {}", at.format("%Y-%m-%d %H:%M:%S UTC"));
        }
    }
    Ok(())
}

fn print_ranked(title: &str, entries: &[(String, usize)], unit: &str) {
    println!("\n{title}:");
    for (i, (name, count)) in entries.iter().enumerate() {
        println!("  {}. {name}: {count} {unit}", i + 1);
    }
}

fn print_keyword_analysis(analysis: &KeywordAnalysis) {
    let rule = "=".repeat(50);
    println!("\n{rule}\nKEYWORD COMBINATION ANALYSIS\n{rule}");

    println!("\nTop 15 Keyword Pairs:");
    for (i, ((a, b), count)) in analysis.top_pairs.iter().enumerate() {
        println!("  {}. {a} + {b}: {count} occurrences", i + 1);
    }

    println!("\nSkills by Category:");
    for category in &analysis.categories {
        println!("\n{}:", category.name);
        for (skill, count) in &category.skills {
            println!("  - {skill}: {count}");
        }
    }
}

async fn cmd_list(config_path: Option<&Path>, limit: Option<u32>) -> Result<()> {
    let app = resolve_config(config_path)?;
    let storage = open_readonly(&app).await?;
    let total = storage.count_postings().await?;
    let postings = storage.list_postings(limit).await?;

    println!("\nTotal internships in database: {total}\n");
    for (i, posting) in postings.iter().enumerate() {
        println!("{}. {} - {}", i + 1, posting.company_name, posting.title);
        println!("   Location(s): {}", posting.locations.join(", "));
        println!("   Season: {}", posting.season);
        println!("   Sponsorship: {}", posting.sponsorship);
        println!("   URL: {}", posting.url);
        match &posting.keywords {
            Some(keywords) if !keywords.is_empty() => {
                let shown: Vec<&str> = keywords.iter().take(10).map(String::as_str).collect();
                println!("   Keywords ({}): {}", keywords.len(), shown.join(", "));
                if keywords.len() > 10 {
                    println!("   ... and {} more", keywords.len() - 10);
                }
            }
            _ => println!("   Keywords: None found"),
        }
        if let Some(at) = posting.scraped_at {
            println!("   Scraped at: {}", at.format("%Y-%m-%d %H:%M:%S UTC"));
        }
        println!();
    }
    Ok(())
}

async fn cmd_export(config_path: Option<&Path>, out: &Path) -> Result<()> {
    let app = resolve_config(config_path)?;
    let storage = open_readonly(&app).await?;
    let postings = storage.list_postings(None).await?;

    export_json(&postings, out)?;
    println!("Exported {} internships to {}", postings.len(), out.display());
    Ok(())
}

async fn cmd_check_dates(config_path: Option<&Path>) -> Result<()> {
    let app = resolve_config(config_path)?;
    let scrape = ScrapeConfig::from(&app);
    let feed = HttpFeed::new(scrape.feed_url.clone(), scrape.feed_timeout)?;
    let cutoff = scrape.date_cutoff_timestamp;

    println!("Fetching internships from {}...", scrape.feed_url);
    let postings = feed.fetch_postings().await?;
    let report = DateReport::build(&postings, cutoff);

    println!("Total internships: {}", report.total);
    println!("\nInternships by month/year:");
    for (&(year, month), count) in &report.by_month {
        let label = NaiveDate::from_ymd_opt(year, month, 1)
            .map(|d| d.format("%B %Y").to_string())
            .unwrap_or_else(|| format!("{year}-{month:02}"));
        println!("  {label}: {count}");
    }
    if report.undated > 0 {
        println!("  (no date): {}", report.undated);
    }

    let cutoff_date = chrono::DateTime::from_timestamp(cutoff, 0)
        .map(|d| d.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| cutoff.to_string());
    println!("\nFiltering results:");
    println!("  Cutoff timestamp: {cutoff} ({cutoff_date})");
    println!("  Internships at or after cutoff: {}", report.passing);
    println!("  Percentage kept: {:.1}%", report.passing_percent());

    println!("\nFirst 5 internships that will be processed:");
    for posting in postings
        .iter()
        .filter(|p| p.latest_timestamp() >= cutoff)
        .take(5)
    {
        println!("  {} - {}", posting.company_name, posting.title);
        if let Some(at) = chrono::DateTime::from_timestamp(posting.latest_timestamp(), 0) {
            println!("    Date: {}", at.format("%Y-%m-%d %H:%M:%S"));
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// config
// ---------------------------------------------------------------------------

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(config_path: Option<&Path>) -> Result<()> {
    let config = resolve_config(config_path)?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn run_flags_parse() {
        let cli = Cli::try_parse_from([
            "internscout", "-vv", "run", "--workers", "3", "--cutoff", "1746057600",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Command::Run { workers, cutoff, feed_url } => {
                assert_eq!(workers, Some(3));
                assert_eq!(cutoff, Some(1_746_057_600));
                assert!(feed_url.is_none());
            }
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn export_defaults_output_path() {
        let cli = Cli::try_parse_from(["internscout", "export"]).unwrap();
        match cli.command {
            Command::Export { out } => assert_eq!(out, PathBuf::from("internships.json")),
            _ => panic!("expected export"),
        }
    }
}
