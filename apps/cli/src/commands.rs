//! CLI command definitions, routing, and tracing setup.

use std::time::Duration;

use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use color_eyre::eyre::Result;
use cheongyak_core::{
    Comparison, Pipeline, PipelineOutcome, ProgressReporter, render_text, schedule_events,
};
use cheongyak_shared::{AppConfig, init_config, load_config, service_key};
use cheongyak_trades::TradeAverage;
use indicatif::{ProgressBar, ProgressStyle};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// Cheongyak: apartment-subscription announcement reports.
#[derive(Parser)]
#[command(
    name = "cheongyak",
    version,
    about = "Collect apartment-subscription announcements and compare listed prices with nearby deals.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Abort the whole run after this many seconds.
    #[arg(long, global = true)]
    pub timeout_secs: Option<u64>,

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
    /// List recent announcements for a region.
    Listings {
        /// Region name as the listing API spells it (e.g. 서울, 경기).
        region: String,

        /// Reference date (YYYY-MM-DD). Defaults to today.
        #[arg(long)]
        today: Option<NaiveDate>,
    },

    /// Build full reports for every recent announcement in a region.
    Report {
        /// Region name as the listing API spells it.
        region: String,

        /// Print the Korean text report instead of JSON records.
        #[arg(long)]
        text: bool,

        /// Reference date (YYYY-MM-DD). Defaults to today.
        #[arg(long)]
        today: Option<NaiveDate>,
    },

    /// Average recent transaction price per pyeong for a sub-district.
    Trades {
        /// Five-digit legal-district code (LAWD_CD).
        #[arg(long)]
        code: String,

        /// Sub-district (읍면동) name.
        #[arg(long)]
        dong: String,

        /// Reference date (YYYY-MM-DD). Defaults to today.
        #[arg(long)]
        today: Option<NaiveDate>,
    },

    /// Print calendar events for recent announcements as JSON.
    Schedule {
        /// Region name as the listing API spells it.
        region: String,

        /// Reference date (YYYY-MM-DD). Defaults to today.
        #[arg(long)]
        today: Option<NaiveDate>,
    },

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

/// Initialize tracing based on CLI flags. Logs go to stderr; stdout carries results.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "cheongyak=info",
        1 => "cheongyak=debug",
        _ => "cheongyak=trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let cancel = cancellation(cli.timeout_secs);
    match cli.command {
        Command::Listings { region, today } => cmd_listings(&region, today, &cancel).await,
        Command::Report {
            region,
            text,
            today,
        } => cmd_report(&region, text, today, &cancel).await,
        Command::Trades { code, dong, today } => cmd_trades(&code, &dong, today, &cancel).await,
        Command::Schedule { region, today } => cmd_schedule(&region, today, &cancel).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
    }
}

/// Token cancelled on Ctrl-C or once the optional deadline passes.
fn cancellation(timeout_secs: Option<u64>) -> CancellationToken {
    let token = CancellationToken::new();

    let on_signal = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted, cancelling");
            on_signal.cancel();
        }
    });

    if let Some(secs) = timeout_secs {
        let on_deadline = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(secs)).await;
            warn!(timeout_secs = secs, "deadline reached, cancelling");
            on_deadline.cancel();
        });
    }

    token
}

fn pipeline() -> Result<(AppConfig, Pipeline)> {
    let config = load_config()?;
    let key = service_key(&config)?;
    let pipeline = Pipeline::new(&config, &key)?;
    Ok((config, pipeline))
}

fn today_or_now(today: Option<NaiveDate>) -> NaiveDate {
    today.unwrap_or_else(|| Local::now().date_naive())
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_listings(region: &str, today: Option<NaiveDate>, cancel: &CancellationToken) -> Result<()> {
    let (_, pipeline) = pipeline()?;
    let today = today_or_now(today);
    info!(region, %today, "fetching listings");

    let fetched = pipeline.listings().fetch(region, today, cancel).await?;
    if fetched.malformed > 0 {
        warn!(count = fetched.malformed, "unreadable listings dropped");
    }
    println!("{}", serde_json::to_string_pretty(&fetched.listings)?);
    Ok(())
}

async fn cmd_report(
    region: &str,
    text: bool,
    today: Option<NaiveDate>,
    cancel: &CancellationToken,
) -> Result<()> {
    let (_, pipeline) = pipeline()?;
    let today = today_or_now(today);
    info!(region, %today, "building reports");

    let reporter = CliProgress::new();
    let outcome = pipeline.run(region, today, cancel, &reporter).await?;

    if text {
        let generated_at = Local::now().naive_local();
        let rendered: Vec<String> = outcome
            .reports
            .iter()
            .map(|r| render_text(r, generated_at))
            .collect();
        println!("{}", rendered.join("\n\n"));
    } else {
        let records = outcome
            .reports
            .iter()
            .map(|r| r.to_record())
            .collect::<std::result::Result<Vec<_>, _>>()?;
        println!("{}", serde_json::to_string_pretty(&records)?);
    }

    print_summary(&outcome);
    Ok(())
}

async fn cmd_trades(
    code: &str,
    dong: &str,
    today: Option<NaiveDate>,
    cancel: &CancellationToken,
) -> Result<()> {
    let (_, pipeline) = pipeline()?;
    let today = today_or_now(today);
    info!(code, dong, %today, "looking up transactions");

    let average = pipeline.trades().average_price(code, dong, today, cancel).await?;
    match &average {
        TradeAverage::Available(avg) => {
            eprintln!(
                "  {} ({}): {:.2} 만원/평, {} deals, {} skipped, months {}",
                avg.sub_district,
                avg.region_code,
                avg.average,
                avg.sample_count,
                avg.skipped,
                avg.months.join(",")
            );
        }
        TradeAverage::NoData { months, skipped } => {
            eprintln!(
                "  no deals in {dong} for months {} ({skipped} skipped)",
                months.join(",")
            );
        }
    }
    println!("{}", serde_json::to_string_pretty(&Comparison::from(average))?);
    Ok(())
}

async fn cmd_schedule(region: &str, today: Option<NaiveDate>, cancel: &CancellationToken) -> Result<()> {
    let (_, pipeline) = pipeline()?;
    let today = today_or_now(today);

    let fetched = pipeline.listings().fetch(region, today, cancel).await?;
    let events: Vec<_> = fetched.listings.iter().flat_map(schedule_events).collect();
    info!(listings = fetched.listings.len(), events = events.len(), "schedule built");
    println!("{}", serde_json::to_string_pretty(&events)?);
    Ok(())
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

fn print_summary(outcome: &PipelineOutcome) {
    eprintln!();
    eprintln!("  Region:    {}", outcome.region);
    eprintln!("  Date:      {}", outcome.today);
    eprintln!("  Reports:   {}", outcome.reports.len());
    eprintln!("  Skipped:   {}", outcome.skipped.len());
    eprintln!("  Malformed: {}", outcome.malformed_listings);
    eprintln!("  Time:      {:.1}s", outcome.elapsed.as_secs_f64());
    for item in &outcome.skipped {
        eprintln!("    - {} ({}): {}", item.complex_name, item.url, item.error);
    }
    eprintln!();
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
        if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
            spinner.set_style(
                style.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
            );
        }
        spinner.enable_steady_tick(Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn listing_done(&self, complex_name: &str, current: usize, total: usize) {
        self.spinner
            .set_message(format!("Comparing [{current}/{total}] {complex_name}"));
    }

    fn done(&self, _outcome: &PipelineOutcome) {
        self.spinner.finish_and_clear();
    }
}

