//! etagcheck - ETag consistency check for HTTP server fleets
//!
//! Requests one URL through every server of a fleet and verifies that all
//! of them return the same ETag, reporting the result as a Nagios plugin.
//!
//! Exit codes:
//!   0 - OK (every server returned the same ETag)
//!   1 - WARNING (some or all servers returned no ETag)
//!   2 - CRITICAL (servers disagree on the ETag)
//!   3 - UNKNOWN (invalid arguments or configuration)

mod analysis;
mod cli;
mod config;
mod models;
mod probe;
mod report;

use analysis::EtagPartition;
use anyhow::{Context, Result};
use cli::{Args, OutputFormat};
use config::{Config, DEFAULT_CONFIG_FILE};
use models::{parse_hosts, Status, Verdict};
use report::Report;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        println!("{}", report::status_line(&Verdict::new(Status::Unknown, e)));
        std::process::exit(Status::Unknown.exit_code());
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Config is needed before logging starts: it can raise the log level
    let (config, default_config_error) = match load_config(&args) {
        Ok(loaded) => loaded,
        Err(e) => {
            let (status, output) = conclude(Err(e));
            println!("{}", output);
            std::process::exit(status.exit_code());
        }
    };

    init_logging(config.log_level(&args));

    info!("etagcheck v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);
    if let Some(e) = default_config_error {
        warn!("Failed to load {}, using defaults: {:#}", DEFAULT_CONFIG_FILE, e);
    }

    let (status, output) = conclude(run_check(&args, config).await);

    println!("{}", output);
    std::process::exit(status.exit_code());
}

/// Render a finished check, or turn any failure into an UNKNOWN status line.
fn conclude(outcome: Result<(Report, OutputFormat)>) -> (Status, String) {
    let rendered = outcome.and_then(|(report, format)| {
        let output = render(&report, format)?;
        Ok((report.status, output))
    });

    match rendered {
        Ok(done) => done,
        Err(e) => {
            error!("Check failed: {:#}", e);
            let verdict = Verdict::new(Status::Unknown, format!("{:#}", e));
            (verdict.status, report::status_line(&verdict))
        }
    }
}

/// Handle --init-config: generate a default .etagcheck.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(DEFAULT_CONFIG_FILE);

    if path.exists() {
        eprintln!("{} already exists. Remove it first or edit it manually.", DEFAULT_CONFIG_FILE);
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", DEFAULT_CONFIG_FILE))?;

    println!("Created {} with default settings.", DEFAULT_CONFIG_FILE);
    Ok(())
}

/// Initialize logging based on verbosity settings.
///
/// Logs go to stderr so stdout only carries the status line.
fn init_logging(level: tracing::Level) {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

/// Probe the fleet and analyze the collected ETags.
async fn run_check(args: &Args, config: Config) -> Result<(Report, OutputFormat)> {
    info!("Probe settings: {:?}", config.probe);
    config
        .probe
        .validate()
        .context("Invalid probe configuration")?;

    let hosts = parse_hosts(args.servers());
    let fetch_config = probe::FetchConfig::from(&config.probe);

    info!(
        hosts = hosts.len(),
        concurrency = probe::effective_workers(fetch_config.concurrency, hosts.len()),
        timeout = fetch_config.timeout_seconds,
        url = %fetch_config.url,
        "Probing fleet"
    );

    let start_time = Instant::now();
    let results = probe::fetch(&hosts, &fetch_config).await;
    let duration = start_time.elapsed().as_secs_f64();

    let partition = EtagPartition::from_results(&results);
    info!(
        distinct = partition.groups.len(),
        failed = partition.failed_hosts.len(),
        "Collected {} results in {:.2}s",
        results.len(),
        duration
    );

    let report = Report::new(partition, &fetch_config.url, hosts.len(), duration);
    Ok((report, config.general.format))
}

fn render(report: &Report, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Text => Ok(report::status_line(&report.verdict())),
        OutputFormat::Json => report::generate_json_report(report),
    }
}

/// Load configuration from file or use defaults, merged with CLI arguments.
///
/// Runs before logging is set up, so a broken default file is handed back
/// for the caller to report instead of being logged here.
fn load_config(args: &Args) -> Result<(Config, Option<anyhow::Error>)> {
    let (mut config, default_error) = match args.config {
        // Explicit config path must load
        Some(ref config_path) => (Config::load(config_path)?, None),
        None => match Config::load_default() {
            Ok(found) => (found.unwrap_or_default(), None),
            Err(e) => (Config::default(), Some(e)),
        },
    };

    config.merge_with_args(args);
    Ok((config, default_error))
}
