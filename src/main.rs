use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use mimalloc::MiMalloc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use seoscope::client::ScanApiClient;
use seoscope::config::AppConfig;
use seoscope::errors::ScanError;
use seoscope::models::pricing::{RateTable, UserLocation};
use seoscope::models::scan::SERVICE_NAMES;
use seoscope::output::{self, OutputFormat};
use seoscope::poller::{PollConfig, PollDriver, ScanOutcome};
use seoscope::services::cache::FileCache;
use seoscope::services::{pricing, progress};

// M-MIMALLOC-APP: Use mimalloc as global allocator for improved performance.
#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[derive(Parser)]
#[command(name = "seoscope", version, about = "SEO analysis platform client")]
struct Cli {
    /// Report output format.
    #[arg(long, global = true, value_enum, default_value_t = Format::Text)]
    format: Format,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Format {
    Text,
    Json,
}

impl From<Format> for OutputFormat {
    fn from(format: Format) -> Self {
        match format {
            Format::Text => Self::Text,
            Format::Json => Self::Json,
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Submit a scan for a URL and poll it to completion.
    Scan {
        url: String,
        /// Also export the issue list as CSV.
        #[arg(long, value_name = "FILE")]
        csv: Option<PathBuf>,
    },
    /// Poll an existing scan to completion.
    Watch {
        scan_id: String,
        #[arg(long, value_name = "FILE")]
        csv: Option<PathBuf>,
    },
    /// Fetch the current status of a scan once.
    Status { scan_id: String },
    /// Convert a USD price into a display currency.
    Price {
        amount: f64,
        /// Target currency code; defaults to the geolocated one.
        #[arg(long)]
        currency: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "seoscope=info".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = AppConfig::from_env();

    if let Err(err) = run(cli, config).await {
        let message = match err.downcast_ref::<ScanError>() {
            Some(scan_err) => scan_err.user_message(),
            None => err.to_string(),
        };
        eprintln!("{} {message}", "error:".red().bold());
        process::exit(1);
    }
}

async fn run(cli: Cli, config: AppConfig) -> anyhow::Result<()> {
    match cli.command {
        Command::Scan { url, csv } => {
            let client = ScanApiClient::new(&config)?;
            let job = client.start_scan(&url).await?;
            tracing::info!(job_id = %job.id, target = %url, "scan submitted");
            poll_and_report(client, &config, &job.id, cli.format.into(), csv).await
        }
        Command::Watch { scan_id, csv } => {
            let client = ScanApiClient::new(&config)?;
            poll_and_report(client, &config, &scan_id, cli.format.into(), csv).await
        }
        Command::Status { scan_id } => {
            let client = ScanApiClient::new(&config)?;
            let job = client.get_scan(&scan_id).await?;
            let view = progress::project(&job.progress, &SERVICE_NAMES);
            println!("scan {} is {}", job.id, job.status);
            println!("{}", output::render_progress(&view));
            Ok(())
        }
        Command::Price { amount, currency } => {
            anyhow::ensure!(
                amount.is_finite() && amount >= 0.0,
                "amount must be a non-negative number"
            );
            let cache = FileCache::new(config.cache_dir.clone(), config.cache_ttl_hours);
            let currency = match currency {
                Some(code) => code,
                None => detect_currency(&config, &cache).await,
            };
            let rates = load_rates(&config, &cache).await?;
            println!("{}", pricing::display_price(amount, &currency, &rates));
            Ok(())
        }
    }
}

async fn poll_and_report(
    client: ScanApiClient,
    config: &AppConfig,
    job_id: &str,
    format: OutputFormat,
    csv: Option<PathBuf>,
) -> anyhow::Result<()> {
    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c.cancel();
        }
    });

    let driver = PollDriver::new(client, PollConfig::from(config));
    let outcome = driver
        .run(job_id, &cancel, |view| {
            eprintln!("{}", output::render_progress(&view));
        })
        .await?;

    let (job, report) = match outcome {
        ScanOutcome::Completed { job, report } => (job, report),
        ScanOutcome::Partial { job, report } => {
            eprintln!(
                "{}",
                "Some services failed — showing partial results. Re-run the scan for full coverage."
                    .yellow()
            );
            (job, report)
        }
        ScanOutcome::Failed { job, message } => {
            anyhow::bail!("scan {} failed: {message}", job.id);
        }
    };

    println!("{}", output::render_report(&job, &report, format)?);

    if let Some(path) = csv {
        let file = std::fs::File::create(&path)?;
        output::write_issues_csv(&report, file)?;
        tracing::info!(path = %path.display(), "issue list exported");
    }

    Ok(())
}

async fn load_rates(config: &AppConfig, cache: &FileCache) -> anyhow::Result<RateTable> {
    if let Some(rates) = cache.get::<RateTable>("exchange_rates") {
        return Ok(rates);
    }

    let client = ScanApiClient::new(config)?;
    let rates = client.get_exchange_rates().await?;
    cache.put("exchange_rates", &rates);
    Ok(rates)
}

/// Geolocated display currency, cached like the rate table. Any failure
/// falls back to USD so pricing keeps working offline.
async fn detect_currency(config: &AppConfig, cache: &FileCache) -> String {
    if let Some(location) = cache.get::<UserLocation>("user_location") {
        return location.currency;
    }

    let located = match ScanApiClient::new(config) {
        Ok(client) => client.get_location().await,
        Err(err) => Err(err),
    };
    match located {
        Ok(location) => {
            cache.put("user_location", &location);
            location.currency
        }
        Err(err) => {
            tracing::debug!(error = %err, "geolocation unavailable, defaulting to USD");
            "USD".to_string()
        }
    }
}
