use std::path::PathBuf;

use anyhow::Context;
use chrono::NaiveDate;
use clap::Parser;
use rand::SeedableRng;
use rand_pcg::Mcg128Xsl64;
use tracing::info;

use clockodo_scheduler::{
    ApiCredentials, Config, RunMode, SchedulerService, SubmissionClient,
};

/// Clockodo time entry scheduler.
#[derive(Parser)]
#[command(name = "clockodo-scheduler", version, about = "Clockodo time entry scheduler")]
struct Cli {
    /// Configuration file path
    #[arg(long, default_value = "config.json")]
    config: PathBuf,

    /// Preview mode without API calls
    #[arg(long)]
    dry_run: bool,

    /// Override the configured start date (YYYY-MM-DD)
    #[arg(long)]
    start_date: Option<NaiveDate>,

    /// Override the configured end date (YYYY-MM-DD)
    #[arg(long)]
    end_date: Option<NaiveDate>,

    /// Fix the random seed for reproducible runs
    #[arg(long)]
    seed: Option<u64>,

    /// Verify the API credentials and exit
    #[arg(long)]
    check: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: tracing::Level,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(cli.log_level)
        .init();

    if let Err(e) = run(cli).await {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = Config::load(&cli.config)?;

    if let Some(start_date) = cli.start_date {
        config.start_date = start_date;
    }
    if let Some(end_date) = cli.end_date {
        config.end_date = end_date;
    }
    config.validate()?;

    if cli.check {
        let client = SubmissionClient::new(&credentials_from_env()?, &config.external_app)?;
        client.verify_credentials().await?;
        return Ok(());
    }

    let mode = if cli.dry_run {
        RunMode::DryRun
    } else {
        let client = SubmissionClient::new(&credentials_from_env()?, &config.external_app)?;
        RunMode::Live(client)
    };

    let mut rng = match cli.seed {
        Some(seed) => {
            info!("Using fixed random seed {}", seed);
            Mcg128Xsl64::seed_from_u64(seed)
        }
        None => Mcg128Xsl64::from_entropy(),
    };

    // Holiday lookup is an external collaborator; none is wired in, so
    // only weekends and excluded_dates filter the range.
    let service = SchedulerService::new(config, mode);
    service.run(&mut rng, |_| false).await?;

    Ok(())
}

fn credentials_from_env() -> anyhow::Result<ApiCredentials> {
    let user = std::env::var("CLOCKODO_API_USER")
        .context("CLOCKODO_API_USER is not set; API credentials are required for live runs")?;
    let key = std::env::var("CLOCKODO_API_KEY")
        .context("CLOCKODO_API_KEY is not set; API credentials are required for live runs")?;

    Ok(ApiCredentials { user, key })
}
