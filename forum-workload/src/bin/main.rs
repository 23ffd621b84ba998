use anyhow::{Context, Result};
use clap::Parser;
use forum_workload::constants::*;
use forum_workload::{load_test, ApiClient, AuthPolicy, Credentials, WorkloadOptions};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use surge::{RunError, RunReport};
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

const DEFAULT_LOG_FILTER: &str = "surge=info,forum_workload=info";

#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// Base URL of the API under test.
    #[arg(long, default_value = DEFAULT_BASE_URL)]
    base_url: String,

    #[arg(long, env = USER_SUFFIX_ENV, default_value = DEFAULT_USER_SUFFIX)]
    user_suffix: String,

    /// JSON file overriding scenarios, thresholds and auth policy.
    #[arg(long)]
    options: Option<PathBuf>,

    /// Multiply every VU count, e.g. 0.01 for a local smoke run.
    #[arg(long, default_value_t = 1.0)]
    vus_scale: f64,

    /// Multiply every arrival rate.
    #[arg(long, default_value_t = 1.0)]
    rate_scale: f64,

    /// Provision this many accounts and spread likes across their sessions.
    #[arg(long)]
    auth_pool: Option<usize>,

    /// Serve Prometheus metrics on this address while the run is in progress.
    #[arg(long)]
    metrics_addr: Option<SocketAddr>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    FmtSubscriber::builder().with_env_filter(filter).init();

    match run(Cli::parse()).await {
        Ok(report) => {
            println!("{report}");
            if report.passed() {
                ExitCode::SUCCESS
            } else {
                error!("One or more thresholds failed");
                ExitCode::from(EXIT_THRESHOLDS_FAILED)
            }
        }
        Err(err) => {
            error!("{err:#}");
            match err.downcast_ref::<RunError>() {
                Some(RunError::Setup(_)) => ExitCode::from(EXIT_SETUP_FAILED),
                _ => ExitCode::FAILURE,
            }
        }
    }
}

async fn run(cli: Cli) -> Result<RunReport> {
    let mut options = match &cli.options {
        Some(path) => WorkloadOptions::from_file(path)
            .with_context(|| format!("loading options from {}", path.display()))?,
        None => WorkloadOptions::default(),
    };
    if cli.vus_scale != 1.0 {
        options.scale_vus(cli.vus_scale);
    }
    if cli.rate_scale != 1.0 {
        options.scale_rates(cli.rate_scale);
    }
    if let Some(size) = cli.auth_pool {
        options.auth = AuthPolicy::AccountPool { size };
    }

    if let Some(addr) = cli.metrics_addr {
        PrometheusBuilder::new()
            .with_http_listener(addr)
            .install()
            .context("installing Prometheus exporter")?;
        info!("Serving metrics on {addr}");
    }

    let client = ApiClient::new(&cli.base_url)?;
    let credentials = Credentials::for_suffix(&cli.user_suffix);
    info!(
        "Running {} scenarios against {} as '{}'",
        options.scenarios.len(),
        client.base_url(),
        credentials.username
    );

    let report = load_test(client, credentials, &options)?.run().await?;
    Ok(report)
}
