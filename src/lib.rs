pub mod metrics;
pub mod probe;
pub mod scenario;

use anyhow::{Context, Result};
use clap::Parser;
use std::process::ExitCode;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{filter::LevelFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::metrics::setup_metrics_recorder;
use crate::probe::{build_client, EndpointProbe};
use crate::scenario::{default_scenarios, run_scenarios};

pub const DEFAULT_BASE_URL: &str = "http://localhost:8888";
pub const DEFAULT_RESOURCE_PATH: &str = "/oglive/list";
pub const DEFAULT_AUTHORIZATION: &str = "07b3bfe728954619b58f0107ad73acc1";
/// Upper bound for `--repeat`.
pub const MAX_REPEAT: i64 = 10_000;

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
pub struct Cli {
    #[clap(long, env, default_value = DEFAULT_BASE_URL, value_parser = normalize_base_url)]
    pub base_url: String,
    #[clap(long, env, default_value = DEFAULT_RESOURCE_PATH)]
    pub resource_path: String,
    /// Sent verbatim as the `Authorization` header
    #[clap(long, env, default_value = DEFAULT_AUTHORIZATION)]
    pub authorization: String,
    /// Number of times each scenario is probed
    #[clap(long, env, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..=MAX_REPEAT))]
    pub repeat: u32,
    /// Request timeout; the HTTP client default applies when unset
    #[clap(long, env)]
    pub timeout_secs: Option<u64>,
    /// Also send an unauthenticated GET and log its status without asserting on it
    #[clap(long, env, default_value_t = false)]
    pub observe_unauthenticated: bool,
    /// Print Prometheus metrics for the run to stdout
    #[clap(long, env, default_value_t = false)]
    pub metrics: bool,
    /// Print the report as JSON to stdout
    #[clap(long, env, default_value_t = false)]
    pub json: bool,
    #[clap(long, env, default_value = "info")]
    log_level: LevelFilter,
}

impl Cli {
    /// Full URL of the probed resource.
    pub fn url(&self) -> String {
        if self.resource_path.starts_with('/') {
            format!("{}{}", self.base_url, self.resource_path)
        } else {
            format!("{}/{}", self.base_url, self.resource_path)
        }
    }
}

#[allow(clippy::unnecessary_wraps)]
fn normalize_base_url(val: &str) -> Result<String, String> {
    let trimmed = val.trim_end_matches('/');
    Ok(trimmed.to_string())
}

/// Probes the configured resource and returns the process exit code.
///
/// # Errors
///
/// Returns an error if the URL is invalid, the HTTP client cannot be built,
/// the metrics recorder cannot be installed or the report cannot be
/// serialized. Probe failures are not errors; they show up in the exit code.
pub async fn run(cli: Cli) -> Result<ExitCode> {
    tracing_subscriber::registry()
        .with(cli.log_level)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let metrics_handle = if cli.metrics {
        Some(setup_metrics_recorder()?)
    } else {
        None
    };

    let client = build_client(cli.timeout_secs.map(Duration::from_secs))?;
    let probe = EndpointProbe::with_client(client, &cli.url(), cli.authorization.clone())?;

    info!(url = %probe.url(), repeat = cli.repeat, "Probing endpoint");

    if cli.observe_unauthenticated {
        match probe.probe_unauthenticated().await {
            Ok(status) => info!(
                status = status.as_u16(),
                "Request without Authorization header answered"
            ),
            Err(e) => warn!(error = ?e, "Request without Authorization header failed"),
        }
    }

    let report = run_scenarios(&probe, &default_scenarios(), cli.repeat).await;

    info!(
        passed = report.passed(),
        failed = report.failed(),
        errored = report.errored(),
        "Probe run finished"
    );

    if cli.json {
        let json = serde_json::to_string_pretty(&report.summary())
            .context("serializing report failed")?;
        println!("{json}");
    }

    if let Some(handle) = metrics_handle {
        print!("{}", handle.render());
    }

    Ok(ExitCode::from(report.exit_code()))
}
