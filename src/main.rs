//! campus-fetch
//!
//! Command-line front end for the resource client.
//!
//! ```text
//!   fetch <PATH> ──▶ N concurrent callers ──▶ ResourceClient ──▶ HttpResource ──▶ backend
//!                          │                   (single-flight,
//!                          │                    timeout, retry)
//!                          ▼
//!                    QueryTracker (tick) ──▶ "slow" hint, final presentation state
//! ```

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::{Parser, Subcommand};
use serde_json::Value;
use tokio::task::JoinSet;

use campus_fetch::client::snapshot_from_outcome;
use campus_fetch::config::validation::validate_config;
use campus_fetch::config::{load_config, ClientConfig, ConfigError};
use campus_fetch::observability::{logging, metrics};
use campus_fetch::query::{PresentationState, QuerySnapshot, QueryTracker};
use campus_fetch::remote::{HttpResource, RemoteError, RemoteResource, ResourceRequest};
use campus_fetch::ResourceClient;

#[derive(Parser)]
#[command(name = "campus-fetch")]
#[command(about = "Resilient reads from the school records backend", long_about = None)]
struct Cli {
    /// TOML configuration file (defaults apply when omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch a resource and print its presentation state and data
    Fetch {
        /// Resource path relative to the backend base URL, e.g. `students`
        path: String,

        /// Query parameter as key=value (repeatable)
        #[arg(short, long = "query", value_parser = parse_query_param)]
        query: Vec<(String, String)>,

        /// Number of identical concurrent callers
        #[arg(long, default_value_t = 1)]
        concurrency: usize,

        /// Tracker polling interval in milliseconds
        #[arg(long, default_value_t = 250)]
        tick_ms: u64,
    },
    /// Validate the configuration and print the effective settings
    CheckConfig,
}

fn parse_query_param(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected key=value, got '{raw}'"))
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match read_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };

    logging::init_logging(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "campus-fetch starting");

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let result = match cli.command {
        Commands::Fetch {
            path,
            query,
            concurrency,
            tick_ms,
        } => run_fetch(&config, &path, query, concurrency, tick_ms).await,
        Commands::CheckConfig => check_config(&config),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = %e, "Command failed");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn read_config(path: Option<&std::path::Path>) -> Result<ClientConfig, ConfigError> {
    match path {
        Some(path) => load_config(path),
        None => Ok(ClientConfig::default()),
    }
}

fn check_config(config: &ClientConfig) -> Result<ExitCode, Box<dyn std::error::Error>> {
    validate_config(config).map_err(ConfigError::Validation)?;
    print!("{}", toml::to_string_pretty(config)?);
    Ok(ExitCode::SUCCESS)
}

async fn run_fetch(
    config: &ClientConfig,
    path: &str,
    query: Vec<(String, String)>,
    concurrency: usize,
    tick_ms: u64,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let resource: Arc<dyn RemoteResource> = Arc::new(HttpResource::new(&config.backend)?);
    let request = query
        .iter()
        .fold(ResourceRequest::new(path)?, |request, (k, v)| request.with_param(k, v));

    tracing::info!(
        base_url = %config.backend.base_url,
        key = %request.flight_key(),
        concurrency,
        "Dispatching fetch"
    );

    let client: ResourceClient<Value, RemoteError> = ResourceClient::from_config(config);
    let mut callers = JoinSet::new();
    for _ in 0..concurrency.max(1) {
        let client = client.clone();
        let resource = resource.clone();
        let request = request.clone();
        callers.spawn(async move { client.fetch_resource(resource, request).await });
    }

    let condition = config.query.empty_condition;
    let mut tracker = QueryTracker::new(config.query.soft_timeout());
    let mut ticker = tokio::time::interval(Duration::from_millis(tick_ms.max(1)));
    let mut hinted = false;
    let mut settled = None;

    while !callers.is_empty() {
        tokio::select! {
            Some(joined) = callers.join_next() => {
                let result = joined.map_err(|e| RemoteError::Transport(format!("caller failed: {e}")));
                settled.get_or_insert(result);
            }
            _ = ticker.tick() => {
                let view = tracker.observe(
                    &QuerySnapshot::<Value, RemoteError>::pending(),
                    &condition,
                    Instant::now(),
                );
                if view.show_slow_hint() && !hinted {
                    eprintln!("This is taking longer than expected...");
                    hinted = true;
                }
            }
        }
    }

    let snapshot = match settled {
        Some(Ok(result)) => snapshot_from_outcome(result),
        Some(Err(e)) => QuerySnapshot::failed(e),
        None => QuerySnapshot::pending(),
    };
    let view = tracker.observe(&snapshot, &condition, Instant::now());
    println!("state: {}", view.state);

    match view.state {
        PresentationState::Success | PresentationState::Empty => {
            let data = snapshot.data.unwrap_or(Value::Null);
            println!("{}", serde_json::to_string_pretty(&data)?);
            Ok(ExitCode::SUCCESS)
        }
        PresentationState::Error => {
            if let Some(err) = &snapshot.error {
                eprintln!("Error: {err}");
                if err.is_transient() {
                    eprintln!("The backend may be temporarily unavailable; try again shortly.");
                }
            }
            Ok(ExitCode::FAILURE)
        }
        PresentationState::Loading => Ok(ExitCode::FAILURE),
    }
}
