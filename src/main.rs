use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;

use proxier::config::{load_config, load_config_from, load_env_file, ConfigError, ProxierConfig};
use proxier::lifecycle::signals;
use proxier::observability::{logging, metrics};
use proxier::{ProxierError, ProxyServer, ServerError};

/// Proxier - path-prefix reverse proxy
#[derive(Parser, Debug)]
#[command(name = "Proxier")]
#[command(version = concat!("v", env!("CARGO_PKG_VERSION")), about, long_about = None)]
struct Cli {
    /// Configuration file path. Without it, `proxier.toml` is used when
    /// present, otherwise the environment alone configures the proxy
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Dotenv file exported into the environment before loading
    #[arg(short, long, default_value = ".env")]
    env: PathBuf,

    /// Validate the configuration and exit
    #[arg(short = 't', long = "test")]
    test: bool,
}

enum Outcome {
    Signal(&'static str),
    Failed(ServerError),
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("proxier: {e}");
            ExitCode::FAILURE
        }
    }
}

const DEFAULT_CONFIG: &str = "proxier.toml";

async fn run(cli: Cli) -> Result<(), ProxierError> {
    let env_loaded = match load_env_file(&cli.env) {
        Ok(()) => true,
        Err(e) if e.is_missing_env_file() => false,
        Err(e) => return Err(e.into()),
    };

    let source = cli.config.or_else(|| {
        let default = PathBuf::from(DEFAULT_CONFIG);
        default.exists().then_some(default)
    });
    let config = load(source.as_deref())?;
    let source_name = source
        .as_deref()
        .map_or_else(|| "environment".to_string(), |p| p.display().to_string());

    if cli.test {
        println!(
            "configuration {source_name} is valid ({} routes)",
            config.proxy.len()
        );
        return Ok(());
    }

    logging::init(&config.observability);
    if !env_loaded {
        tracing::debug!(path = %cli.env.display(), "No env file loaded");
    }
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %source_name,
        "Proxier starting"
    );

    if config.observability.metrics_enabled {
        let address = &config.observability.metrics_address;
        let addr: SocketAddr = address
            .parse()
            .map_err(|_| ProxierError::MetricsAddress(address.clone()))?;
        metrics::init_metrics(addr)?;
    }

    let mut server = ProxyServer::new(&config, tracing::info_span!("proxier"))?;
    server.start();
    if let Some(addr) = server.local_addr() {
        tracing::info!(engine = %server.kind(), address = %addr, "Proxier ready");
    }

    let outcome = tokio::select! {
        signal = signals::termination() => Outcome::Signal(signal),
        Some(err) = server.notify().recv() => Outcome::Failed(err),
    };

    let deadline = Duration::from_secs(config.timeouts.shutdown_secs);
    match outcome {
        Outcome::Signal(signal) => {
            tracing::info!(signal, "Shutdown signal received");
            server.stop(deadline).await;
            tracing::info!("Shutdown complete");
            Ok(())
        }
        Outcome::Failed(err) => {
            tracing::error!(error = %err, "Server failed");
            server.stop(deadline).await;
            Err(err.into())
        }
    }
}

fn load(path: Option<&Path>) -> Result<ProxierConfig, ConfigError> {
    match path {
        Some(path) => load_config(path),
        None => load_config_from(None, |var| std::env::var(var).ok()),
    }
}
