use anyhow::Context;
use bitcoin_rpc_client::shared::logging::{LogFormat, LoggingUtils};
use bitcoin_rpc_client::{
    AppConfig, CompositeObserver, MetricsObserver, RpcClient, RpcClientError, RpcResult,
    TracingObserver,
};
use clap::{Parser, Subcommand};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "bitcoin-rpc")]
#[command(about = "Secure JSON-RPC client for Bitcoin Core", long_about = None)]
struct Cli {
    #[arg(short, long, global = true, help = "Path to the configuration file")]
    config: Option<PathBuf>,
    #[arg(
        long,
        global = true,
        help = "Directory holding Docker secrets",
        default_value = "/run/secrets"
    )]
    secrets_dir: PathBuf,
    #[arg(short, long, global = true, help = "Override the configured log level")]
    log_level: Option<String>,
    #[arg(long, global = true, help = "Print call metrics to stderr when done")]
    metrics: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Call an RPC method with positional parameters
    Call {
        #[arg(help = "RPC method name, e.g. getblockcount")]
        method: String,
        #[arg(help = "Parameters; each is parsed as JSON, otherwise sent as a string")]
        params: Vec<String>,
    },
    /// Check that the node answers
    TestConnection,
    /// Show chain and network summary
    NodeInfo,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(output) => println!("{}", output),
        Err(e) => {
            let payload = match e.downcast_ref::<RpcClientError>() {
                Some(rpc_error) => rpc_error.to_json(),
                None => serde_json::json!({
                    "kind": "configuration",
                    "message": format!("{:#}", e)
                }),
            };
            error!("{:#}", e);
            let rendered =
                serde_json::to_string_pretty(&payload).unwrap_or_else(|_| payload.to_string());
            println!("{}", rendered);
            std::process::exit(1);
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<String> {
    let mut config = AppConfig::load(cli.config.as_deref(), Some(&cli.secrets_dir))?;
    apply_log_level(&mut config, cli.log_level)?;

    let format = LogFormat::parse(&config.logging.format)?;
    LoggingUtils::initialize(&config.logging.level, format)?;
    info!(config = %config.safe_summary(), "Starting Bitcoin RPC client");

    let metrics = Arc::new(MetricsObserver::new().context("Failed to create metrics registry")?);
    let observer = CompositeObserver::new()
        .with(Arc::new(TracingObserver))
        .with(metrics.clone());

    let client = RpcClient::from_app_config(&config, Arc::new(observer))?;

    let result: anyhow::Result<Value> = match cli.command {
        Commands::Call { method, params } => {
            let params = params.iter().map(|p| parse_param(p)).collect();
            client.call(&method, params).await.map_err(Into::into)
        }
        Commands::TestConnection => client
            .test_connection()
            .await
            .map(|ok| serde_json::json!({ "connected": ok, "endpoint": client.endpoint() }))
            .map_err(Into::into),
        Commands::NodeInfo => client
            .get_node_info()
            .await
            .map_err(anyhow::Error::from)
            .and_then(|info| info.to_value().context("Failed to encode node info")),
    };
    client.close();

    if cli.metrics {
        eprint!("{}", metrics.render().context("Failed to render metrics")?);
    }

    Ok(serde_json::to_string_pretty(&result?)?)
}

/// Apply `--log-level` and re-check the configuration it lands in
fn apply_log_level(config: &mut AppConfig, level: Option<String>) -> RpcResult<()> {
    if let Some(level) = level {
        config.logging.level = level;
        config.validate_config()?;
    }
    Ok(())
}

/// `123` and `true` become JSON values; anything that is not JSON stays a string
fn parse_param(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}
