use anyhow::Context;
use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

use tweet_ingest::app::ports::EventSink;
use tweet_ingest::config::{Config, SinkKind};
use tweet_ingest::infra::{NdjsonFileSink, StdoutSink, TokioScheduler, TwitterApi};
use tweet_ingest::ingestion::{ActiveSource, IngestEngine};
use tweet_ingest::{logging, metrics};

#[derive(Parser)]
#[command(name = "tweet_ingest")]
#[command(about = "Live and historical tweet ingestion")]
#[command(version = "0.1.0")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest tweets from the configured source until Ctrl-C
    Run {
        /// Path to the TOML configuration file
        #[arg(long, default_value = "tweet_ingest.toml")]
        config: PathBuf,
        /// Serve Prometheus metrics on this address (e.g. 127.0.0.1:9898)
        #[arg(long)]
        metrics_addr: Option<SocketAddr>,
    },
    /// Parse and validate a configuration file, then exit
    Check {
        #[arg(long, default_value = "tweet_ingest.toml")]
        config: PathBuf,
    },
}

async fn build_sink(config: &Config) -> anyhow::Result<Arc<dyn EventSink>> {
    Ok(match config.sink.kind {
        SinkKind::Stdout => Arc::new(StdoutSink::new()),
        SinkKind::Ndjson => {
            let path = config.sink.path.as_deref().context("ndjson sink needs a path")?;
            Arc::new(NdjsonFileSink::open(path).await?)
        }
    })
}

async fn run(config_path: PathBuf, metrics_addr: Option<SocketAddr>) -> anyhow::Result<()> {
    let config = Config::load(&config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;
    logging::init_logging(&config.logging.dir);

    if let Some(addr) = metrics_addr {
        metrics::init_metrics(addr);
    }

    let token = config.bearer_token()?;
    let api = TwitterApi::new(&config.endpoints, &token)?;
    let sink = build_sink(&config).await?;
    let scheduler = TokioScheduler::new();

    let engine = IngestEngine::new();
    match engine.start(&config.source, &api, sink, &scheduler).await? {
        ActiveSource::Live(_) => info!("live ingestion running"),
        ActiveSource::Historical(_) => info!(
            "historical ingestion running every {}s",
            config.source.polling_interval().as_secs()
        ),
    }

    tokio::signal::ctrl_c().await.context("waiting for Ctrl-C")?;
    info!("Ctrl-C received, shutting down");
    engine.shutdown().await;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run { config, metrics_addr } => {
            if let Err(e) = run(config, metrics_addr).await {
                error!("ingestion failed: {:#}", e);
                return Err(e);
            }
        }
        Commands::Check { config } => {
            let parsed = Config::load(&config)?;
            println!(
                "{}: {} source, {} parameters",
                config.display(),
                parsed.source.mode.as_str(),
                parsed.source.param_size()
            );
        }
    }
    Ok(())
}
