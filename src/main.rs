use clap::Parser;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use vision_lab::config::Config;

#[derive(Parser, Debug)]
#[command(name = "vision-lab-server")]
#[command(about = "Image-processing lab: filters, histograms and explain mode over HTTP")]
#[command(version)]
pub struct Args {
    /// Host address to bind to
    #[arg(long, env = "LAB_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Port to listen on
    #[arg(long, env = "LAB_PORT", default_value = "8787")]
    pub port: u16,

    /// Maximum upload size in bytes (default: 20MB)
    #[arg(long, env = "LAB_MAX_FILE_SIZE", default_value = "20971520")]
    pub max_file_size: usize,

    /// How often to check whether the vision runtime is ready, in milliseconds
    #[arg(long, env = "LAB_POLL_INTERVAL_MS", default_value = "150")]
    pub poll_interval_ms: u64,

    /// Give up on the vision runtime after this many seconds
    #[arg(long, env = "LAB_READY_TIMEOUT_SECS", default_value = "10")]
    pub ready_timeout_secs: u64,

    /// Serve CLAHE requests with global histogram equalization
    #[arg(long, env = "LAB_DISABLE_CLAHE")]
    pub disable_clahe: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "RUST_LOG", default_value = "info")]
    pub log_level: String,
}

impl From<Args> for Config {
    fn from(args: Args) -> Self {
        Self {
            host: args.host,
            port: args.port,
            max_file_size: args.max_file_size,
            poll_interval: Duration::from_millis(args.poll_interval_ms.max(1)),
            ready_timeout: Duration::from_secs(args.ready_timeout_secs),
            disable_clahe: args.disable_clahe,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| args.log_level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from(args);

    tracing::info!("Starting vision-lab-server v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Binding to {}:{}", config.host, config.port);

    vision_lab::server::run(config).await
}
