//! relay-dl binary
//!
//! Reads its settings from the environment (a `.env` file is honoured), then runs the
//! bot, the swarm poller and the file server until SIGTERM/SIGINT.

use relay_dl::Config;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("relay_dl=info,tower_http=info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    tracing::info!(
        output_dir = %config.output_dir().display(),
        public_host = %config.output.public_host,
        bind_address = %config.server.bind_address,
        "Starting relay"
    );

    relay_dl::run(config).await?;
    Ok(())
}
