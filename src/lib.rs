//! # relay-dl
//!
//! Chat-driven download relay: a user sends a video, a `/link <url>` or a
//! `/torrent <magnet>` to a bot, the relay fetches the content into an output
//! directory and answers with a plain HTTP link to it.
//!
//! ## Architecture
//!
//! - [`orchestrator`] - job lifecycle: resolve the request, run a backend, throttle
//!   status edits, publish links
//! - [`adapters`] - the three backends (remote media, HTTP, swarm) behind one event channel
//! - [`throttle`], [`naming`], [`link`] - status-edit gating, output names, retrieval links
//! - [`telegram`], [`transmission`] - concrete collaborators (Bot API, Transmission RPC)
//! - [`bot`] - command parsing and update polling
//! - [`api`] - static file export plus a small status API
//!
//! ## Quick Start
//!
//! ```no_run
//! use relay_dl::{Config, run};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_env()?;
//!     run(config).await?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Backend adapters
pub mod adapters;
/// HTTP server (file export and status API)
pub mod api;
/// Chat command parsing and update polling
pub mod bot;
/// Configuration types
pub mod config;
/// Error types
pub mod error;
/// Retrieval link construction
pub mod link;
/// Output file naming
pub mod naming;
/// Messaging collaborator trait
pub mod notifier;
/// Job orchestration
pub mod orchestrator;
/// Progress samples and status text
pub mod progress;
/// Telegram Bot API client
pub mod telegram;
/// Status-edit throttle
pub mod throttle;
/// Transmission RPC client
pub mod transmission;
/// Core types and events
pub mod types;
/// Utility functions
pub mod utils;

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

// Re-export commonly used types
pub use adapters::{Backend, BackendEvent, MediaSource, SwarmClient};
pub use config::Config;
pub use error::{ApiError, Error, ErrorDetail, Result, ToHttpStatus, TransferError};
pub use notifier::Notifier;
pub use orchestrator::{Collaborators, JobHandle, JobRequest, Orchestrator, SourceSpec};
pub use throttle::ProgressThrottle;
pub use types::{Event, JobId, JobInfo, JobSource, JobState, OutputFile};

/// Run the relay until a termination signal arrives.
///
/// Wires the Telegram and Transmission clients into an [`Orchestrator`], serves the
/// output directory over HTTP and polls the Bot API for commands. On SIGTERM/SIGINT it
/// stops polling, shuts the orchestrator down and then stops the HTTP server.
pub async fn run(config: Config) -> Result<()> {
    if config.telegram.token.trim().is_empty() {
        return Err(Error::Config {
            message: "bot token is not set".to_string(),
            key: Some("token".to_string()),
        });
    }

    let http = reqwest::Client::builder()
        .user_agent(concat!("relay-dl/", env!("CARGO_PKG_VERSION")))
        .build()?;

    let telegram = Arc::new(telegram::TelegramClient::new(http.clone(), &config.telegram));
    let swarm = Arc::new(transmission::TransmissionClient::new(
        http.clone(),
        &config.swarm,
    ));

    let orchestrator = Orchestrator::new(
        config.clone(),
        Collaborators {
            notifier: telegram.clone(),
            media: telegram.clone(),
            swarm,
            http,
        },
    );
    // Create the directory up front so the file server has something to serve.
    orchestrator.output_dir().ensure().await?;

    let config = orchestrator.get_config();
    let server_token = CancellationToken::new();
    let server = tokio::spawn(api::start_api_server(
        Arc::new(orchestrator.clone()),
        config.clone(),
        server_token.clone(),
    ));

    let polling_token = CancellationToken::new();
    let polling = tokio::spawn(bot::run_polling(
        telegram.clone(),
        bot::Dispatcher::new(orchestrator.clone(), telegram),
        config.telegram.poll_timeout,
        polling_token.clone(),
    ));

    run_with_shutdown(&orchestrator).await;

    polling_token.cancel();
    if let Err(e) = polling.await {
        tracing::warn!(error = %e, "Polling task ended abnormally");
    }

    server_token.cancel();
    match server.await {
        Ok(result) => result?,
        Err(e) => tracing::warn!(error = %e, "HTTP server task ended abnormally"),
    }
    Ok(())
}

/// Wait for a termination signal, then shut the orchestrator down.
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
pub async fn run_with_shutdown(orchestrator: &Orchestrator) {
    wait_for_signal().await;
    orchestrator.shutdown().await;
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Registration may fail in restricted environments (containers, tests)
    let sigterm_result = signal(SignalKind::terminate());
    let sigint_result = signal(SignalKind::interrupt());

    match (sigterm_result, sigint_result) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => tracing::info!("Received SIGTERM signal"),
                _ = sigint.recv() => tracing::info!("Received SIGINT signal (Ctrl+C)"),
            }
        }
        (Err(e), _) | (_, Err(e)) => {
            tracing::warn!(error = %e, "Could not register Unix signal handlers, using ctrl_c fallback");
            tokio::signal::ctrl_c().await.ok();
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Received Ctrl+C signal"),
        Err(e) => tracing::error!(error = %e, "Failed to listen for Ctrl+C signal"),
    }
}
