//! Common test utilities for relay-dl integration tests
//!
//! Wires a real [`TelegramClient`] against a wiremock Bot API and a scripted
//! swarm client into an [`Orchestrator`] writing to a temp directory.

#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use relay_dl::adapters::{SwarmClient, SwarmFile, SwarmHandle, SwarmInput, SwarmStats};
use relay_dl::bot::{Dispatcher, InboundMessage};
use relay_dl::telegram::TelegramClient;
use relay_dl::types::{Attachment, AttachmentRef, ChatRef, MessageRef};
use relay_dl::{Collaborators, Config, Event, Orchestrator, TransferError};
use serde_json::{Value, json};
use tempfile::TempDir;
use tokio::sync::broadcast;
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const TOKEN: &str = "4242:integration";
pub const PUBLIC_HOST: &str = "http://files.test";
pub const CHAT: i64 = 77;

/// Swarm client that reports every file finished on the first poll
pub struct InstantSwarm {
    pub name: String,
    pub files: Vec<SwarmFile>,
}

#[async_trait::async_trait]
impl SwarmClient for InstantSwarm {
    async fn add(&self, _input: &SwarmInput, download_dir: &Path) -> Result<SwarmHandle, TransferError> {
        for file in &self.files {
            let dest = download_dir.join(&file.path);
            if let Some(parent) = dest.parent() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| TransferError::io(parent, e))?;
            }
            tokio::fs::write(&dest, vec![0u8; file.length as usize])
                .await
                .map_err(|e| TransferError::io(&dest, e))?;
        }
        Ok(SwarmHandle(7))
    }

    async fn stats(&self, _handle: SwarmHandle) -> Result<SwarmStats, TransferError> {
        let total: u64 = self.files.iter().map(|f| f.length).sum();
        Ok(SwarmStats {
            name: self.name.clone(),
            metadata_ready: true,
            total_bytes: total,
            downloaded_bytes: total,
            percent: 100.0,
            rate_bps: 0,
            finished: true,
            error: None,
            files: self.files.clone(),
        })
    }

    async fn remove(&self, _handle: SwarmHandle) -> Result<(), TransferError> {
        Ok(())
    }
}

/// A running relay against a mocked Bot API
pub struct Relay {
    pub orchestrator: Orchestrator,
    pub dispatcher: Dispatcher,
    pub telegram: MockServer,
    pub temp_dir: TempDir,
}

fn ok(result: Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({ "ok": true, "result": result }))
}

/// Mount the Bot API methods a job touches, answering like Telegram does.
pub async fn mock_bot_api(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path(format!("/bot{TOKEN}/sendMessage")))
        .respond_with(ok(json!({ "message_id": 500, "chat": { "id": CHAT } })))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("/bot{TOKEN}/editMessageText")))
        .respond_with(ok(json!({ "message_id": 500, "chat": { "id": CHAT } })))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path_regex(format!(
            "^/bot{TOKEN}/(deleteMessage|setMessageReaction)$"
        )))
        .respond_with(ok(json!(true)))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("/bot{TOKEN}/getFile")))
        .respond_with(ok(json!({ "file_id": "vid", "file_path": "videos/file_1.mp4" })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/file/bot{TOKEN}/videos/file_1.mp4")))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"chat-video".to_vec()))
        .mount(server)
        .await;
}

/// Start a relay with fast polling and the given swarm client.
pub async fn start_relay(swarm: Arc<dyn SwarmClient>) -> Relay {
    let telegram = MockServer::start().await;
    mock_bot_api(&telegram).await;

    let temp_dir = tempfile::tempdir().expect("temp dir");
    let mut config = Config::default();
    config.output.output_dir = temp_dir.path().join("downloads");
    config.output.public_host = PUBLIC_HOST.to_string();
    config.telegram.token = TOKEN.to_string();
    config.telegram.api_base = telegram.uri();
    config.progress.http_poll_interval = Duration::from_millis(20);
    config.progress.swarm_poll_interval = Duration::from_millis(10);

    let http = reqwest::Client::new();
    let client = Arc::new(TelegramClient::new(http.clone(), &config.telegram));
    let orchestrator = Orchestrator::new(
        config,
        Collaborators {
            notifier: client.clone(),
            media: client.clone(),
            swarm,
            http,
        },
    );
    let dispatcher = Dispatcher::new(orchestrator.clone(), client);

    Relay {
        orchestrator,
        dispatcher,
        telegram,
        temp_dir,
    }
}

/// A text message from the test chat
pub fn text_message(id: i64, text: &str) -> InboundMessage {
    InboundMessage {
        chat: ChatRef(CHAT),
        message: MessageRef(id),
        from_first_name: Some("Grace".to_string()),
        text: Some(text.to_string()),
        ..Default::default()
    }
}

/// A video message from the test chat
pub fn video_message(id: i64) -> InboundMessage {
    InboundMessage {
        video: Some(Attachment {
            id: AttachmentRef("vid".to_string()),
            file_name: Some("holiday.mp4".to_string()),
            size_bytes: Some(10),
            mime_type: Some("video/mp4".to_string()),
        }),
        text: None,
        ..text_message(id, "")
    }
}

/// Wait until a job reaches a terminal event.
pub async fn wait_for_terminal(rx: &mut broadcast::Receiver<Event>) -> Event {
    tokio::time::timeout(Duration::from_secs(10), async {
        loop {
            match rx.recv().await {
                Ok(event @ (Event::JobCompleted { .. } | Event::JobFailed { .. })) => {
                    return event;
                }
                Ok(_) => continue,
                Err(e) => panic!("event channel failed: {e}"),
            }
        }
    })
    .await
    .expect("job did not finish in time")
}

/// JSON bodies of every call made to `method`, in order
pub async fn calls_to(server: &MockServer, api_method: &str) -> Vec<Value> {
    let suffix = format!("/{api_method}");
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .into_iter()
        .filter(|r| r.url.path().ends_with(&suffix))
        .map(|r| r.body_json::<Value>().expect("json body"))
        .collect()
}

/// Texts of every sendMessage call, in order
pub async fn sent_texts(server: &MockServer) -> Vec<String> {
    calls_to(server, "sendMessage")
        .await
        .into_iter()
        .filter_map(|body| body["text"].as_str().map(str::to_string))
        .collect()
}

/// Wait until the orchestrator has released every job.
pub async fn wait_until_idle(orchestrator: &Orchestrator) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !orchestrator.active_jobs().await.is_empty() {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .expect("jobs still registered");
}
