//! Transmission RPC client backing the swarm adapter.
//!
//! Talks JSON-RPC to a running `transmission-daemon`. The daemon answers the first
//! request of a session with `409 Conflict` and an `X-Transmission-Session-Id` header;
//! the client stores the id and replays the request once.

use std::path::Path;
use std::sync::Mutex;

use base64::Engine;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::adapters::{SwarmClient, SwarmFile, SwarmHandle, SwarmInput, SwarmStats};
use crate::config::SwarmConfig;
use crate::error::TransferError;

const SESSION_HEADER: &str = "X-Transmission-Session-Id";

/// Transmission reports errors 1 and 2 for trackers; 3 is a local, fatal error.
const LOCAL_ERROR: i64 = 3;

const STATS_FIELDS: &[&str] = &[
    "id",
    "name",
    "error",
    "errorString",
    "sizeWhenDone",
    "leftUntilDone",
    "percentDone",
    "rateDownload",
    "metadataPercentComplete",
    "files",
];

/// Swarm client speaking the Transmission RPC protocol
pub struct TransmissionClient {
    http: reqwest::Client,
    rpc_url: String,
    credentials: Option<(String, Option<String>)>,
    session_id: Mutex<Option<String>>,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    result: String,
    #[serde(default)]
    arguments: Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TorrentFields {
    #[serde(default)]
    name: String,
    #[serde(default)]
    error: i64,
    #[serde(default)]
    error_string: String,
    #[serde(default)]
    size_when_done: u64,
    #[serde(default)]
    left_until_done: u64,
    #[serde(default)]
    percent_done: f64,
    #[serde(default)]
    rate_download: u64,
    #[serde(default)]
    metadata_percent_complete: f64,
    #[serde(default)]
    files: Vec<TorrentFile>,
}

#[derive(Debug, Deserialize)]
struct TorrentFile {
    name: String,
    length: u64,
}

impl From<TorrentFields> for SwarmStats {
    fn from(t: TorrentFields) -> Self {
        let metadata_ready = t.metadata_percent_complete >= 1.0;
        SwarmStats {
            name: t.name,
            metadata_ready,
            total_bytes: t.size_when_done,
            downloaded_bytes: t.size_when_done.saturating_sub(t.left_until_done),
            percent: t.percent_done * 100.0,
            rate_bps: t.rate_download,
            finished: metadata_ready && t.left_until_done == 0,
            error: (t.error == LOCAL_ERROR).then_some(t.error_string),
            files: t
                .files
                .into_iter()
                .map(|f| SwarmFile {
                    path: f.name,
                    length: f.length,
                })
                .collect(),
        }
    }
}

impl TransmissionClient {
    /// Create a client for the configured daemon
    pub fn new(http: reqwest::Client, config: &SwarmConfig) -> Self {
        Self {
            http,
            rpc_url: config.rpc_url.clone(),
            credentials: config
                .username
                .clone()
                .map(|user| (user, config.password.clone())),
            session_id: Mutex::new(None),
        }
    }

    fn current_session(&self) -> Option<String> {
        self.session_id.lock().ok().and_then(|guard| guard.clone())
    }

    fn store_session(&self, id: String) {
        if let Ok(mut guard) = self.session_id.lock() {
            *guard = Some(id);
        }
    }

    async fn post(&self, body: &Value) -> Result<reqwest::Response, TransferError> {
        let mut request = self.http.post(&self.rpc_url).json(body);
        if let Some(session) = self.current_session() {
            request = request.header(SESSION_HEADER, session);
        }
        if let Some((user, pass)) = &self.credentials {
            request = request.basic_auth(user, pass.as_ref());
        }
        Ok(request.send().await?)
    }

    /// Issue one RPC call, negotiating the session id when asked to.
    async fn call(&self, method: &str, arguments: Value) -> Result<Value, TransferError> {
        let body = json!({ "method": method, "arguments": arguments });

        let mut response = self.post(&body).await?;
        if response.status() == reqwest::StatusCode::CONFLICT {
            let session = response
                .headers()
                .get(SESSION_HEADER)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
                .ok_or_else(|| {
                    TransferError::Swarm("409 from daemon without a session id".to_string())
                })?;
            tracing::debug!("Negotiated new Transmission session");
            self.store_session(session);
            response = self.post(&body).await?;
        }

        let status = response.status();
        if !status.is_success() {
            return Err(TransferError::Http {
                status: status.as_u16(),
                url: self.rpc_url.clone(),
            });
        }

        let rpc: RpcResponse = response
            .json()
            .await
            .map_err(|e| TransferError::Swarm(format!("malformed RPC response: {e}")))?;
        if rpc.result != "success" {
            return Err(TransferError::Swarm(format!("{method}: {}", rpc.result)));
        }
        Ok(rpc.arguments)
    }
}

#[async_trait::async_trait]
impl SwarmClient for TransmissionClient {
    async fn add(
        &self,
        input: &SwarmInput,
        download_dir: &Path,
    ) -> Result<SwarmHandle, TransferError> {
        let mut arguments = json!({ "download-dir": download_dir.display().to_string() });
        match input {
            SwarmInput::Uri(uri) => {
                arguments["filename"] = Value::String(uri.clone());
            }
            SwarmInput::TorrentFile(path) => {
                let bytes = tokio::fs::read(path)
                    .await
                    .map_err(|e| TransferError::io(path, e))?;
                arguments["metainfo"] =
                    Value::String(base64::engine::general_purpose::STANDARD.encode(bytes));
            }
        }

        let result = self.call("torrent-add", arguments).await?;
        let added = result
            .get("torrent-added")
            .or_else(|| result.get("torrent-duplicate"))
            .ok_or_else(|| TransferError::Swarm("torrent-add returned no torrent".to_string()))?;
        let id = added
            .get("id")
            .and_then(Value::as_i64)
            .ok_or_else(|| TransferError::Swarm("torrent-add returned no id".to_string()))?;

        let name = added.get("name").and_then(Value::as_str).unwrap_or_default();
        tracing::info!(torrent_id = id, name, "Torrent added to Transmission");
        Ok(SwarmHandle(id))
    }

    async fn stats(&self, handle: SwarmHandle) -> Result<SwarmStats, TransferError> {
        let result = self
            .call(
                "torrent-get",
                json!({ "ids": [handle.0], "fields": STATS_FIELDS }),
            )
            .await?;

        let torrent = result
            .get("torrents")
            .and_then(Value::as_array)
            .and_then(|list| list.first())
            .cloned()
            .ok_or_else(|| TransferError::Swarm(format!("torrent {} is gone", handle.0)))?;

        let fields: TorrentFields = serde_json::from_value(torrent)
            .map_err(|e| TransferError::Swarm(format!("malformed torrent fields: {e}")))?;
        Ok(fields.into())
    }

    async fn remove(&self, handle: SwarmHandle) -> Result<(), TransferError> {
        self.call(
            "torrent-remove",
            json!({ "ids": [handle.0], "delete-local-data": false }),
        )
        .await?;
        Ok(())
    }
}
