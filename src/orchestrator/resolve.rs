//! Turning a [`JobRequest`] into a job source and a ready-to-run backend.

use std::path::{Path, PathBuf};

use crate::adapters::{Backend, HttpAdapter, RemoteMediaAdapter, SwarmAdapter, SwarmInput};
use crate::error::{Error, Result};
use crate::naming;
use crate::types::{Attachment, JobSource};

use super::Orchestrator;
use super::request::{JobRequest, SourceSpec};

const DEFAULT_DESCRIPTOR_NAME: &str = "descriptor.torrent";

/// A request after validation
pub(crate) struct Resolved {
    pub(crate) source: JobSource,
    pub(crate) backend: Backend,
}

/// Trim and check a `/link` argument
pub(crate) fn validate_url(raw: &str) -> Result<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidSource("missing URL".to_string()));
    }
    let parsed = url::Url::parse(trimmed)
        .map_err(|e| Error::InvalidSource(format!("'{trimmed}' is not a valid URL: {e}")))?;
    match parsed.scheme() {
        "http" | "https" => Ok(trimmed.to_string()),
        other => Err(Error::InvalidSource(format!(
            "unsupported URL scheme '{other}'"
        ))),
    }
}

fn non_empty(value: Option<&String>) -> Option<String> {
    value
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

impl Orchestrator {
    pub(crate) async fn resolve(&self, request: &JobRequest) -> Result<Resolved> {
        match &request.source {
            SourceSpec::Media { attachment } => {
                let attachment = attachment.clone().ok_or_else(|| {
                    Error::InvalidSource("message has no video attachment".to_string())
                })?;
                let dir = self.output_dir.ensure().await?.to_path_buf();
                Ok(Resolved {
                    source: JobSource::RemoteMedia {
                        chat_id: request.chat.0,
                        message_id: request.message.0,
                    },
                    backend: Backend::RemoteMedia(RemoteMediaAdapter::new(
                        self.collaborators.media.clone(),
                        attachment,
                        dir,
                    )),
                })
            }
            SourceSpec::Url { url } => {
                let url = validate_url(url)?;
                let dir = self.output_dir.ensure().await?.to_path_buf();
                Ok(Resolved {
                    source: JobSource::DirectUrl { url: url.clone() },
                    backend: Backend::Http(HttpAdapter::new(
                        self.collaborators.http.clone(),
                        url,
                        dir,
                        self.config.progress.http_poll_interval,
                    )),
                })
            }
            SourceSpec::Torrent {
                magnet,
                torrent_file,
            } => {
                let magnet = non_empty(magnet.as_ref());
                if magnet.is_none() && torrent_file.is_none() {
                    return Err(Error::InvalidSource("missing magnet link".to_string()));
                }
                let dir = self.output_dir.ensure().await?.to_path_buf();

                let mut input = None;
                if let Some(attachment) = torrent_file {
                    match self.materialize_torrent(attachment, &dir).await {
                        Ok(path) => input = Some(SwarmInput::TorrentFile(path)),
                        Err(e) => tracing::warn!(
                            job_id = %request.id(),
                            error = %e,
                            "Failed to fetch torrent descriptor, falling back to magnet"
                        ),
                    }
                }
                let input = input
                    .or_else(|| magnet.map(SwarmInput::Uri))
                    .ok_or_else(|| {
                        Error::InvalidSource("torrent file could not be fetched".to_string())
                    })?;

                Ok(Resolved {
                    source: JobSource::Torrent {
                        magnet_or_file_path: input.as_source_string(),
                    },
                    backend: Backend::Swarm(SwarmAdapter::new(
                        self.collaborators.swarm.clone(),
                        input,
                        dir,
                        self.config.progress.swarm_poll_interval,
                    )),
                })
            }
        }
    }

    /// Download a `.torrent` attachment into `dir` before the swarm join.
    async fn materialize_torrent(&self, attachment: &Attachment, dir: &Path) -> Result<PathBuf> {
        let link = self
            .collaborators
            .notifier
            .attachment_link(&attachment.id)
            .await?;

        // The link embeds the bot token; keep it out of errors.
        let bytes = self
            .collaborators
            .http
            .get(&link)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| Error::Network(e.without_url()))?
            .bytes()
            .await
            .map_err(|e| Error::Network(e.without_url()))?;

        let name = naming::assign(
            attachment
                .file_name
                .as_deref()
                .unwrap_or(DEFAULT_DESCRIPTOR_NAME),
        );
        let path = dir.join(name);
        tokio::fs::write(&path, &bytes).await?;

        tracing::debug!(
            path = %path.display(),
            size = bytes.len(),
            "Torrent descriptor materialized"
        );
        Ok(path)
    }
}
