//! Process-scoped output directory.

use std::path::{Path, PathBuf};

use tokio::sync::OnceCell;

use crate::error::{Error, Result};

/// The directory all jobs write into, created on first use
#[derive(Debug)]
pub struct OutputDir {
    configured: PathBuf,
    resolved: OnceCell<PathBuf>,
}

impl OutputDir {
    /// Wrap the configured path; nothing touches the filesystem yet
    pub fn new(configured: impl Into<PathBuf>) -> Self {
        Self {
            configured: configured.into(),
            resolved: OnceCell::new(),
        }
    }

    /// Create the directory once and return its absolute path.
    ///
    /// Concurrent callers wait for the single in-flight attempt. A failed attempt
    /// leaves the cell empty so the next job tries again.
    pub async fn ensure(&self) -> Result<&Path> {
        let path = self
            .resolved
            .get_or_try_init(|| async {
                tokio::fs::create_dir_all(&self.configured)
                    .await
                    .map_err(|e| {
                        Error::Io(std::io::Error::new(
                            e.kind(),
                            format!(
                                "Failed to create output directory '{}': {}",
                                self.configured.display(),
                                e
                            ),
                        ))
                    })?;
                let absolute = tokio::fs::canonicalize(&self.configured).await?;
                tracing::info!(path = %absolute.display(), "Output directory ready");
                Ok::<_, Error>(absolute)
            })
            .await?;
        Ok(path.as_path())
    }
}
