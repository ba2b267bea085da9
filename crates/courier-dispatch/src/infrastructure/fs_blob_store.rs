//! Filesystem-backed blob store.
//!
//! The working area and the retention area are two directory roots. A copy
//! is staged next to its destination and published with a hard link, so a
//! destination either does not exist or holds the complete blob.

use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use courier_core::gateway::{BlobStore, GatewayError};
use tracing::warn;
use uuid::Uuid;

/// Blob store over two local directories.
#[derive(Debug, Clone)]
pub struct FsBlobStore {
    working_root: PathBuf,
    archive_root: PathBuf,
}

impl FsBlobStore {
    /// Creates a store reading from `working_root` and archiving into
    /// `archive_root`.
    #[must_use]
    pub fn new(working_root: impl Into<PathBuf>, archive_root: impl Into<PathBuf>) -> Self {
        Self {
            working_root: working_root.into(),
            archive_root: archive_root.into(),
        }
    }
}

fn resolve(root: &Path, key: &str) -> Result<PathBuf, GatewayError> {
    let relative = Path::new(key);
    let safe = !key.is_empty()
        && relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
    if !safe {
        return Err(GatewayError::Rejected(format!("unsafe blob key: {key:?}")));
    }
    Ok(root.join(relative))
}

fn io_error(context: &str, err: &std::io::Error) -> GatewayError {
    GatewayError::Unavailable(format!("{context}: {err}"))
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn copy(&self, source: &str, destination: &str) -> Result<(), GatewayError> {
        let source_path = resolve(&self.working_root, source)?;
        let destination_path = resolve(&self.archive_root, destination)?;

        if tokio::fs::try_exists(&destination_path)
            .await
            .map_err(|e| io_error("checking destination", &e))?
        {
            return Err(GatewayError::AlreadyExists(destination.to_owned()));
        }

        let parent = destination_path
            .parent()
            .ok_or_else(|| GatewayError::Rejected(format!("no parent for {destination:?}")))?;
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| io_error("creating archive directory", &e))?;

        let staging = parent.join(format!(".staging-{}", Uuid::new_v4()));
        if let Err(e) = tokio::fs::copy(&source_path, &staging).await {
            let _ = tokio::fs::remove_file(&staging).await;
            return Err(match e.kind() {
                ErrorKind::NotFound => GatewayError::NotFound(source.to_owned()),
                _ => io_error("copying blob", &e),
            });
        }

        let published = tokio::fs::hard_link(&staging, &destination_path).await;
        if let Err(e) = tokio::fs::remove_file(&staging).await {
            warn!(staging = %staging.display(), error = %e, "failed to remove staging file");
        }
        match published {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                Err(GatewayError::AlreadyExists(destination.to_owned()))
            }
            Err(e) => Err(io_error("publishing blob", &e)),
        }
    }
}
