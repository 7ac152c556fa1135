/*
 * Responsibility
 * - Upload directory access (destination path + streaming write)
 * - No dedup / overwrite protection: last writer wins
 * - Knows nothing about HTTP; the handler feeds it a byte stream
 */
use std::path::{Path, PathBuf};

use axum::body::Bytes;
use futures_util::{Stream, StreamExt};
use thiserror::Error;
use tokio::io::AsyncWriteExt;

#[derive(Debug, Error)]
pub enum StoreError<E> {
    #[error("invalid filename: [{0}]")]
    InvalidFilename(String),

    /// Reading the upload body failed before it was fully written.
    #[error("{0}")]
    Body(E),

    #[error("{0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug)]
pub struct SavedFile {
    pub path: PathBuf,
    pub bytes: u64,
}

#[derive(Clone, Debug)]
pub struct UploadStore {
    dir: PathBuf,
}

impl UploadStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Final path element of a client supplied filename; directories and
    /// `..` are discarded. `None` when no name is left (`""`, `/`, `a/..`).
    pub fn basename(filename: &str) -> Option<String> {
        Path::new(filename)
            .file_name()
            .and_then(|name| name.to_str())
            .map(str::to_string)
    }

    /// `{dir}/{basename(filename)}`; never leaves `dir`.
    pub fn destination(&self, filename: &str) -> Option<PathBuf> {
        Self::basename(filename).map(|name| self.dir.join(name))
    }

    /// Create or truncate the destination and stream `body` into it.
    ///
    /// A body error removes the partial file; a write error leaves whatever
    /// reached the disk.
    pub async fn save<S, E>(
        &self,
        filename: &str,
        mut body: S,
    ) -> Result<SavedFile, StoreError<E>>
    where
        S: Stream<Item = Result<Bytes, E>> + Unpin,
    {
        let path = self
            .destination(filename)
            .ok_or_else(|| StoreError::InvalidFilename(filename.to_string()))?;

        let mut file = tokio::fs::File::create(&path).await?;
        let mut bytes: u64 = 0;

        while let Some(chunk) = body.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(e) => {
                    drop(file);
                    if let Err(rm) = tokio::fs::remove_file(&path).await {
                        tracing::warn!(
                            path = %path.display(),
                            error = %rm,
                            "unable to remove partial upload"
                        );
                    }
                    return Err(StoreError::Body(e));
                }
            };

            file.write_all(&chunk).await?;
            bytes += chunk.len() as u64;
        }
        file.flush().await?;

        Ok(SavedFile { path, bytes })
    }
}
