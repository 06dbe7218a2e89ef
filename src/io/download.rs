//! Artifact download with streaming SHA-256 verification
//!
//! The full payload always lands on disk and is hashed before anything
//! trusts it; unpacking is a separate, later step. On digest mismatch the
//! payload is deleted, so a corrupt mirror can never leave usable bytes in
//! the staging area.

use std::path::Path;

use futures::StreamExt;
use reqwest::Client;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;
use tracing::debug;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("hash mismatch: expected {expected}, got {actual}")]
    HashMismatch { expected: String, actual: String },

    #[error("download cancelled")]
    Cancelled,
}

/// Download `url` to `dest`, verifying the payload against `expected_sha256`.
///
/// Returns the actual digest on success. No retries: a hash mismatch would
/// never succeed on retry, and a flaky network is the caller's policy call.
pub async fn download_and_verify(
    client: &Client,
    url: &str,
    dest: &Path,
    expected_sha256: &str,
    cancel: &CancellationToken,
) -> Result<String, FetchError> {
    if cancel.is_cancelled() {
        return Err(FetchError::Cancelled);
    }

    let response = client
        .get(url)
        .header(reqwest::header::USER_AGENT, crate::USER_AGENT)
        .send()
        .await?
        .error_for_status()?;

    let total_size = response.content_length().unwrap_or(0);
    debug!(url, total_size, "downloading");

    let mut file = File::create(dest).await?;
    let mut stream = response.bytes_stream();
    let mut hasher = Sha256::new();
    let mut downloaded: u64 = 0;

    loop {
        let chunk = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                drop(file);
                tokio::fs::remove_file(dest).await.ok();
                return Err(FetchError::Cancelled);
            }
            chunk = stream.next() => match chunk {
                Some(chunk) => chunk?,
                None => break,
            },
        };
        file.write_all(&chunk).await?;
        hasher.update(&chunk);
        downloaded += chunk.len() as u64;
    }

    file.flush().await?;
    let actual = hex::encode(hasher.finalize());

    if actual != expected_sha256 {
        tokio::fs::remove_file(dest).await.ok();
        return Err(FetchError::HashMismatch {
            expected: expected_sha256.to_string(),
            actual,
        });
    }

    debug!(url, downloaded, "download verified");
    Ok(actual)
}
