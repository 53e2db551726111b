//! Binary downloads (exports) staged through a temporary file.
//!
//! The payload is streamed into a temp file next to the destination and
//! renamed into place only when complete. Any early exit (error, cancel,
//! dropped future) deletes the temp file.

use std::path::{Path, PathBuf};

use reqwest::header::{HeaderMap, CONTENT_DISPOSITION};
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::client::ApiClient;
use super::error::ApiError;
use super::request::ApiRequest;

pub(super) async fn download(
    client: &ApiClient,
    request: ApiRequest,
    dest_dir: &Path,
    file_name: Option<&str>,
    cancel: &CancellationToken,
) -> Result<PathBuf, ApiError> {
    tokio::fs::create_dir_all(dest_dir).await?;

    let path = request.path.clone();
    let fallback = default_file_name(&path);
    let mut response = client.execute(request, Some(cancel)).await?;

    let name = file_name
        .and_then(safe_file_name)
        .or_else(|| disposition_file_name(response.headers()))
        .unwrap_or(fallback);

    let staging = tempfile::Builder::new()
        .prefix(".download-")
        .tempfile_in(dest_dir)?;
    let mut file = tokio::fs::File::from_std(staging.reopen()?);

    let mut written: u64 = 0;
    loop {
        let chunk = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!(file = %name, written, "Download cancelled");
                return Err(ApiError::Cancelled);
            }
            chunk = response.chunk() => chunk.map_err(|e| client.network_failure(&path, e))?,
        };
        match chunk {
            Some(bytes) => {
                file.write_all(&bytes).await?;
                written += bytes.len() as u64;
            }
            None => break,
        }
    }
    file.flush().await?;
    drop(file);

    let dest = dest_dir.join(&name);
    staging.persist(&dest).map_err(|e| ApiError::Io(e.error))?;

    info!(path = %dest.display(), bytes = written, "Download complete");
    Ok(dest)
}

/// Last path component of `name`, if it is a usable file name
fn safe_file_name(name: &str) -> Option<String> {
    let name = Path::new(name.trim()).file_name()?.to_str()?;
    if name.is_empty() || name.starts_with('.') {
        return None;
    }
    Some(name.to_string())
}

/// `filename` parameter of a `Content-Disposition: attachment` header
fn disposition_file_name(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(CONTENT_DISPOSITION)?.to_str().ok()?;
    value
        .split(';')
        .map(str::trim)
        .find_map(|part| part.strip_prefix("filename="))
        .map(|raw| raw.trim_matches('"'))
        .and_then(safe_file_name)
}

fn default_file_name(path: &str) -> String {
    let stem = path
        .trim_matches('/')
        .split('/')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-");
    let stamp = chrono::Utc::now().format("%Y%m%d-%H%M%S");
    if stem.is_empty() {
        format!("download-{stamp}")
    } else {
        format!("{stem}-{stamp}")
    }
}
