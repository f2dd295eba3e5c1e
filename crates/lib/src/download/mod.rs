//! URL download cache and archive extraction.
//!
//! Build tools arrive as archives from well-known URLs. Downloads land in a
//! cache directory keyed by the URL, so a given URL is fetched at most once
//! per cache lifetime and repeated calls return the same local path. Writes
//! go through a temporary file and a rename, so two processes racing to
//! populate the same entry both end up with a complete file.

use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use sha2::{Digest, Sha256};
use tar::Archive;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum DownloadError {
  /// Failed to create the cache directory.
  #[error("failed to create cache directory '{0}': {1}")]
  CreateCacheDir(PathBuf, #[source] std::io::Error),

  /// HTTP request failed or returned a non-success status.
  #[error("download failed for {url}: {source}")]
  Http {
    url: String,
    #[source]
    source: reqwest::Error,
  },

  /// I/O error while writing or unpacking.
  #[error("io error: {0}")]
  Io(#[from] std::io::Error),
}

/// Download `url` into the cache, returning the local file path.
///
/// The path is a pure function of the URL; if it already exists the
/// download is skipped entirely.
pub async fn download_file_with_cache(
  client: &reqwest::Client,
  cache_dir: &Path,
  url: &str,
) -> Result<PathBuf, DownloadError> {
  fs::create_dir_all(cache_dir).map_err(|e| DownloadError::CreateCacheDir(cache_dir.to_path_buf(), e))?;

  let path = cache_dir.join(cache_file_name(url));
  if path.exists() {
    debug!(url, path = %path.display(), "download cache hit");
    return Ok(path);
  }

  info!(url, "downloading");
  let response = client
    .get(url)
    .send()
    .await
    .and_then(|r| r.error_for_status())
    .map_err(|source| DownloadError::Http {
      url: url.to_string(),
      source,
    })?;
  let bytes = response.bytes().await.map_err(|source| DownloadError::Http {
    url: url.to_string(),
    source,
  })?;

  // Write-then-rename keeps concurrent populators from observing a
  // truncated file.
  let partial = path.with_extension(format!("partial-{}", std::process::id()));
  fs::write(&partial, &bytes)?;
  fs::rename(&partial, &path)?;

  debug!(path = %path.display(), bytes = bytes.len(), "download complete");
  Ok(path)
}

/// Deterministic cache file name for a URL: a hash prefix plus the final
/// path segment for readability.
pub fn cache_file_name(url: &str) -> String {
  let mut hasher = Sha256::new();
  hasher.update(url.as_bytes());
  let digest = hex::encode(hasher.finalize());

  let without_query = url.split(['?', '#']).next().unwrap_or(url);
  match without_query.rsplit('/').next().filter(|s| !s.is_empty()) {
    Some(base) => format!("{}-{}", &digest[..16], base),
    None => digest[..16].to_string(),
  }
}

/// Unpack a gzipped tarball into `dest`, creating it as needed.
pub fn unpack_tar_gz(archive_path: &Path, dest: &Path) -> Result<(), DownloadError> {
  debug!(archive = %archive_path.display(), dest = %dest.display(), "unpacking");
  fs::create_dir_all(dest)?;

  let file = File::open(archive_path)?;
  let tar = GzDecoder::new(BufReader::new(file));
  let mut archive = Archive::new(tar);
  archive.unpack(dest)?;
  Ok(())
}
