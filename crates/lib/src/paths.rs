//! Persistent directory layout.
//!
//! arbor keeps two roots on disk:
//! - the cache root: shared tool installs and the download cache, survives
//!   across packages and builds
//! - the build root: per-package working directories and logs
//!
//! Both can be overridden with environment variables, which is also how
//! tests isolate themselves.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Environment variable overriding the cache root.
pub const CACHE_DIR_ENV: &str = "ARBOR_CACHE_DIR";

/// Environment variable overriding the build root.
pub const BUILD_ROOT_ENV: &str = "ARBOR_BUILD_ROOT";

#[derive(Debug, Error)]
pub enum PathsError {
  /// No cache directory could be determined for this platform.
  #[error("cannot determine a cache directory; set {CACHE_DIR_ENV}")]
  NoCacheDir,
}

/// Resolved data directories for one invocation.
#[derive(Debug, Clone)]
pub struct DataDirs {
  cache_root: PathBuf,
  build_root: PathBuf,
}

impl DataDirs {
  /// Resolve directories from the environment, falling back to the
  /// platform cache directory.
  pub fn resolve() -> Result<Self, PathsError> {
    let cache_root = match std::env::var_os(CACHE_DIR_ENV) {
      Some(dir) => PathBuf::from(dir),
      None => dirs::cache_dir().ok_or(PathsError::NoCacheDir)?.join("arbor"),
    };
    let build_root = match std::env::var_os(BUILD_ROOT_ENV) {
      Some(dir) => PathBuf::from(dir),
      None => cache_root.join("build"),
    };
    Ok(Self { cache_root, build_root })
  }

  /// Construct from explicit roots.
  pub fn from_roots(cache_root: impl Into<PathBuf>, build_root: impl Into<PathBuf>) -> Self {
    Self {
      cache_root: cache_root.into(),
      build_root: build_root.into(),
    }
  }

  pub fn cache_root(&self) -> &Path {
    &self.cache_root
  }

  pub fn build_root(&self) -> &Path {
    &self.build_root
  }

  /// Shared tool installs, keyed by tool and version.
  pub fn tools_dir(&self) -> PathBuf {
    self.cache_root.join("tools")
  }

  /// Cached URL downloads.
  pub fn downloads_dir(&self) -> PathBuf {
    self.cache_root.join("downloads")
  }

  /// Working directory for one package under the build root.
  pub fn package_build_dir(&self, package: &str) -> PathBuf {
    self.build_root.join(package)
  }

  /// Package-scoped cache, for tool state tied to one package.
  pub fn package_cache_dir(&self, package: &str) -> PathBuf {
    self.package_build_dir(package).join("cache")
  }

  /// Log directory for one package.
  pub fn package_log_dir(&self, package: &str) -> PathBuf {
    self.package_build_dir(package).join("logs")
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn derived_paths_hang_off_roots() {
    let dirs = DataDirs::from_roots("/cache", "/build");

    assert_eq!(dirs.tools_dir(), PathBuf::from("/cache/tools"));
    assert_eq!(dirs.downloads_dir(), PathBuf::from("/cache/downloads"));
    assert_eq!(dirs.package_build_dir("demo"), PathBuf::from("/build/demo"));
    assert_eq!(dirs.package_cache_dir("demo"), PathBuf::from("/build/demo/cache"));
    assert_eq!(dirs.package_log_dir("demo"), PathBuf::from("/build/demo/logs"));
  }
}
