//! Build tool installers.
//!
//! A buildpack installs one toolchain into the shared cache and wires it
//! into a biome's environment overlay. All packs share one contract:
//! `install` is an idempotent fetch-and-unpack keyed by the version-derived
//! install directory, and `setup` mutates the composed overlay (PATH
//! prepends, tool variables) without assuming it is the only pack doing so.
//!
//! Packs are declared in a manifest as `<tool>:<version>` strings.

mod nodejs;
mod openjdk;

use std::path::{Path, PathBuf};

use thiserror::Error;

pub use nodejs::NodeTool;
pub use openjdk::JdkTool;

use crate::biome::EnvOverlay;
use crate::download::DownloadError;
use crate::paths::DataDirs;

/// Tool names with an in-tree buildpack.
pub const KNOWN_TOOLS: &[&str] = &["nodejs", "openjdk"];

#[derive(Debug, Error)]
pub enum BuildpackError {
  /// A tool spec string was not of the form `tool:version`.
  #[error("malformed tool spec '{0}' (expected <tool>:<version>)")]
  MalformedSpec(String),

  /// No buildpack exists for the named tool.
  #[error("unknown build tool '{tool}' (known tools: {})", KNOWN_TOOLS.join(", "))]
  UnknownTool { tool: String },

  /// Downloading or unpacking the tool archive failed.
  #[error(transparent)]
  Download(#[from] DownloadError),
}

/// Everything a buildpack needs to know about where it lives.
#[derive(Debug, Clone)]
pub struct BuildToolSpec {
  pub tool: String,
  pub version: String,
  /// Shared across packages and builds.
  pub shared_tools_dir: PathBuf,
  /// Download cache directory.
  pub downloads_dir: PathBuf,
  /// Cache scoped to the package being built.
  pub package_cache_dir: PathBuf,
  /// The package source directory.
  pub package_dir: PathBuf,
}

impl BuildToolSpec {
  /// Parse a `<tool>:<version>` spec string against the data dirs.
  pub fn parse(raw: &str, dirs: &DataDirs, package: &str, package_dir: &Path) -> Result<Self, BuildpackError> {
    let (tool, version) = raw
      .split_once(':')
      .ok_or_else(|| BuildpackError::MalformedSpec(raw.to_string()))?;
    if tool.is_empty() || version.is_empty() {
      return Err(BuildpackError::MalformedSpec(raw.to_string()));
    }
    Ok(Self {
      tool: tool.to_string(),
      version: version.to_string(),
      shared_tools_dir: dirs.tools_dir(),
      downloads_dir: dirs.downloads_dir(),
      package_cache_dir: dirs.package_cache_dir(package),
      package_dir: package_dir.to_path_buf(),
    })
  }

  /// The deterministic install directory for this tool and version.
  pub fn install_dir(&self) -> PathBuf {
    self
      .shared_tools_dir
      .join(&self.tool)
      .join(format!("{}-{}", self.tool, self.version))
  }
}

/// One toolchain installer.
#[derive(Debug)]
pub enum Buildpack {
  Node(NodeTool),
  OpenJdk(JdkTool),
}

impl Buildpack {
  /// Select the pack for a parsed spec.
  pub fn for_spec(spec: BuildToolSpec) -> Result<Self, BuildpackError> {
    match spec.tool.as_str() {
      "nodejs" => Ok(Buildpack::Node(NodeTool::new(spec))),
      "openjdk" => Ok(Buildpack::OpenJdk(JdkTool::new(spec))),
      other => Err(BuildpackError::UnknownTool {
        tool: other.to_string(),
      }),
    }
  }

  pub fn tool(&self) -> &str {
    match self {
      Buildpack::Node(t) => &t.spec().tool,
      Buildpack::OpenJdk(t) => &t.spec().tool,
    }
  }

  pub fn version(&self) -> &str {
    match self {
      Buildpack::Node(t) => &t.spec().version,
      Buildpack::OpenJdk(t) => &t.spec().version,
    }
  }

  /// Fetch and unpack the tool if its install directory is absent.
  /// A second call with the same spec is a no-op.
  pub async fn install(&self, client: &reqwest::Client) -> Result<(), BuildpackError> {
    match self {
      Buildpack::Node(t) => t.install(client).await,
      Buildpack::OpenJdk(t) => t.install(client).await,
    }
  }

  /// Wire the installed tool into the composed environment.
  pub fn setup(&self, env: &mut EnvOverlay) {
    match self {
      Buildpack::Node(t) => t.setup(env),
      Buildpack::OpenJdk(t) => t.setup(env),
    }
  }
}

/// Operating system name as toolchain mirrors spell it.
fn dist_os() -> &'static str {
  match std::env::consts::OS {
    "macos" => "darwin",
    other => other,
  }
}
