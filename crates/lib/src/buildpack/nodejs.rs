//! Node.js buildpack.
//!
//! Installs a Node release from the official dist mirror and exposes it
//! through the environment overlay: the release `bin` directory and the
//! package's `node_modules/.bin` go onto PATH, and `NODE_PATH` points at
//! the package directory.

use std::path::PathBuf;

use tracing::{debug, info};

use crate::biome::EnvOverlay;
use crate::download::{download_file_with_cache, unpack_tar_gz};

use super::{BuildToolSpec, BuildpackError, dist_os};

const NODE_DIST_MIRROR: &str = "https://nodejs.org/dist";

#[derive(Debug)]
pub struct NodeTool {
  spec: BuildToolSpec,
}

impl NodeTool {
  pub fn new(spec: BuildToolSpec) -> Self {
    Self { spec }
  }

  pub fn spec(&self) -> &BuildToolSpec {
    &self.spec
  }

  /// Release directory name as it appears inside the dist tarball.
  fn package_string(&self) -> String {
    format!("node-v{}-{}-{}", self.spec.version, dist_os(), node_arch())
  }

  /// The unpacked release root under the install directory.
  fn node_root(&self) -> PathBuf {
    self.spec.install_dir().join(self.package_string())
  }

  fn download_url(&self) -> String {
    format!(
      "{NODE_DIST_MIRROR}/v{version}/{package}.tar.gz",
      version = self.spec.version,
      package = self.package_string(),
    )
  }

  pub async fn install(&self, client: &reqwest::Client) -> Result<(), BuildpackError> {
    let install_dir = self.spec.install_dir();
    if install_dir.exists() {
      debug!(version = %self.spec.version, dir = %install_dir.display(), "node already installed");
      return Ok(());
    }

    info!(version = %self.spec.version, dir = %install_dir.display(), "installing node");
    let archive = download_file_with_cache(client, &self.spec.downloads_dir, &self.download_url()).await?;
    unpack_tar_gz(&archive, &install_dir)?;
    Ok(())
  }

  pub fn setup(&self, env: &mut EnvOverlay) {
    env.prepend_path(self.node_root().join("bin"));
    env.set("NODE_PATH", self.spec.package_dir.display().to_string());
    env.prepend_path(self.spec.package_dir.join("node_modules").join(".bin"));
  }
}

/// Architecture name as the Node dist mirror spells it.
fn node_arch() -> &'static str {
  match std::env::consts::ARCH {
    "x86_64" => "x64",
    "aarch64" => "arm64",
    other => other,
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::paths::DataDirs;
  use std::path::Path;

  fn tool() -> NodeTool {
    let dirs = DataDirs::from_roots("/cache", "/build");
    let spec = BuildToolSpec::parse("nodejs:18.17.0", &dirs, "demo", Path::new("/src/demo")).unwrap();
    NodeTool::new(spec)
  }

  #[test]
  fn download_url_names_the_release() {
    let url = tool().download_url();
    assert!(url.starts_with("https://nodejs.org/dist/v18.17.0/node-v18.17.0-"));
    assert!(url.ends_with(".tar.gz"));
  }

  #[test]
  fn setup_wires_paths_and_node_path() {
    let node = tool();
    let mut env = EnvOverlay::new();
    node.setup(&mut env);

    assert_eq!(env.get("NODE_PATH"), Some("/src/demo"));
    assert!(env.has_path_entry(&node.node_root().join("bin")));
    assert!(env.has_path_entry(Path::new("/src/demo/node_modules/.bin")));
  }
}
