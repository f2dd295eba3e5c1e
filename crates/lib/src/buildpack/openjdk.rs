//! OpenJDK buildpack.
//!
//! Installs a GPL OpenJDK build from the java.net GA archive and exposes
//! it as `JAVA_HOME` plus a PATH prepend of its `bin` directory.

use std::path::PathBuf;

use tracing::{debug, info};

use crate::biome::EnvOverlay;
use crate::download::{download_file_with_cache, unpack_tar_gz};

use super::{BuildToolSpec, BuildpackError};

const OPENJDK_DIST_MIRROR: &str = "https://download.java.net/java/GA";

#[derive(Debug)]
pub struct JdkTool {
  spec: BuildToolSpec,
}

impl JdkTool {
  pub fn new(spec: BuildToolSpec) -> Self {
    Self { spec }
  }

  pub fn spec(&self) -> &BuildToolSpec {
    &self.spec
  }

  fn major_version(&self) -> &str {
    self.spec.version.split('.').next().unwrap_or(&self.spec.version)
  }

  /// The unpacked JDK root under the install directory.
  fn jdk_root(&self) -> PathBuf {
    self.spec.install_dir().join(format!("jdk-{}", self.spec.version))
  }

  fn download_url(&self) -> String {
    format!(
      "{OPENJDK_DIST_MIRROR}/jdk{major}/{version}/GPL/openjdk-{version}_{os}-{arch}_bin.tar.gz",
      major = self.major_version(),
      version = self.spec.version,
      os = jdk_os(),
      arch = jdk_arch(),
    )
  }

  pub async fn install(&self, client: &reqwest::Client) -> Result<(), BuildpackError> {
    let install_dir = self.spec.install_dir();
    if install_dir.exists() {
      debug!(version = %self.spec.version, dir = %install_dir.display(), "openjdk already installed");
      return Ok(());
    }

    info!(version = %self.spec.version, dir = %install_dir.display(), "installing openjdk");
    let archive = download_file_with_cache(client, &self.spec.downloads_dir, &self.download_url()).await?;
    unpack_tar_gz(&archive, &install_dir)?;
    Ok(())
  }

  pub fn setup(&self, env: &mut EnvOverlay) {
    let root = self.jdk_root();
    env.set("JAVA_HOME", root.display().to_string());
    env.prepend_path(root.join("bin"));
  }
}

/// Operating system name as the java.net archive spells it, which matches
/// the std spelling.
fn jdk_os() -> &'static str {
  std::env::consts::OS
}

/// Architecture name as the java.net archive spells it.
fn jdk_arch() -> &'static str {
  match std::env::consts::ARCH {
    "x86_64" => "x64",
    other => other,
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::paths::DataDirs;
  use std::path::Path;

  fn tool() -> JdkTool {
    let dirs = DataDirs::from_roots("/cache", "/build");
    let spec = BuildToolSpec::parse("openjdk:17.0.2", &dirs, "demo", Path::new("/src/demo")).unwrap();
    JdkTool::new(spec)
  }

  #[test]
  fn download_url_uses_major_version_directory() {
    let url = tool().download_url();
    assert!(url.starts_with("https://download.java.net/java/GA/jdk17/17.0.2/GPL/openjdk-17.0.2_"));
    assert!(url.ends_with("_bin.tar.gz"));
  }

  #[test]
  fn setup_sets_java_home_and_path() {
    let jdk = tool();
    let mut env = EnvOverlay::new();
    jdk.setup(&mut env);

    assert_eq!(
      env.get("JAVA_HOME"),
      Some("/cache/tools/openjdk/openjdk-17.0.2/jdk-17.0.2")
    );
    assert!(env.has_path_entry(&jdk.jdk_root().join("bin")));
  }
}
