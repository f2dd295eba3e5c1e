//! Manifest data types.
//!
//! A package manifest declares a set of named build targets. Each target
//! lists the targets it depends on, the build tools it needs, the shell
//! commands that build it, and optionally a container to run inside.
//! Everything here is plain data, immutable once deserialized.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Deserialize;
use thiserror::Error;

/// Errors raised while loading or validating a manifest.
#[derive(Debug, Error)]
pub enum ManifestError {
  /// The manifest file does not exist.
  #[error("no manifest found at {0}")]
  NotFound(PathBuf),

  /// The manifest file could not be read.
  #[error("failed to read manifest at {path}: {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  /// The manifest file is not valid YAML or has the wrong shape.
  #[error("failed to parse manifest: {0}")]
  Parse(#[from] serde_yaml::Error),

  /// Two targets share a name.
  #[error("duplicate target name '{0}' in manifest")]
  DuplicateTarget(String),

  /// The package name could not be derived from the directory.
  #[error("cannot derive a package name from directory {0}")]
  NoPackageName(PathBuf),
}

/// The parsed contents of a `.arbor.yml` file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Manifest {
  /// Package name; defaults to the directory name when omitted.
  #[serde(default)]
  pub package: Option<String>,

  /// Build targets in declaration order.
  #[serde(default)]
  pub targets: Vec<Target>,
}

/// A named unit of build work.
#[derive(Debug, Clone, Deserialize)]
pub struct Target {
  pub name: String,

  /// Names of targets that must build before this one, in declaration order.
  #[serde(default)]
  pub dependencies: Vec<String>,

  /// Build tool specs of the form `<tool>:<version>`, installed in order.
  #[serde(default)]
  pub tools: Vec<String>,

  /// Shell commands run in order during the build phase.
  #[serde(default)]
  pub commands: Vec<String>,

  /// When present, the target runs inside this container instead of on
  /// the host.
  #[serde(default)]
  pub container: Option<ContainerDefinition>,
}

/// A requested container environment for a target.
#[derive(Debug, Clone, Deserialize)]
pub struct ContainerDefinition {
  /// Image reference, e.g. `golang:1.22`.
  pub image: String,

  /// Mount specs of the form `<host-relative>:<container-absolute>`.
  /// Host paths resolve under the package working directory.
  #[serde(default)]
  pub mounts: Vec<String>,

  /// Ports the container declares, e.g. `"8080"`.
  #[serde(default)]
  pub ports: Vec<String>,

  /// Extra environment variables for commands run in the container.
  #[serde(default)]
  pub env: BTreeMap<String, String>,
}
