//! Package manifest loading and target resolution.
//!
//! The manifest lives at `.arbor.yml` in the package directory. Loading
//! validates it (unique target names) before anything else looks at it;
//! dependency ordering lives in [`graph`].

mod graph;
mod types;

use std::collections::HashSet;
use std::path::{Path, PathBuf};

pub use graph::GraphError;
pub use types::{ContainerDefinition, Manifest, ManifestError, Target};

/// File name of the package manifest.
pub const MANIFEST_FILE: &str = ".arbor.yml";

/// A package on disk: its name, its directory, and its parsed manifest.
#[derive(Debug, Clone)]
pub struct Package {
  pub name: String,
  pub path: PathBuf,
  pub manifest: Manifest,
}

impl Package {
  /// Load the package rooted at `dir`.
  ///
  /// The package name comes from the manifest's `package` field, falling
  /// back to the directory name.
  pub fn load(dir: &Path) -> Result<Self, ManifestError> {
    let manifest_path = dir.join(MANIFEST_FILE);
    if !manifest_path.exists() {
      return Err(ManifestError::NotFound(manifest_path));
    }
    let raw = std::fs::read_to_string(&manifest_path).map_err(|source| ManifestError::Read {
      path: manifest_path,
      source,
    })?;
    let manifest = Manifest::parse(&raw)?;

    let name = match &manifest.package {
      Some(name) => name.clone(),
      None => dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| ManifestError::NoPackageName(dir.to_path_buf()))?,
    };

    Ok(Self {
      name,
      path: dir.to_path_buf(),
      manifest,
    })
  }
}

impl Manifest {
  /// Parse and validate manifest YAML.
  pub fn parse(raw: &str) -> Result<Self, ManifestError> {
    let manifest: Manifest = serde_yaml::from_str(raw)?;
    manifest.validate()?;
    Ok(manifest)
  }

  fn validate(&self) -> Result<(), ManifestError> {
    let mut seen = HashSet::new();
    for target in &self.targets {
      if !seen.insert(target.name.as_str()) {
        return Err(ManifestError::DuplicateTarget(target.name.clone()));
      }
    }
    Ok(())
  }

  /// Look up a target by name.
  pub fn target(&self, name: &str) -> Option<&Target> {
    self.targets.iter().find(|t| t.name == name)
  }

  /// All target names, in declaration order.
  pub fn target_names(&self) -> Vec<&str> {
    self.targets.iter().map(|t| t.name.as_str()).collect()
  }

  /// Compute the build order for `name`: every transitive dependency
  /// exactly once, dependencies before dependents, `name` last.
  pub fn build_order(&self, name: &str) -> Result<Vec<&Target>, GraphError> {
    graph::build_order(self, name)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::TempDir;

  const MANIFEST: &str = r#"
package: demo
targets:
  - name: default
    dependencies: [deps]
    commands:
      - make build
  - name: deps
    tools: ["nodejs:18.17.0"]
    container:
      image: node:18
      mounts: ["pkgcache:/cache"]
      env:
        CI: "true"
"#;

  #[test]
  fn parse_full_manifest() {
    let manifest = Manifest::parse(MANIFEST).unwrap();

    assert_eq!(manifest.package.as_deref(), Some("demo"));
    assert_eq!(manifest.target_names(), vec!["default", "deps"]);

    let deps = manifest.target("deps").unwrap();
    assert_eq!(deps.tools, vec!["nodejs:18.17.0"]);
    let container = deps.container.as_ref().unwrap();
    assert_eq!(container.image, "node:18");
    assert_eq!(container.mounts, vec!["pkgcache:/cache"]);
    assert_eq!(container.env.get("CI").map(String::as_str), Some("true"));
  }

  #[test]
  fn duplicate_target_names_rejected() {
    let raw = r#"
targets:
  - name: a
  - name: a
"#;
    let err = Manifest::parse(raw).unwrap_err();
    assert!(matches!(err, ManifestError::DuplicateTarget(name) if name == "a"));
  }

  #[test]
  fn load_package_from_directory() {
    let temp = TempDir::new().unwrap();
    std::fs::write(temp.path().join(MANIFEST_FILE), MANIFEST).unwrap();

    let package = Package::load(temp.path()).unwrap();
    assert_eq!(package.name, "demo");
    assert_eq!(package.manifest.targets.len(), 2);
  }

  #[test]
  fn package_name_falls_back_to_directory() {
    let temp = TempDir::new().unwrap();
    let dir = temp.path().join("mypkg");
    std::fs::create_dir(&dir).unwrap();
    std::fs::write(dir.join(MANIFEST_FILE), "targets: []\n").unwrap();

    let package = Package::load(&dir).unwrap();
    assert_eq!(package.name, "mypkg");
  }

  #[test]
  fn missing_manifest_is_not_found() {
    let temp = TempDir::new().unwrap();
    let err = Package::load(temp.path()).unwrap_err();
    assert!(matches!(err, ManifestError::NotFound(_)));
  }
}
