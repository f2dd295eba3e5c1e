//! Environment overlay carried by a biome.
//!
//! Build tools never touch the ambient process environment. Instead each
//! biome carries an overlay that is merged over a base environment at
//! execution time: a last-write-wins variable map plus an ordered list of
//! PATH prepends. Later prepends land earlier in the final PATH, matching
//! the "most recently set up tool wins" behavior tools expect.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// An environment overlay: variables plus PATH prepends.
#[derive(Debug, Clone, Default)]
pub struct EnvOverlay {
  vars: BTreeMap<String, String>,
  path_prepend: Vec<PathBuf>,
}

impl EnvOverlay {
  pub fn new() -> Self {
    Self::default()
  }

  /// Set a variable. Last write wins on duplicate keys.
  pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
    self.vars.insert(key.into(), value.into());
  }

  /// Add a directory to the front of the composed PATH.
  pub fn prepend_path(&mut self, dir: impl Into<PathBuf>) {
    self.path_prepend.insert(0, dir.into());
  }

  pub fn get(&self, key: &str) -> Option<&str> {
    self.vars.get(key).map(String::as_str)
  }

  /// Variables other than PATH, which composes separately.
  pub fn vars(&self) -> impl Iterator<Item = (&str, &str)> {
    self
      .vars
      .iter()
      .filter(|(k, _)| k.as_str() != "PATH")
      .map(|(k, v)| (k.as_str(), v.as_str()))
  }

  /// Compose the final PATH: prepends first, then an explicitly set PATH
  /// variable or the given fallback.
  pub fn merged_path(&self, fallback: Option<&str>) -> Option<String> {
    let base = self.vars.get("PATH").map(String::as_str).or(fallback);
    if self.path_prepend.is_empty() {
      return base.map(str::to_owned);
    }

    let mut entries: Vec<PathBuf> = self.path_prepend.clone();
    if let Some(base) = base {
      entries.extend(std::env::split_paths(base));
    }
    std::env::join_paths(entries)
      .ok()
      .map(|joined| joined.to_string_lossy().into_owned())
  }

  /// True when the overlay would change nothing.
  pub fn is_empty(&self) -> bool {
    self.vars.is_empty() && self.path_prepend.is_empty()
  }

  /// True when `dir` is among the PATH prepends.
  pub fn has_path_entry(&self, dir: &Path) -> bool {
    self.path_prepend.iter().any(|p| p == dir)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn last_write_wins() {
    let mut env = EnvOverlay::new();
    env.set("KEY", "first");
    env.set("KEY", "second");
    assert_eq!(env.get("KEY"), Some("second"));
  }

  #[test]
  fn merged_path_puts_recent_prepends_first() {
    let mut env = EnvOverlay::new();
    env.prepend_path("/tools/node/bin");
    env.prepend_path("/tools/jdk/bin");

    let path = env.merged_path(Some("/usr/bin")).unwrap();
    assert_eq!(path, "/tools/jdk/bin:/tools/node/bin:/usr/bin");
  }

  #[test]
  fn merged_path_without_prepends_is_the_fallback() {
    let env = EnvOverlay::new();
    assert_eq!(env.merged_path(Some("/usr/bin")).as_deref(), Some("/usr/bin"));
    assert_eq!(env.merged_path(None), None);
  }

  #[test]
  fn explicit_path_var_overrides_fallback() {
    let mut env = EnvOverlay::new();
    env.set("PATH", "/custom");
    env.prepend_path("/tools/bin");

    let path = env.merged_path(Some("/usr/bin")).unwrap();
    assert_eq!(path, "/tools/bin:/custom");
  }

  #[test]
  fn vars_iterator_skips_path() {
    let mut env = EnvOverlay::new();
    env.set("PATH", "/custom");
    env.set("JAVA_HOME", "/tools/jdk");

    let vars: Vec<_> = env.vars().collect();
    assert_eq!(vars, vec![("JAVA_HOME", "/tools/jdk")]);
  }
}
