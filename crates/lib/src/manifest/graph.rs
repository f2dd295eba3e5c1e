//! Target dependency ordering.
//!
//! Build order is computed with a depth-first post-order walk from the
//! requested target: dependencies emit before their dependents, shared
//! dependencies emit once, the requested target emits last. The walk is a
//! pure function of the manifest; nothing happens to the outside world
//! before it succeeds.

use thiserror::Error;

use super::types::{Manifest, Target};

#[derive(Debug, Error)]
pub enum GraphError {
  /// The requested or referenced target is not defined in the manifest.
  #[error("target '{0}' is not defined in the manifest")]
  UnknownTarget(String),

  /// A target transitively depends on itself.
  #[error("dependency cycle detected: {}", .cycle.join(" -> "))]
  DependencyCycle { cycle: Vec<String> },
}

/// Compute the build order for `name`.
pub fn build_order<'a>(manifest: &'a Manifest, name: &str) -> Result<Vec<&'a Target>, GraphError> {
  let mut walk = Walk {
    manifest,
    order: Vec::new(),
    stack: Vec::new(),
  };
  walk.visit(name)?;
  Ok(walk.order)
}

struct Walk<'a> {
  manifest: &'a Manifest,
  order: Vec<&'a Target>,
  // Names on the current descent path, for cycle reporting.
  stack: Vec<String>,
}

impl<'a> Walk<'a> {
  fn visit(&mut self, name: &str) -> Result<(), GraphError> {
    if self.order.iter().any(|t| t.name == name) {
      // Already fully resolved through another ancestor.
      return Ok(());
    }
    if let Some(pos) = self.stack.iter().position(|n| n == name) {
      let mut cycle: Vec<String> = self.stack[pos..].to_vec();
      cycle.push(name.to_string());
      return Err(GraphError::DependencyCycle { cycle });
    }

    let target = self
      .manifest
      .target(name)
      .ok_or_else(|| GraphError::UnknownTarget(name.to_string()))?;

    self.stack.push(name.to_string());
    for dep in &target.dependencies {
      self.visit(dep)?;
    }
    self.stack.pop();

    self.order.push(target);
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn manifest(targets: &[(&str, &[&str])]) -> Manifest {
    Manifest {
      package: None,
      targets: targets
        .iter()
        .map(|(name, deps)| Target {
          name: name.to_string(),
          dependencies: deps.iter().map(|d| d.to_string()).collect(),
          tools: Vec::new(),
          commands: Vec::new(),
          container: None,
        })
        .collect(),
    }
  }

  fn names(order: &[&Target]) -> Vec<String> {
    order.iter().map(|t| t.name.clone()).collect()
  }

  #[test]
  fn single_target() {
    let m = manifest(&[("default", &[])]);
    let order = build_order(&m, "default").unwrap();
    assert_eq!(names(&order), vec!["default"]);
  }

  #[test]
  fn linear_chain_emits_dependencies_first() {
    let m = manifest(&[("c", &["b"]), ("b", &["a"]), ("a", &[])]);
    let order = build_order(&m, "c").unwrap();
    assert_eq!(names(&order), vec!["a", "b", "c"]);
  }

  #[test]
  fn diamond_emits_shared_dependency_once() {
    //     a
    //    / \
    //   b   c
    //    \ /
    //     d
    let m = manifest(&[("d", &["b", "c"]), ("b", &["a"]), ("c", &["a"]), ("a", &[])]);
    let order = build_order(&m, "d").unwrap();

    assert_eq!(names(&order), vec!["a", "b", "c", "d"]);
  }

  #[test]
  fn unrelated_targets_are_not_included() {
    let m = manifest(&[("a", &[]), ("b", &["a"]), ("other", &[])]);
    let order = build_order(&m, "b").unwrap();
    assert_eq!(names(&order), vec!["a", "b"]);
  }

  #[test]
  fn unknown_root_target() {
    let m = manifest(&[("a", &[])]);
    let err = build_order(&m, "nope").unwrap_err();
    assert!(matches!(err, GraphError::UnknownTarget(name) if name == "nope"));
  }

  #[test]
  fn unknown_dependency() {
    let m = manifest(&[("a", &["ghost"])]);
    let err = build_order(&m, "a").unwrap_err();
    assert!(matches!(err, GraphError::UnknownTarget(name) if name == "ghost"));
  }

  #[test]
  fn cycle_is_named_in_the_error() {
    let m = manifest(&[("a", &["b"]), ("b", &["c"]), ("c", &["a"])]);
    let err = build_order(&m, "a").unwrap_err();

    match err {
      GraphError::DependencyCycle { cycle } => {
        assert_eq!(cycle, vec!["a", "b", "c", "a"]);
      }
      other => panic!("expected cycle error, got {other:?}"),
    }
  }

  #[test]
  fn self_cycle() {
    let m = manifest(&[("a", &["a"])]);
    let err = build_order(&m, "a").unwrap_err();
    assert!(matches!(err, GraphError::DependencyCycle { cycle } if cycle == vec!["a", "a"]));
  }

  #[test]
  fn cycle_error_message_names_the_path() {
    let m = manifest(&[("a", &["b"]), ("b", &["a"])]);
    let err = build_order(&m, "a").unwrap_err();
    assert_eq!(err.to_string(), "dependency cycle detected: a -> b -> a");
  }
}
