//! Integration tests for `arbor build`.
//!
//! Every test isolates its cache and build roots inside a temp directory
//! and forces host execution, so nothing touches Docker or the network.

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use tempfile::TempDir;

/// A temp package directory with a manifest written into it.
struct TestPackage {
  temp: TempDir,
}

impl TestPackage {
  fn new(manifest: &str) -> Self {
    let temp = TempDir::new().unwrap();
    std::fs::write(temp.path().join(".arbor.yml"), manifest).unwrap();
    Self { temp }
  }

  fn arbor(&self) -> Command {
    let mut cmd = cargo_bin_cmd!("arbor");
    cmd
      .current_dir(self.temp.path())
      .env("ARBOR_CACHE_DIR", self.temp.path().join("cache"))
      .env("ARBOR_BUILD_ROOT", self.temp.path().join("build-root"));
    cmd
  }

  fn exists(&self, name: &str) -> bool {
    self.temp.path().join(name).exists()
  }
}

#[test]
fn builds_dependencies_before_the_target() {
  let pkg = TestPackage::new(
    r#"
package: demo
targets:
  - name: default
    dependencies: [first]
    commands: ["printf 2 >> order"]
  - name: first
    commands: ["printf 1 >> order"]
"#,
  );

  pkg
    .arbor()
    .args(["build", "--no-container"])
    .assert()
    .success()
    .stdout(predicate::str::contains("Going to build targets in the following order:"))
    .stdout(predicate::str::contains("BUILD SUCCEEDED"));

  let order = std::fs::read_to_string(pkg.temp.path().join("order")).unwrap();
  assert_eq!(order, "12");
}

#[test]
fn failing_target_stops_the_build() {
  let pkg = TestPackage::new(
    r#"
targets:
  - name: last
    dependencies: [broken]
    commands: ["touch last_ran"]
  - name: broken
    dependencies: [ok]
    commands: ["exit 1"]
  - name: ok
    commands: ["touch ok_ran"]
"#,
  );

  pkg
    .arbor()
    .args(["build", "--no-container", "last"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("BUILD FAILED"))
    .stderr(predicate::str::contains("broken"));

  assert!(pkg.exists("ok_ran"));
  assert!(!pkg.exists("last_ran"));
}

#[test]
fn unknown_target_lists_the_valid_ones() {
  let pkg = TestPackage::new(
    r#"
targets:
  - name: alpha
  - name: beta
"#,
  );

  pkg
    .arbor()
    .args(["build", "--no-container", "ghost"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("Valid build targets: alpha, beta"));
}

#[test]
fn deps_only_skips_build_commands() {
  let pkg = TestPackage::new(
    r#"
targets:
  - name: default
    commands: ["touch executed"]
"#,
  );

  pkg
    .arbor()
    .args(["build", "--no-container", "--deps-only"])
    .assert()
    .success();

  assert!(!pkg.exists("executed"));
}

#[test]
fn exec_prefix_still_runs_commands() {
  let pkg = TestPackage::new(
    r#"
targets:
  - name: default
    commands: ["touch prefixed"]
"#,
  );

  pkg
    .arbor()
    .args(["build", "--no-container", "--exec-prefix", "env"])
    .assert()
    .success();

  assert!(pkg.exists("prefixed"));
}

#[test]
fn span_table_prints_even_on_failure() {
  let pkg = TestPackage::new(
    r#"
targets:
  - name: default
    commands: ["exit 1"]
"#,
  );

  pkg
    .arbor()
    .args(["build", "--no-container"])
    .assert()
    .failure()
    .stdout(predicate::str::contains("Start"))
    .stdout(predicate::str::contains("Elapsed"));
}

#[test]
fn missing_manifest_fails() {
  let temp = TempDir::new().unwrap();
  let mut cmd = cargo_bin_cmd!("arbor");
  cmd
    .current_dir(temp.path())
    .args(["build", "--no-container"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("no manifest found"));
}

#[test]
fn help_flag_works() {
  cargo_bin_cmd!("arbor")
    .arg("--help")
    .assert()
    .success()
    .stdout(predicate::str::contains("Usage"));
}
