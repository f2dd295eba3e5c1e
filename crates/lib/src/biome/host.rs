//! Host process execution.
//!
//! Commands run as direct subprocesses with the biome's working directory
//! and its overlay merged over the inherited process environment. Output
//! streams straight through to the caller's stdio.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::Command;
use tracing::debug;

use super::env::EnvOverlay;
use super::{BiomeError, Invocation};

/// A biome that runs commands directly on the host.
#[derive(Debug)]
pub struct HostBiome {
  work_dir: PathBuf,
  env: EnvOverlay,
}

impl HostBiome {
  pub fn new(work_dir: PathBuf, env: EnvOverlay) -> Self {
    Self { work_dir, env }
  }

  pub fn work_dir(&self) -> &Path {
    &self.work_dir
  }

  pub fn env(&self) -> &EnvOverlay {
    &self.env
  }

  pub fn env_mut(&mut self) -> &mut EnvOverlay {
    &mut self.env
  }

  pub(super) async fn run(&self, invocation: &Invocation) -> Result<(), BiomeError> {
    debug!(command = %invocation, work_dir = %self.work_dir.display(), "running host command");

    let mut command = Command::new(&invocation.argv[0]);
    command
      .args(&invocation.argv[1..])
      .current_dir(&self.work_dir)
      .stdout(Stdio::inherit())
      .stderr(Stdio::inherit());

    for (key, value) in self.env.vars() {
      command.env(key, value);
    }
    let inherited_path = std::env::var("PATH").ok();
    if let Some(path) = self.env.merged_path(inherited_path.as_deref()) {
      command.env("PATH", path);
    }

    let status = command.status().await?;
    if !status.success() {
      return Err(BiomeError::CommandFailed {
        command: invocation.to_string(),
        code: status.code(),
      });
    }
    Ok(())
  }

  /// Nothing to release on the host; kept for contract symmetry.
  pub(super) fn close(&mut self) -> Result<(), BiomeError> {
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::TempDir;

  fn biome(dir: &Path) -> HostBiome {
    HostBiome::new(dir.to_path_buf(), EnvOverlay::new())
  }

  #[tokio::test]
  async fn runs_in_the_working_directory() {
    let temp = TempDir::new().unwrap();
    let host = biome(temp.path());

    host.run(&Invocation::shell("touch cwd_marker")).await.unwrap();
    assert!(temp.path().join("cwd_marker").exists());
  }

  #[tokio::test]
  async fn overlay_variables_reach_the_command() {
    let temp = TempDir::new().unwrap();
    let mut host = biome(temp.path());
    host.env_mut().set("ARBOR_TEST_VALUE", "overlay");

    host
      .run(&Invocation::shell("printf %s \"$ARBOR_TEST_VALUE\" > var_out"))
      .await
      .unwrap();

    let out = std::fs::read_to_string(temp.path().join("var_out")).unwrap();
    assert_eq!(out, "overlay");
  }

  #[tokio::test]
  async fn path_prepend_wins_over_inherited_path() {
    let temp = TempDir::new().unwrap();
    let tool_dir = temp.path().join("toolbin");
    std::fs::create_dir(&tool_dir).unwrap();

    let mut host = biome(temp.path());
    host.env_mut().prepend_path(&tool_dir);

    host
      .run(&Invocation::shell("printf %s \"$PATH\" > path_out"))
      .await
      .unwrap();

    let path = std::fs::read_to_string(temp.path().join("path_out")).unwrap();
    assert!(path.starts_with(tool_dir.to_str().unwrap()), "PATH was {path}");
  }

  #[tokio::test]
  async fn nonzero_exit_reports_command_and_code() {
    let temp = TempDir::new().unwrap();
    let host = biome(temp.path());

    let err = host.run(&Invocation::shell("exit 3")).await.unwrap_err();
    match err {
      BiomeError::CommandFailed { command, code } => {
        assert!(command.contains("exit 3"));
        assert_eq!(code, Some(3));
      }
      other => panic!("expected CommandFailed, got {other:?}"),
    }
  }
}
