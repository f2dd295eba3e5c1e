//! Containerized execution.
//!
//! A container biome owns one running container for the duration of a
//! target's execution. Commands run as exec sessions inside it; closing
//! the biome stops and removes the container. Containers cannot inherit
//! the host PATH, so PATH composes over a fixed default instead.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::docker::{CONTAINER_WORK_DIR, DockerManager};

use super::env::EnvOverlay;
use super::{BiomeError, Invocation};

/// Base PATH inside a container when the image sets nothing else.
const DEFAULT_CONTAINER_PATH: &str = "/usr/local/sbin:/usr/local/bin:/usr/sbin:/usr/bin:/sbin:/bin";

/// A biome that runs commands inside a running container.
#[derive(Debug)]
pub struct ContainerBiome {
  manager: DockerManager,
  container_id: String,
  container_name: String,
  work_dir: PathBuf,
  env: EnvOverlay,
  closed: bool,
}

impl ContainerBiome {
  /// Wrap an already-started container.
  pub fn new(manager: DockerManager, container_id: String, container_name: String, env: EnvOverlay) -> Self {
    Self {
      manager,
      container_id,
      container_name,
      work_dir: PathBuf::from(CONTAINER_WORK_DIR),
      env,
      closed: false,
    }
  }

  pub fn container_id(&self) -> &str {
    &self.container_id
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
    debug!(command = %invocation, container = %self.container_name, "running container command");

    let mut env: Vec<String> = self.env.vars().map(|(k, v)| format!("{k}={v}")).collect();
    if let Some(path) = self.env.merged_path(Some(DEFAULT_CONTAINER_PATH)) {
      env.push(format!("PATH={path}"));
    }

    let code = self.manager.exec(&self.container_id, &invocation.argv, &env).await?;
    if code != 0 {
      return Err(BiomeError::CommandFailed {
        command: invocation.to_string(),
        code: Some(code as i32),
      });
    }
    Ok(())
  }

  /// Stop and remove the container. A second close is a no-op.
  pub(super) async fn close(&mut self) -> Result<(), BiomeError> {
    if self.closed {
      return Ok(());
    }
    self.closed = true;
    self.manager.stop_and_remove(&self.container_id).await?;
    Ok(())
  }
}

impl Drop for ContainerBiome {
  fn drop(&mut self) {
    if !self.closed {
      // Removal needs the async manager, so an unclosed drop can only
      // report the leak.
      warn!(
        container = %self.container_name,
        id = %self.container_id,
        "container biome dropped without close; container left running"
      );
    }
  }
}
