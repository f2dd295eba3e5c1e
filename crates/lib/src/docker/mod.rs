//! Container, image, and network lifecycle management.
//!
//! [`DockerManager`] wraps the Docker API for the handful of operations a
//! build needs: discovering a container by its deterministic name, making
//! sure an image is present locally, creating a container with the
//! package workspace bind-mounted at `/build`, starting it, exec'ing
//! commands inside it, and tearing everything down.
//!
//! Container names are a pure function of the package name and the image
//! base name, so re-running a build rediscovers the container it created
//! last time instead of stacking duplicates. Discovery and creation are
//! deliberately separate operations; callers check `find_container` before
//! `create_container`.
//!
//! Lifecycle per target: absent, created, running, exec'd into zero or
//! more times, then stopped and removed when the owning biome closes.

use std::collections::HashMap;
use std::io::Write;
use std::path::Path;

use bollard::Docker;
use bollard::container::{
  Config, CreateContainerOptions, ListContainersOptions, LogOutput, RemoveContainerOptions,
  StartContainerOptions, StopContainerOptions,
};
use bollard::exec::{CreateExecOptions, StartExecResults};
use bollard::image::{CreateImageOptions, ListImagesOptions};
use bollard::models::HostConfig;
use bollard::network::CreateNetworkOptions;
use futures_util::StreamExt;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::manifest::ContainerDefinition;

/// Where the package workspace is always mounted inside a container.
pub const CONTAINER_WORK_DIR: &str = "/build";

/// Idle command keeping a build container alive between execs.
const IDLE_COMMAND: &[&str] = &["tail", "-f", "/dev/null"];

#[derive(Debug, Error)]
pub enum DockerError {
  /// The Docker daemon could not be reached or an API call failed.
  #[error("docker api error: {0}")]
  Api(#[from] bollard::errors::Error),

  /// Pulling an image from the registry failed.
  #[error("failed to pull image '{image}': {source}")]
  Pull {
    image: String,
    #[source]
    source: bollard::errors::Error,
  },

  /// A mount spec was not of the form `host:container`.
  #[error("malformed mount spec '{0}' (expected <host-relative>:<container-absolute>)")]
  MalformedMount(String),

  /// The container side of a mount spec must be absolute.
  #[error("mount target '{0}' must be an absolute container path")]
  RelativeMountTarget(String),

  /// A host mount directory could not be created.
  #[error("failed to create mount directory '{path}': {source}")]
  CreateMountDir {
    path: String,
    #[source]
    source: std::io::Error,
  },
}

/// A created container, identified by id and deterministic name.
#[derive(Debug, Clone)]
pub struct BuildContainer {
  pub id: String,
  pub name: String,
}

/// Deterministic container name for a package and image.
///
/// Only the image's base name participates, so `node:18` and `node:20`
/// map to the same container for a given package.
pub fn container_name(package: &str, image: &str) -> String {
  format!("{}-{}", package, image_base_name(image))
}

/// The last path segment of an image reference, without the tag.
fn image_base_name(image: &str) -> &str {
  let last_segment = image.rsplit('/').next().unwrap_or(image);
  last_segment.split(':').next().unwrap_or(last_segment)
}

/// Parse a mount spec into its host-relative and container-absolute halves.
fn parse_mount(spec: &str) -> Result<(&str, &str), DockerError> {
  let (host, container) = spec
    .split_once(':')
    .ok_or_else(|| DockerError::MalformedMount(spec.to_string()))?;
  if host.is_empty() || container.is_empty() {
    return Err(DockerError::MalformedMount(spec.to_string()));
  }
  if !container.starts_with('/') {
    return Err(DockerError::RelativeMountTarget(container.to_string()));
  }
  Ok((host, container))
}

/// Translate mount specs into bind strings, rooting host sides under the
/// package working directory and appending the mandatory workspace bind.
fn translate_mounts(
  mounts: &[String],
  package_work_dir: &Path,
  package_dir: &Path,
) -> Result<Vec<String>, DockerError> {
  let mut binds = Vec::with_capacity(mounts.len() + 1);
  for spec in mounts {
    let (host_rel, container_abs) = parse_mount(spec)?;
    let host = package_work_dir.join(host_rel);
    binds.push(format!("{}:{}", host.display(), container_abs));
  }
  binds.push(format!("{}:{}", package_dir.display(), CONTAINER_WORK_DIR));
  Ok(binds)
}

/// Handle to the Docker daemon, cheap to clone.
#[derive(Clone)]
pub struct DockerManager {
  docker: Docker,
}

impl std::fmt::Debug for DockerManager {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("DockerManager").finish_non_exhaustive()
  }
}

impl DockerManager {
  /// Connect using the local daemon defaults (socket or env).
  pub fn connect() -> Result<Self, DockerError> {
    let docker = Docker::connect_with_local_defaults()?;
    Ok(Self { docker })
  }

  /// Find a container by its deterministic name.
  ///
  /// Names are deterministic, so more than one match means stale state
  /// from an earlier crashed run; the first match is reused and the rest
  /// are reported.
  pub async fn find_container(&self, name: &str) -> Result<Option<BuildContainer>, DockerError> {
    let mut filters = HashMap::new();
    filters.insert("name".to_string(), vec![name.to_string()]);

    let containers = self
      .docker
      .list_containers(Some(ListContainersOptions {
        all: true,
        filters,
        ..Default::default()
      }))
      .await?;

    let mut ids = containers.into_iter().filter_map(|c| c.id);
    let Some(first) = ids.next() else {
      return Ok(None);
    };
    let stale: Vec<String> = ids.collect();
    if !stale.is_empty() {
      warn!(name, ?stale, "multiple containers match; reusing the first");
    }

    debug!(name, id = %first, "found existing container");
    Ok(Some(BuildContainer {
      id: first,
      name: name.to_string(),
    }))
  }

  /// Make sure `image` is available locally, pulling it if absent.
  pub async fn ensure_image(&self, image: &str) -> Result<(), DockerError> {
    let mut filters = HashMap::new();
    filters.insert("reference".to_string(), vec![image.to_string()]);

    let present = self
      .docker
      .list_images(Some(ListImagesOptions {
        filters,
        ..Default::default()
      }))
      .await?;
    if !present.is_empty() {
      debug!(image, "image already present");
      return Ok(());
    }

    info!(image, "pulling image");
    let mut pull = self.docker.create_image(
      Some(CreateImageOptions {
        from_image: image.to_string(),
        ..Default::default()
      }),
      None,
      None,
    );
    while let Some(progress) = pull.next().await {
      let progress = progress.map_err(|source| DockerError::Pull {
        image: image.to_string(),
        source,
      })?;
      if let Some(status) = progress.status {
        debug!(image, %status, "pull progress");
      }
    }
    Ok(())
  }

  /// Create a container for `definition`, bound to `network_id`.
  ///
  /// Host mount directories are created under the package working
  /// directory; the package source directory is always bound at
  /// [`CONTAINER_WORK_DIR`]. The container runs an idle command so it can
  /// be exec'd into repeatedly. Creation is not idempotent here; pair it
  /// with [`DockerManager::find_container`].
  pub async fn create_container(
    &self,
    package: &str,
    definition: &ContainerDefinition,
    network_id: &str,
    package_work_dir: &Path,
    package_dir: &Path,
  ) -> Result<BuildContainer, DockerError> {
    let name = container_name(package, &definition.image);
    info!(container = %name, image = %definition.image, "creating container");

    for spec in &definition.mounts {
      let (host_rel, _) = parse_mount(spec)?;
      let host = package_work_dir.join(host_rel);
      std::fs::create_dir_all(&host).map_err(|source| DockerError::CreateMountDir {
        path: host.display().to_string(),
        source,
      })?;
    }
    let binds = translate_mounts(&definition.mounts, package_work_dir, package_dir)?;

    let exposed_ports = if definition.ports.is_empty() {
      None
    } else {
      Some(
        definition
          .ports
          .iter()
          .map(|p| {
            let key = if p.contains('/') { p.clone() } else { format!("{p}/tcp") };
            (key, HashMap::new())
          })
          .collect::<HashMap<String, HashMap<(), ()>>>(),
      )
    };

    let env: Vec<String> = definition.env.iter().map(|(k, v)| format!("{k}={v}")).collect();

    let config = Config {
      image: Some(definition.image.clone()),
      cmd: Some(IDLE_COMMAND.iter().map(|s| s.to_string()).collect()),
      env: if env.is_empty() { None } else { Some(env) },
      working_dir: Some(CONTAINER_WORK_DIR.to_string()),
      exposed_ports,
      host_config: Some(HostConfig {
        binds: Some(binds),
        network_mode: Some(network_id.to_string()),
        ..Default::default()
      }),
      ..Default::default()
    };

    let created = self
      .docker
      .create_container(
        Some(CreateContainerOptions {
          name: name.clone(),
          ..Default::default()
        }),
        config,
      )
      .await?;

    debug!(container = %name, id = %created.id, "container created");
    Ok(BuildContainer { id: created.id, name })
  }

  pub async fn start_container(&self, id: &str) -> Result<(), DockerError> {
    self
      .docker
      .start_container(id, None::<StartContainerOptions<String>>)
      .await?;
    Ok(())
  }

  /// Run one command inside a running container, streaming output to the
  /// process stdio, and return its exit code. Exec sessions are one-shot.
  pub async fn exec(&self, id: &str, argv: &[String], env: &[String]) -> Result<i64, DockerError> {
    let exec = self
      .docker
      .create_exec(
        id,
        CreateExecOptions {
          cmd: Some(argv.to_vec()),
          env: if env.is_empty() { None } else { Some(env.to_vec()) },
          attach_stdout: Some(true),
          attach_stderr: Some(true),
          working_dir: Some(CONTAINER_WORK_DIR.to_string()),
          ..Default::default()
        },
      )
      .await?;

    if let StartExecResults::Attached { mut output, .. } = self.docker.start_exec(&exec.id, None).await? {
      while let Some(chunk) = output.next().await {
        match chunk? {
          LogOutput::StdErr { message } => {
            let mut stderr = std::io::stderr().lock();
            let _ = stderr.write_all(&message);
          }
          other => {
            let mut stdout = std::io::stdout().lock();
            let _ = stdout.write_all(&other.into_bytes());
          }
        }
      }
    }

    let inspected = self.docker.inspect_exec(&exec.id).await?;
    Ok(inspected.exit_code.unwrap_or(0))
  }

  /// Stop and remove a container. Used by container biomes on close.
  pub async fn stop_and_remove(&self, id: &str) -> Result<(), DockerError> {
    debug!(id, "stopping container");
    self.docker.stop_container(id, Some(StopContainerOptions { t: 10 })).await?;
    self
      .docker
      .remove_container(
        id,
        Some(RemoveContainerOptions {
          force: true,
          ..Default::default()
        }),
      )
      .await?;
    Ok(())
  }

  /// Create the per-invocation network and return its identifier.
  pub async fn create_network(&self) -> Result<String, DockerError> {
    let name = format!(
      "arbor-{}-{}",
      std::process::id(),
      chrono::Local::now().timestamp_millis()
    );
    info!(network = %name, "creating build network");
    let response = self
      .docker
      .create_network(CreateNetworkOptions {
        name: name.clone(),
        ..Default::default()
      })
      .await?;
    debug!(network = %name, ?response, "network created");
    Ok(name)
  }

  /// Remove the per-invocation network. Called exactly once per build.
  pub async fn remove_network(&self, id: &str) -> Result<(), DockerError> {
    info!(network = %id, "removing build network");
    self.docker.remove_network(id).await?;
    Ok(())
  }
}
