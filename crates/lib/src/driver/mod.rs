//! Top-level build sequencing.
//!
//! The driver resolves the build order, provisions the shared Docker
//! network when any target wants a container, then walks the targets in
//! order: build a biome, run setup, optionally run the build commands,
//! and close the biome on every exit path. The first failure stops the
//! walk; targets already built stay built. The network, if created, is
//! removed exactly once after the walk no matter how it ended. Cleanup
//! failures never mask an earlier error.

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::biome::{Biome, BiomeError, ContainerBiome, EnvOverlay, HostBiome};
use crate::docker::{DockerError, DockerManager, container_name};
use crate::manifest::{GraphError, Package, Target};
use crate::paths::DataDirs;
use crate::phase::{self, PhaseError};
use crate::trace::TraceSink;

/// Options for one build invocation.
#[derive(Debug, Clone)]
pub struct BuildOptions {
  /// Target to build.
  pub target: String,

  /// Force host biomes even for targets that request a container.
  pub no_container: bool,

  /// Run the install phase only, skipping build commands.
  pub setup_only: bool,

  /// Tokens prepended to every executed command.
  pub exec_prefix: Vec<String>,
}

impl BuildOptions {
  pub fn new(target: impl Into<String>) -> Self {
    Self {
      target: target.into(),
      no_container: false,
      setup_only: false,
      exec_prefix: Vec::new(),
    }
  }
}

#[derive(Debug, Error)]
pub enum DriverError {
  /// The build order could not be resolved.
  #[error(transparent)]
  Graph(#[from] GraphError),

  /// The Docker daemon or shared network failed outside any one target.
  #[error("docker: {0}")]
  Docker(#[from] DockerError),

  /// The package working directories could not be prepared.
  #[error("failed to prepare build directories: {0}")]
  Prepare(#[source] std::io::Error),

  /// A target failed; earlier targets' results stand.
  #[error("target '{target}': {source}")]
  Target {
    target: String,
    #[source]
    source: TargetError,
  },
}

/// Why a single target failed.
#[derive(Debug, Error)]
pub enum TargetError {
  #[error(transparent)]
  Docker(#[from] DockerError),

  #[error(transparent)]
  Phase(#[from] PhaseError),

  #[error(transparent)]
  Biome(#[from] BiomeError),
}

/// Build `opts.target` and everything it depends on.
pub async fn run_build(
  package: &Package,
  dirs: &DataDirs,
  opts: &BuildOptions,
  sink: &TraceSink,
) -> Result<(), DriverError> {
  // Pure resolution first: nothing below runs for a bad manifest.
  let order = package.manifest.build_order(&opts.target)?;

  info!("going to build targets in the following order:");
  for target in &order {
    info!("   - {}", target.name);
  }

  prepare_package_dirs(package, dirs)?;

  let wants_container = !opts.no_container && order.iter().any(|t| t.container.is_some());
  let docker = if wants_container {
    Some(DockerManager::connect()?)
  } else {
    None
  };
  let network_id = match &docker {
    Some(manager) => Some(manager.create_network().await?),
    None => None,
  };

  let client = reqwest::Client::new();
  let root = sink.open(None, "Build");
  let root_id = root.id();

  let mut result = Ok(());
  for target in &order {
    let span = sink.open(Some(root_id), &target.name);
    let outcome = run_target(
      package,
      target,
      dirs,
      docker.as_ref(),
      network_id.as_deref(),
      opts,
      &client,
    )
    .await;
    sink.finish(span);

    if let Err(source) = outcome {
      result = Err(DriverError::Target {
        target: target.name.clone(),
        source,
      });
      break;
    }
  }
  sink.finish(root);

  // The network outlives every target and comes down exactly once,
  // success or failure.
  if let (Some(manager), Some(id)) = (&docker, &network_id) {
    if let Err(err) = manager.remove_network(id).await {
      if result.is_ok() {
        result = Err(err.into());
      } else {
        warn!(network = %id, error = %err, "failed to remove build network");
      }
    }
  }

  result
}

/// Run one target: biome, setup, execute, close. The biome closes on
/// every path out of this function, and a close failure surfaces only
/// when nothing else already failed.
async fn run_target(
  package: &Package,
  target: &Target,
  dirs: &DataDirs,
  docker: Option<&DockerManager>,
  network_id: Option<&str>,
  opts: &BuildOptions,
  client: &reqwest::Client,
) -> Result<(), TargetError> {
  let mut biome = make_biome(package, target, dirs, docker, network_id).await?;

  let mut result = phase::setup(package, target, &mut biome, dirs, client)
    .await
    .map_err(TargetError::from);

  if result.is_ok() && !opts.exec_prefix.is_empty() {
    biome = Biome::exec_prefix(biome, opts.exec_prefix.clone());
  }

  if result.is_ok() && !opts.setup_only {
    info!(" -- build target: {} --", target.name);
    result = phase::execute(target, &biome).await.map_err(TargetError::from);
  }

  if let Err(close_err) = biome.close().await {
    if result.is_ok() {
      result = Err(close_err.into());
    } else {
      warn!(target = %target.name, error = %close_err, "failed to clean up biome");
    }
  }

  result
}

/// Build the execution environment for one target.
async fn make_biome(
  package: &Package,
  target: &Target,
  dirs: &DataDirs,
  docker: Option<&DockerManager>,
  network_id: Option<&str>,
) -> Result<Biome, TargetError> {
  match (&target.container, docker, network_id) {
    (Some(definition), Some(manager), Some(network_id)) => {
      manager.ensure_image(&definition.image).await?;

      let name = container_name(&package.name, &definition.image);
      let container = match manager.find_container(&name).await? {
        Some(existing) => {
          debug!(container = %existing.name, id = %existing.id, "reusing container");
          existing
        }
        None => {
          manager
            .create_container(
              &package.name,
              definition,
              network_id,
              &dirs.package_build_dir(&package.name),
              &package.path,
            )
            .await?
        }
      };
      manager.start_container(&container.id).await?;

      let mut env = EnvOverlay::new();
      for (key, value) in &definition.env {
        env.set(key, value);
      }
      Ok(Biome::Container(ContainerBiome::new(
        manager.clone(),
        container.id,
        container.name,
        env,
      )))
    }
    _ => Ok(Biome::Host(HostBiome::new(
      package.path.clone(),
      EnvOverlay::new(),
    ))),
  }
}

fn prepare_package_dirs(package: &Package, dirs: &DataDirs) -> Result<(), DriverError> {
  std::fs::create_dir_all(dirs.package_build_dir(&package.name)).map_err(DriverError::Prepare)?;
  std::fs::create_dir_all(dirs.package_log_dir(&package.name)).map_err(DriverError::Prepare)?;
  Ok(())
}
