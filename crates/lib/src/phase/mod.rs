//! The per-target phases: install tools, then run build commands.
//!
//! `setup` materializes a target's declared build tools in order onto the
//! biome's environment overlay. `execute` runs the target's commands in
//! order against the composed biome. Both fail fast: the first tool or
//! command failure aborts the phase with the failing item named in the
//! error. Tool mutations applied before a failure stay on the biome so a
//! failed setup can be inspected.

use thiserror::Error;
use tracing::info;

use crate::biome::{Biome, BiomeError, Invocation};
use crate::buildpack::{BuildToolSpec, Buildpack, BuildpackError};
use crate::manifest::{Package, Target};
use crate::paths::DataDirs;

#[derive(Debug, Error)]
pub enum PhaseError {
  /// A build tool failed to parse, install, or set up.
  #[error("tool '{tool}': {source}")]
  Tool {
    tool: String,
    #[source]
    source: BuildpackError,
  },

  /// A build command failed.
  #[error("command '{command}': {source}")]
  Command {
    command: String,
    #[source]
    source: BiomeError,
  },
}

/// Install the target's build tools and compose them onto the biome.
///
/// Tools install sequentially in declared order; later tools may rely on
/// environment mutations from earlier ones.
pub async fn setup(
  package: &Package,
  target: &Target,
  biome: &mut Biome,
  dirs: &DataDirs,
  client: &reqwest::Client,
) -> Result<(), PhaseError> {
  for raw in &target.tools {
    let wrap = |source| PhaseError::Tool {
      tool: raw.clone(),
      source,
    };

    let spec = BuildToolSpec::parse(raw, dirs, &package.name, &package.path).map_err(wrap)?;
    let pack = Buildpack::for_spec(spec).map_err(wrap)?;

    info!(tool = %pack.tool(), version = %pack.version(), "setting up build tool");
    pack.install(client).await.map_err(wrap)?;
    pack.setup(biome.env_mut());
  }
  Ok(())
}

/// Run the target's build commands in declared order, halting on the
/// first failure. No retries.
pub async fn execute(target: &Target, biome: &Biome) -> Result<(), PhaseError> {
  for command in &target.commands {
    info!(%command, "running build command");
    biome
      .run(&Invocation::shell(command))
      .await
      .map_err(|source| PhaseError::Command {
        command: command.clone(),
        source,
      })?;
  }
  Ok(())
}
