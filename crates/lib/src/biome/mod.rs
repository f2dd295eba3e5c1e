//! Execution environments.
//!
//! A [`Biome`] is where build commands run: directly on the host, inside a
//! running container, or through a decorator that prepends fixed argument
//! tokens to every command (for wrappers like `time -v`). All variants
//! share one contract: a working directory, an environment overlay, a
//! `run` capability, and an idempotent `close` that releases whatever the
//! biome holds.

mod container;
mod env;
mod host;

use std::path::Path;

pub use container::ContainerBiome;
pub use env::EnvOverlay;
pub use host::HostBiome;

use thiserror::Error;

use crate::docker::DockerError;

#[derive(Debug, Error)]
pub enum BiomeError {
  /// A command exited non-zero.
  #[error("command '{command}' failed with exit code {code:?}")]
  CommandFailed { command: String, code: Option<i32> },

  /// A command could not be spawned or waited on.
  #[error("io error: {0}")]
  Io(#[from] std::io::Error),

  /// The container layer failed.
  #[error(transparent)]
  Docker(#[from] DockerError),

  /// An invocation with no argv tokens.
  #[error("empty command")]
  EmptyCommand,
}

/// A command to run in a biome.
#[derive(Debug, Clone)]
pub struct Invocation {
  pub argv: Vec<String>,
}

impl Invocation {
  /// Run a shell command line through `/bin/sh -c`.
  pub fn shell(command: &str) -> Self {
    Self {
      argv: vec!["/bin/sh".to_string(), "-c".to_string(), command.to_string()],
    }
  }

  pub fn new(argv: Vec<String>) -> Self {
    Self { argv }
  }
}

impl std::fmt::Display for Invocation {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.argv.join(" "))
  }
}

/// An execution environment for one target.
#[derive(Debug)]
pub enum Biome {
  /// Direct subprocess execution on the host.
  Host(HostBiome),

  /// Exec inside a running container.
  Container(ContainerBiome),

  /// Wraps another biome, prepending fixed tokens to every command. The
  /// working directory, environment, and close behavior of the inner
  /// biome pass through unchanged.
  ExecPrefix { inner: Box<Biome>, argv: Vec<String> },
}

impl Biome {
  /// Wrap `inner` so every command runs as `argv... <command>`.
  pub fn exec_prefix(inner: Biome, argv: Vec<String>) -> Self {
    Biome::ExecPrefix {
      inner: Box::new(inner),
      argv,
    }
  }

  /// Run a command, streaming output to the process stdio. Non-zero exit
  /// is an error carrying the command and status.
  pub async fn run(&self, invocation: &Invocation) -> Result<(), BiomeError> {
    let (base, argv) = self.compose(invocation);
    if argv.is_empty() {
      return Err(BiomeError::EmptyCommand);
    }
    let composed = Invocation::new(argv);
    match base {
      Biome::Host(host) => host.run(&composed).await,
      Biome::Container(container) => container.run(&composed).await,
      // compose() only returns a non-decorator variant.
      Biome::ExecPrefix { .. } => unreachable!("prefix chain flattened by compose"),
    }
  }

  /// Flatten the decorator chain: outermost prefixes come first, then the
  /// original argv. Returns the base biome that will execute.
  fn compose<'a>(&'a self, invocation: &Invocation) -> (&'a Biome, Vec<String>) {
    let mut argv = Vec::new();
    let mut base = self;
    while let Biome::ExecPrefix { inner, argv: prefix } = base {
      argv.extend(prefix.iter().cloned());
      base = inner.as_ref();
    }
    argv.extend(invocation.argv.iter().cloned());
    (base, argv)
  }

  fn base(&self) -> &Biome {
    let mut base = self;
    while let Biome::ExecPrefix { inner, .. } = base {
      base = inner.as_ref();
    }
    base
  }

  fn base_mut(&mut self) -> &mut Biome {
    let mut base = self;
    loop {
      match base {
        Biome::ExecPrefix { inner, .. } => base = inner.as_mut(),
        other => return other,
      }
    }
  }

  /// The directory commands run in.
  pub fn work_dir(&self) -> &Path {
    match self.base() {
      Biome::Host(host) => host.work_dir(),
      Biome::Container(container) => container.work_dir(),
      Biome::ExecPrefix { .. } => unreachable!("base() never returns a decorator"),
    }
  }

  pub fn env(&self) -> &EnvOverlay {
    match self.base() {
      Biome::Host(host) => host.env(),
      Biome::Container(container) => container.env(),
      Biome::ExecPrefix { .. } => unreachable!("base() never returns a decorator"),
    }
  }

  /// The overlay mutated by tool setup.
  pub fn env_mut(&mut self) -> &mut EnvOverlay {
    match self.base_mut() {
      Biome::Host(host) => host.env_mut(),
      Biome::Container(container) => container.env_mut(),
      Biome::ExecPrefix { .. } => unreachable!("base_mut() never returns a decorator"),
    }
  }

  /// Release everything the biome holds. Idempotent: a second close is a
  /// no-op.
  pub async fn close(&mut self) -> Result<(), BiomeError> {
    match self.base_mut() {
      Biome::Host(host) => host.close(),
      Biome::Container(container) => container.close().await,
      Biome::ExecPrefix { .. } => unreachable!("base_mut() never returns a decorator"),
    }
  }
}
