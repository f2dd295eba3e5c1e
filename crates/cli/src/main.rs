//! arbor: build targets from a package manifest.

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod cmd;

#[derive(Parser)]
#[command(name = "arbor")]
#[command(author, version, about = "A build orchestrator", long_about = None)]
struct Cli {
  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Build a target and everything it depends on.
  ///
  /// With no argument, builds the target named "default".
  Build {
    /// Target to build.
    target: Option<String>,

    /// Avoid Docker; run every target on the host.
    #[arg(long)]
    no_container: bool,

    /// Install build tools only, skip the build commands.
    #[arg(long)]
    deps_only: bool,

    /// Whitespace-separated tokens prepended to every executed command
    /// (useful for timing or wrapping things).
    #[arg(long, value_name = "PREFIX")]
    exec_prefix: Option<String>,
  },
}

fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::from_default_env())
    .without_time()
    .init();

  let cli = Cli::parse();

  match cli.command {
    Commands::Build {
      target,
      no_container,
      deps_only,
      exec_prefix,
    } => cmd::cmd_build(target, no_container, deps_only, exec_prefix),
  }
}
