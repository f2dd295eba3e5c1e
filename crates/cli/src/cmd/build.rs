//! Implementation of the `arbor build` command.
//!
//! Loads the package in the current directory, runs the build driver, and
//! prints the span table whether the build succeeded or failed, so timing
//! information survives a broken build.

use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use owo_colors::{OwoColorize, Stream};
use tracing::debug;

use arbor_lib::driver::{BuildOptions, DriverError, run_build};
use arbor_lib::manifest::{GraphError, Package};
use arbor_lib::paths::DataDirs;
use arbor_lib::trace::TraceSink;

/// Target built when none is named on the command line.
const DEFAULT_TARGET: &str = "default";

pub fn cmd_build(
  target: Option<String>,
  no_container: bool,
  deps_only: bool,
  exec_prefix: Option<String>,
) -> Result<()> {
  let started = Instant::now();

  let cwd = std::env::current_dir().context("cannot determine the current directory")?;
  let package = Package::load(&cwd).context("failed to load package")?;
  let dirs = DataDirs::resolve().context("failed to resolve data directories")?;
  debug!(
    cache_root = %dirs.cache_root().display(),
    build_root = %dirs.build_root().display(),
    "resolved data directories"
  );

  let opts = BuildOptions {
    target: target.unwrap_or_else(|| DEFAULT_TARGET.to_string()),
    no_container,
    setup_only: deps_only,
    exec_prefix: exec_prefix
      .map(|raw| raw.split_whitespace().map(str::to_string).collect())
      .unwrap_or_default(),
  };

  println!(
    "{} Building target {} in package {}",
    "::".if_supports_color(Stream::Stdout, |t| t.cyan()),
    opts.target,
    package.name
  );

  // Show the order up front; resolution errors surface from the driver.
  if let Ok(order) = package.manifest.build_order(&opts.target) {
    println!(
      "{} Going to build targets in the following order:",
      "::".if_supports_color(Stream::Stdout, |t| t.cyan())
    );
    for target in &order {
      println!("   - {}", target.name);
    }
  }

  let sink = TraceSink::new();
  let runtime = tokio::runtime::Runtime::new().context("failed to create async runtime")?;
  let result = runtime.block_on(run_build(&package, &dirs, &opts, &sink));

  let elapsed = humantime::format_duration(Duration::from_secs(started.elapsed().as_secs()));

  println!();
  print!("{}", sink.render());
  println!();

  match result {
    Ok(()) => {
      println!(
        "{} BUILD SUCCEEDED in {}",
        "✓".if_supports_color(Stream::Stdout, |t| t.green()),
        elapsed
      );
      Ok(())
    }
    Err(err) => {
      eprintln!(
        "{} BUILD FAILED in {}",
        "✗".if_supports_color(Stream::Stderr, |t| t.red()),
        elapsed
      );
      if let DriverError::Graph(GraphError::UnknownTarget(_)) = &err {
        eprintln!("Valid build targets: {}", package.manifest.target_names().join(", "));
      }
      Err(err.into())
    }
  }
}
