//! arbor-lib: the arbor build orchestration engine
//!
//! This crate provides the pieces the `arbor` CLI is assembled from:
//! - `manifest`: the package manifest, build targets, and dependency ordering
//! - `biome`: the execution-environment abstraction (host, container, decorator)
//! - `docker`: container, image, and network lifecycle management
//! - `buildpack`: toolchain installers sharing one install/setup contract
//! - `phase`: the per-target install and execute phases
//! - `driver`: top-level build sequencing with guaranteed teardown
//! - `trace`: the span sink used to time and render a build

pub mod biome;
pub mod buildpack;
pub mod docker;
pub mod download;
pub mod driver;
pub mod manifest;
pub mod paths;
pub mod phase;
pub mod trace;
