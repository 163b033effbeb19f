//! runbox: compile-and-run developer utility with project presets
//!
//! Takes source files, resolves the responsible language toolchain, and
//! drives the compile/run pipeline with automatic artifact cleanup.
//!
//! # Architecture
//!
//! The crate is organized along the resolution-and-execution pipeline:
//!
//! ## Resolution
//! - [`registry`]: built-in language table and custom-language merging
//! - [`config`]: `Run.toml` discovery, parsing, and validation
//! - [`classify`]: input files → language, link units, primary unit
//! - [`venv`]: project-local Python interpreter discovery
//!
//! ## Planning
//! - [`command`]: preset/flag resolution and stage assembly
//! - [`types`]: shared data model, error taxonomy, exit-code contract
//!
//! ## Execution
//! - [`exec::executor`]: stage orchestration state machine
//! - [`exec::signal`]: interrupt forwarding to the live child
//! - [`artifact`]: produced-binary tracking and cleanup
//!
//! ## Ambient
//! - [`security`]: privilege gate and child environment hygiene
//! - [`audit`]: per-invocation session log entries
//! - [`cli`]: argument surface and pipeline wiring

pub mod artifact;
pub mod audit;
pub mod classify;
pub mod cli;
pub mod command;
pub mod config;
pub mod exec;
pub mod registry;
pub mod security;
pub mod types;
pub mod venv;

pub use config::ProjectConfig;
pub use exec::{ExecOptions, Executor};
pub use registry::Registry;
pub use types::{ExecutionReport, Invocation, Result, RunError};
