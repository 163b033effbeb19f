/// Execution control: stage orchestration and signal forwarding
pub mod executor;
pub mod signal;

pub use executor::{ExecOptions, ExecState, Executor};
