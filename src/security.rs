/// Privilege gate and child environment hygiene
use crate::types::{Result, RunError};
use nix::unistd::geteuid;

/// Variables never passed through to child processes.
const STRIPPED_ENV_VARS: &[&str] = &["LD_PRELOAD"];

/// Pre-flight gate, run before anything is classified or built:
/// compiling and running arbitrary code as root is blocked unless
/// `--unsafe` was supplied, in which case a warning is logged and the
/// pipeline proceeds.
pub fn check_privileges(allow_root: bool) -> Result<()> {
    if !geteuid().is_root() {
        return Ok(());
    }
    if allow_root {
        log::warn!(
            "running as root is dangerous for compiling/running arbitrary code; proceeding due to --unsafe"
        );
        return Ok(());
    }
    Err(RunError::Privilege)
}

/// The inherited environment with loader-hijack variables stripped.
pub fn sanitized_env() -> Vec<(String, String)> {
    std::env::vars()
        .filter(|(key, _)| !STRIPPED_ENV_VARS.contains(&key.as_str()))
        .collect()
}
