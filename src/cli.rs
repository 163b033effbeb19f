/// CLI entrypoint: argument surface and pipeline wiring
use crate::classify::{classify, ClassifyOptions};
use crate::command;
use crate::config::ProjectConfig;
use crate::exec::{signal, ExecOptions, Executor};
use crate::registry::{builtins, Registry};
use crate::audit::SessionLogger;
use crate::security;
use crate::types::{ExecutionReport, Result};
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "runbox",
    version,
    about = "Auto compile-and-run utility with project presets and custom language support"
)]
pub struct Cli {
    /// Files to compile and/or run
    pub files: Vec<String>,

    /// Keep the produced binary after the run
    #[arg(long)]
    pub keep: bool,

    /// Link multiple files into one artifact
    #[arg(short, long)]
    pub multi: bool,

    /// Report the run stage's wall time
    #[arg(short, long)]
    pub time: bool,

    /// Print the resolved commands without spawning anything
    #[arg(short = 'd', long = "dry-run")]
    pub dry_run: bool,

    /// Configuration preset (from Run.toml)
    #[arg(short, long)]
    pub preset: Option<String>,

    /// Auto-find link units in the working directory, optionally up to
    /// DEPTH directory levels (default: 1)
    #[arg(
        short = 'L',
        long = "link-auto",
        value_name = "DEPTH",
        num_args = 0..=1,
        default_missing_value = "1"
    )]
    pub link_auto: Option<usize>,

    /// Extra compiler flags, inserted after preset flags
    #[arg(short = 'f', long = "flags", default_value = "", allow_hyphen_values = true)]
    pub flags: String,

    /// Append every stage's command, exit code and output to the session log
    #[arg(long)]
    pub debug: bool,

    /// Allow running as root
    #[arg(long = "unsafe")]
    pub allow_unsafe: bool,

    /// Arguments forwarded to the executed program (after `--`)
    #[arg(last = true)]
    pub forwarded: Vec<String>,
}

/// Parse the command line, drive the pipeline, and return the process
/// exit code: 0 on success, the run child's code when it failed, or
/// the fixed taxonomy code of the error that aborted the pipeline.
pub fn run() -> i32 {
    signal::install_handlers();
    env_logger::init();

    let cli = Cli::parse();
    match pipeline(&cli) {
        Ok(report) => report.exit_code,
        Err(e) => {
            eprintln!("Error: {}", e);
            e.exit_code()
        }
    }
}

/// Config resolve → registry merge → classify → build → execute.
/// The privilege gate runs before anything is classified or built.
fn pipeline(cli: &Cli) -> Result<ExecutionReport> {
    security::check_privileges(cli.allow_unsafe)?;

    let cwd = std::env::current_dir()?;
    let install_dir = install_dir();
    let config = ProjectConfig::resolve(&cwd, install_dir.as_deref())?;
    let registry = Registry::merge(builtins(), &config)?;

    let invocation = if cli.files.is_empty()
        && cli.link_auto.is_none()
        && cwd.join("Cargo.toml").is_file()
    {
        log::info!("no files given, cargo project detected");
        for flag in cargo_ignored_flags(cli) {
            log::warn!("{} has no effect in cargo mode", flag);
        }
        command::cargo_invocation(&cli.flags, &cli.forwarded, &cwd)
    } else {
        let files: Vec<PathBuf> = cli.files.iter().map(PathBuf::from).collect();
        if cwd.join("Cargo.toml").is_file()
            && files.iter().any(|f| {
                f.extension().map(|e| e == "rs").unwrap_or(false)
            })
        {
            log::info!(
                "Cargo.toml present; compiling the file directly, invoke without files for cargo mode"
            );
        }
        let opts = ClassifyOptions {
            auto_find: cli.link_auto,
            multi: cli.multi,
        };
        let input = classify(&registry, &files, &opts, &cwd)?;
        command::build(
            &input,
            &config,
            &registry,
            cli.preset.as_deref(),
            &cli.flags,
            &cli.forwarded,
            &cwd,
        )?
    };

    let logger = cli.debug.then(|| SessionLogger::new(None));
    let options = ExecOptions {
        dry_run: cli.dry_run,
        timing: cli.time,
        keep: cli.keep,
        capture_output: cli.debug,
    };
    let mut executor = Executor::new(options);
    executor.execute(&invocation, logger.as_ref())
}

/// Flags that only apply to the classify/build path. `cargo run`
/// manages its own flags, artifacts, and linking, so these are named
/// in a warning instead of being silently dropped.
fn cargo_ignored_flags(cli: &Cli) -> Vec<&'static str> {
    let mut ignored = Vec::new();
    if cli.preset.is_some() {
        ignored.push("--preset");
    }
    if cli.keep {
        ignored.push("--keep");
    }
    if cli.multi {
        ignored.push("--multi");
    }
    ignored
}

/// Directory of the installed binary, the fallback location for the
/// configuration document.
fn install_dir() -> Option<PathBuf> {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(PathBuf::from))
}
