/// Core types and error taxonomy for the runbox pipeline
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use thiserror::Error;

/// How a language is driven: a compiler produces an artifact that is
/// executed afterwards, an interpreter runs the source directly.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LanguageKind {
    Compiler,
    Interpreter,
}

/// How a compiler names its output and how that output is launched.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ArtifactConvention {
    /// gcc-style: `<runner> ... <inputs> <output_flag> <stem>`, run as `./<stem>`
    Binary { output_flag: String },
    /// javac-style: output name derived from the source, run as `<launcher> <stem>`
    Classfile { launcher: String },
    /// Interpreters produce no artifact
    None,
}

/// Resolved definition of how to build and/or run one language.
#[derive(Clone, Debug)]
pub struct LanguageSpec {
    /// Language id, the key used by `[runner]` and `[preset.*]` tables
    pub id: String,
    /// Recognized file extensions, lowercase, with leading dot
    pub extensions: Vec<String>,
    /// Executable name or path of the compiler/interpreter
    pub runner: String,
    pub kind: LanguageKind,
    /// Default flags, always first on the command line
    pub flags: Vec<String>,
    /// Per-language preset overrides (`[language.<id>.preset]`), take
    /// precedence over the flat `[preset.<name>]` tables
    pub presets: HashMap<String, String>,
    /// Link family; all inputs of one compile stage must share it
    pub family: String,
    /// Whether a local virtual environment may substitute the runner
    pub venv_aware: bool,
    pub artifact: ArtifactConvention,
}

impl LanguageSpec {
    pub fn is_compiler(&self) -> bool {
        self.kind == LanguageKind::Compiler
    }
}

/// Classified, ordered collection of files participating in one build.
#[derive(Clone, Debug)]
pub struct InputSet {
    /// Primary compilation unit; names the artifact
    pub primary: PathBuf,
    /// Language of the primary unit (all link units share its family)
    pub spec: LanguageSpec,
    /// All source units in order, primary first, deduplicated
    pub link_units: Vec<PathBuf>,
    /// Header files contributing include directories (multi mode only)
    pub headers: Vec<PathBuf>,
    /// Whether this set links multiple units into one artifact
    pub multi: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StageKind {
    Build,
    Run,
}

impl StageKind {
    pub fn tag(self) -> &'static str {
        match self {
            StageKind::Build => "COMPILE",
            StageKind::Run => "RUN",
        }
    }
}

/// One fully resolved command stage: argv plus working directory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Stage {
    pub kind: StageKind,
    pub argv: Vec<String>,
    pub workdir: PathBuf,
}

impl Stage {
    /// Rendered command line, for logs and error messages.
    pub fn command_line(&self) -> String {
        self.argv.join(" ")
    }
}

/// Fully resolved build/run sequence for one user request. Built once,
/// never mutated, consumed exactly once by the executor.
#[derive(Clone, Debug)]
pub struct Invocation {
    /// Absent for interpreters
    pub build: Option<Stage>,
    pub run: Stage,
    /// Artifacts the build stage will produce; empty for interpreters.
    /// Classfile builds emit one per source unit.
    pub artifacts: Vec<PathBuf>,
}

/// Outcome of a single executed stage.
#[derive(Clone, Debug, Default, Serialize)]
pub struct StageResult {
    pub command: String,
    pub exit_code: Option<i32>,
    /// Terminating signal, if the child died to one
    pub signal: Option<i32>,
    pub wall_time_secs: f64,
    /// Captured only when debug logging requested it
    pub stdout: Option<String>,
    pub stderr: Option<String>,
}

impl StageResult {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Outcome of one full invocation, as consumed by cleanup and the
/// debug session log.
#[derive(Clone, Debug, Default, Serialize)]
pub struct ExecutionReport {
    pub build: Option<StageResult>,
    pub run: Option<StageResult>,
    pub artifacts: Vec<PathBuf>,
    /// Number of child processes spawned (0 under dry-run)
    pub spawned: u32,
    /// The exit code the tool itself should report
    pub exit_code: i32,
    pub dry_run: bool,
}

/// Error taxonomy for the pipeline. Every variant carries enough
/// context to name the failing stage and the command or configuration
/// fragment involved.
#[derive(Error, Debug)]
pub enum RunError {
    #[error("config error at '{key}': {message}")]
    Config { key: String, message: String },

    #[error("unsupported extension '{0}': no language in the merged registry claims it")]
    UnsupportedLanguage(String),

    #[error("ambiguous entry point: need exactly one 'main' unit, found {0}: {1:?}")]
    AmbiguousEntryPoint(usize, Vec<PathBuf>),

    #[error("link-incompatible input '{file}': family '{found}' does not match '{expected}'")]
    LinkIncompatible {
        file: PathBuf,
        expected: String,
        found: String,
    },

    #[error("multiple input files require -m/--multi")]
    MultipleFilesRequireMultiFlag,

    #[error("preset '{preset}' has no entry for language '{language}'")]
    PresetNotFound { preset: String, language: String },

    #[error("unknown preset '{0}': not defined for any language")]
    UnknownPreset(String),

    #[error("compile stage failed (exit code {exit_code:?}): {command}")]
    Compile {
        command: String,
        exit_code: Option<i32>,
    },

    #[error("running as root is blocked for compiling/running arbitrary code; pass --unsafe to override")]
    Privilege,

    #[error("{stage} stage could not spawn '{runner}': {source}")]
    Spawn {
        stage: &'static str,
        runner: String,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl RunError {
    /// Fixed exit code per error class, stable across runs for scripting.
    pub fn exit_code(&self) -> i32 {
        match self {
            RunError::Config { .. } => 10,
            RunError::UnsupportedLanguage(_) => 11,
            RunError::AmbiguousEntryPoint(..) => 12,
            RunError::LinkIncompatible { .. } => 13,
            RunError::MultipleFilesRequireMultiFlag => 14,
            RunError::PresetNotFound { .. } => 15,
            RunError::UnknownPreset(_) => 16,
            RunError::Compile { .. } => 17,
            RunError::Privilege => 18,
            RunError::Spawn { .. } => 19,
            RunError::Io(_) => 1,
        }
    }
}

/// Result type alias for runbox operations
pub type Result<T> = std::result::Result<T, RunError>;
