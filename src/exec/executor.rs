/// Stage execution: the Idle → Building → Running → CleaningUp → Done
/// state machine, with Failed absorbing from Building or Running
use crate::artifact::ArtifactManager;
use crate::audit::SessionLogger;
use crate::exec::signal;
use crate::security;
use crate::types::{
    ExecutionReport, Invocation, Result, RunError, Stage, StageKind, StageResult,
};
use std::process::{Command, Stdio};
use std::time::Instant;

#[cfg(unix)]
use std::os::unix::process::ExitStatusExt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecState {
    Idle,
    Building,
    Running,
    CleaningUp,
    Done,
    Failed,
}

#[derive(Debug, Clone, Default)]
pub struct ExecOptions {
    /// `-d/--dry-run`: print resolved commands, spawn nothing
    pub dry_run: bool,
    /// `-t/--time`: report the run stage's wall time
    pub timing: bool,
    /// `--keep`: retain the produced artifact after Done
    pub keep: bool,
    /// `--debug`: capture child output for the session log
    pub capture_output: bool,
}

/// Consumes one `Invocation`: build stage (if any), then run stage,
/// strictly sequential and blocking. Cleanup runs exactly once no
/// matter how the stages end.
pub struct Executor {
    options: ExecOptions,
    state: ExecState,
    artifacts: ArtifactManager,
    spawned: u32,
}

impl Executor {
    pub fn new(options: ExecOptions) -> Self {
        Executor {
            options,
            state: ExecState::Idle,
            artifacts: ArtifactManager::new(),
            spawned: 0,
        }
    }

    pub fn state(&self) -> ExecState {
        self.state
    }

    /// Run the invocation to completion. The report is appended to the
    /// session log (when given) on every path, success or failure, and
    /// cleanup always runs before this returns.
    pub fn execute(
        &mut self,
        invocation: &Invocation,
        logger: Option<&SessionLogger>,
    ) -> Result<ExecutionReport> {
        let mut report = ExecutionReport {
            dry_run: self.options.dry_run,
            artifacts: invocation.artifacts.clone(),
            ..Default::default()
        };
        signal::set_pipeline_active(true);
        for artifact in &invocation.artifacts {
            self.artifacts.track(artifact.clone());
        }

        let outcome = self.drive(invocation, &mut report);

        self.state = ExecState::CleaningUp;
        self.artifacts
            .cleanup(self.options.keep, self.options.dry_run);
        signal::set_pipeline_active(false);

        if let Err(e) = &outcome {
            report.exit_code = e.exit_code();
        }
        report.spawned = self.spawned;
        if let Some(logger) = logger {
            if let Err(e) = logger.append(&report) {
                log::warn!("session log append failed: {}", e);
            }
        }

        match outcome {
            Ok(()) => {
                self.state = ExecState::Done;
                Ok(report)
            }
            Err(e) => {
                // Failed was already recorded by drive(); cleanup has
                // run, the terminal transition still happens.
                self.state = ExecState::Done;
                Err(e)
            }
        }
    }

    fn drive(&mut self, invocation: &Invocation, report: &mut ExecutionReport) -> Result<()> {
        if let Some(build) = &invocation.build {
            self.state = ExecState::Building;
            let result = self.run_stage(build).map_err(|e| {
                self.state = ExecState::Failed;
                e
            })?;
            let ok = result.success() || self.options.dry_run;
            let command = result.command.clone();
            let exit_code = result.exit_code;
            let died_to = result.signal;
            report.build = Some(result);
            // A signal that killed the build child is an interruption,
            // not a compile diagnostic: the run stage is never entered
            // and the tool reports the conventional 128+sig.
            if let Some(sig) = died_to {
                self.state = ExecState::Failed;
                report.exit_code = 128 + sig;
                return Ok(());
            }
            if !ok {
                // Run is never entered after a failed build.
                self.state = ExecState::Failed;
                return Err(RunError::Compile { command, exit_code });
            }
        }

        // An interrupt can land while no child is registered; the
        // handler records it and the pipeline stops here, before the
        // run stage spawns.
        if let Some(sig) = signal::pending_interrupt() {
            self.state = ExecState::Failed;
            report.exit_code = 128 + sig;
            return Ok(());
        }

        self.state = ExecState::Running;
        let result = self.run_stage(&invocation.run).map_err(|e| {
            self.state = ExecState::Failed;
            e
        })?;
        if self.options.timing && !self.options.dry_run {
            println!("[TIME] {:.4}s", result.wall_time_secs);
        }

        // The tool's exit code mirrors the run child: its exit code,
        // or the conventional 128+sig when a signal killed it.
        report.exit_code = match (result.exit_code, result.signal) {
            (Some(code), _) => code,
            (None, Some(sig)) => 128 + sig,
            (None, None) => 1,
        };
        report.run = Some(result);
        Ok(())
    }

    /// Spawn one stage synchronously and wait for it. Under dry-run
    /// the resolved command is printed instead and nothing is spawned.
    fn run_stage(&mut self, stage: &Stage) -> Result<StageResult> {
        let command_line = stage.command_line();
        if self.options.dry_run {
            println!("[DRY-RUN] {}: {}", stage.kind.tag(), command_line);
            return Ok(StageResult {
                command: command_line,
                exit_code: Some(0),
                ..Default::default()
            });
        }

        println!("[{}] {}", stage.kind.tag(), command_line);

        let mut command = Command::new(&stage.argv[0]);
        command
            .args(&stage.argv[1..])
            .current_dir(&stage.workdir)
            .env_clear()
            .envs(security::sanitized_env());
        if self.options.capture_output {
            command.stdout(Stdio::piped()).stderr(Stdio::piped());
        }

        let stage_name = match stage.kind {
            StageKind::Build => "build",
            StageKind::Run => "run",
        };
        let start = Instant::now();
        let child = command.spawn().map_err(|e| RunError::Spawn {
            stage: stage_name,
            runner: stage.argv[0].clone(),
            source: e,
        })?;
        self.spawned += 1;
        signal::register_child(child.id());

        let result = if self.options.capture_output {
            let output = child.wait_with_output();
            signal::clear_child();
            let output = output?;
            StageResult {
                command: command_line,
                exit_code: output.status.code(),
                signal: unix_signal(&output.status),
                wall_time_secs: start.elapsed().as_secs_f64(),
                stdout: Some(String::from_utf8_lossy(&output.stdout).to_string()),
                stderr: Some(String::from_utf8_lossy(&output.stderr).to_string()),
            }
        } else {
            let mut child = child;
            let status = child.wait();
            signal::clear_child();
            let status = status?;
            StageResult {
                command: command_line,
                exit_code: status.code(),
                signal: unix_signal(&status),
                wall_time_secs: start.elapsed().as_secs_f64(),
                stdout: None,
                stderr: None,
            }
        };

        if let Some(sig) = signal::pending_interrupt() {
            log::warn!("interrupted by signal {}, child has terminated", sig);
        }

        Ok(result)
    }
}

fn unix_signal(status: &std::process::ExitStatus) -> Option<i32> {
    #[cfg(unix)]
    {
        status.signal()
    }
    #[cfg(not(unix))]
    {
        let _ = status;
        None
    }
}
