/// Command construction: compile/run argv assembly, preset resolution,
/// artifact naming
use crate::config::ProjectConfig;
use crate::registry::Registry;
use crate::types::{
    ArtifactConvention, InputSet, Invocation, Result, RunError, Stage, StageKind,
};
use crate::venv;
use std::path::{Path, PathBuf};

/// Split a user-supplied flag string into argv tokens. Surrounding
/// quotes around the whole string are stripped first ("-g -Wall"
/// arrives quoted from most shells).
pub fn split_flags(flags: &str) -> Vec<String> {
    let trimmed = flags.trim();
    let trimmed = trimmed
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .or_else(|| {
            trimmed
                .strip_prefix('\'')
                .and_then(|s| s.strip_suffix('\''))
        })
        .unwrap_or(trimmed);
    trimmed.split_whitespace().map(str::to_string).collect()
}

/// Produce the fully resolved `Invocation` for a classified input set.
///
/// Flag ordering is significant and preserved verbatim: default flags,
/// then preset flags, then `-f` extras, then input files. The builder
/// never deduplicates or reorders; later flags may override earlier
/// ones per the underlying runner's own rules.
pub fn build(
    input: &InputSet,
    config: &ProjectConfig,
    registry: &Registry,
    preset: Option<&str>,
    extra_flags: &str,
    forwarded: &[String],
    cwd: &Path,
) -> Result<Invocation> {
    validate_preset_references(config, registry)?;
    let preset_flags = resolve_preset_flags(input, config, registry, preset)?;
    let extra = split_flags(extra_flags);
    let runner = resolve_runner(input, config, cwd);

    let stem = input
        .primary
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .ok_or_else(|| RunError::Config {
            key: "files".to_string(),
            message: format!("cannot derive an artifact name from '{}'", input.primary.display()),
        })?;

    match &input.spec.artifact {
        ArtifactConvention::None => {
            let mut argv = vec![runner, input.primary.display().to_string()];
            argv.extend(forwarded.iter().cloned());
            Ok(Invocation {
                build: None,
                run: Stage {
                    kind: StageKind::Run,
                    argv,
                    workdir: cwd.to_path_buf(),
                },
                artifacts: Vec::new(),
            })
        }
        ArtifactConvention::Binary { output_flag } => {
            let mut argv = vec![runner];
            argv.extend(input.spec.flags.iter().cloned());
            argv.extend(preset_flags);
            argv.extend(extra);
            argv.extend(input.link_units.iter().map(|p| p.display().to_string()));
            argv.extend(include_dirs(&input.headers));
            argv.push(output_flag.clone());
            argv.push(stem.clone());

            let mut run_argv = vec![format!("./{}", stem)];
            run_argv.extend(forwarded.iter().cloned());
            Ok(Invocation {
                build: Some(Stage {
                    kind: StageKind::Build,
                    argv,
                    workdir: cwd.to_path_buf(),
                }),
                run: Stage {
                    kind: StageKind::Run,
                    argv: run_argv,
                    workdir: cwd.to_path_buf(),
                },
                artifacts: vec![cwd.join(&stem)],
            })
        }
        ArtifactConvention::Classfile { launcher } => {
            let mut argv = vec![runner];
            argv.extend(input.spec.flags.iter().cloned());
            argv.extend(preset_flags);
            argv.extend(extra);
            argv.extend(input.link_units.iter().map(|p| p.display().to_string()));

            // The compiler writes each classfile next to its source;
            // the launcher needs the primary's directory on the class
            // path, and every emitted classfile is tracked for cleanup.
            let class_dir = input
                .primary
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| ".".to_string());
            let mut run_argv = vec![launcher.clone(), "-cp".to_string(), class_dir, stem.clone()];
            run_argv.extend(forwarded.iter().cloned());
            Ok(Invocation {
                build: Some(Stage {
                    kind: StageKind::Build,
                    argv,
                    workdir: cwd.to_path_buf(),
                }),
                run: Stage {
                    kind: StageKind::Run,
                    argv: run_argv,
                    workdir: cwd.to_path_buf(),
                },
                artifacts: input
                    .link_units
                    .iter()
                    .map(|p| cwd.join(p.with_extension("class")))
                    .collect(),
            })
        }
    }
}

/// Run-stage-only invocation for an implicit cargo project (no files,
/// Cargo.toml in the working directory).
pub fn cargo_invocation(extra_flags: &str, forwarded: &[String], cwd: &Path) -> Invocation {
    let mut argv = vec!["cargo".to_string(), "run".to_string(), "-q".to_string()];
    argv.extend(split_flags(extra_flags));
    if !forwarded.is_empty() {
        argv.push("--".to_string());
        argv.extend(forwarded.iter().cloned());
    }
    Invocation {
        build: None,
        run: Stage {
            kind: StageKind::Run,
            argv,
            workdir: cwd.to_path_buf(),
        },
        artifacts: Vec::new(),
    }
}

/// Deferred configuration check (the registry does not exist yet when
/// the document is parsed): every flat preset entry must reference a
/// language id the merged registry knows about.
fn validate_preset_references(config: &ProjectConfig, registry: &Registry) -> Result<()> {
    for (preset, table) in &config.presets {
        for language in table.keys() {
            if !registry.has_language(language) {
                return Err(RunError::Config {
                    key: format!("preset.{}.{}", preset, language),
                    message: format!("preset references unknown language '{}'", language),
                });
            }
        }
    }
    Ok(())
}

/// Preset resolution order: per-language nested entry, then the flat
/// `[preset.<name>]` table. A preset that exists for some other
/// language but not this one is `PresetNotFound`; a preset that exists
/// nowhere is `UnknownPreset`.
fn resolve_preset_flags(
    input: &InputSet,
    config: &ProjectConfig,
    registry: &Registry,
    preset: Option<&str>,
) -> Result<Vec<String>> {
    let Some(name) = preset else {
        return Ok(Vec::new());
    };

    if let Some(flags) = input.spec.presets.get(name) {
        return Ok(split_flags(flags));
    }
    if let Some(flags) = config.flat_preset(name, &input.spec.id) {
        return Ok(split_flags(flags));
    }

    if config.preset_defined(name) || registry.preset_defined(name) {
        Err(RunError::PresetNotFound {
            preset: name.to_string(),
            language: input.spec.id.clone(),
        })
    } else {
        Err(RunError::UnknownPreset(name.to_string()))
    }
}

/// The registry-resolved runner, with the virtual-environment
/// interpreter substituted for venv-aware languages.
fn resolve_runner(input: &InputSet, config: &ProjectConfig, cwd: &Path) -> String {
    if input.spec.venv_aware {
        venv::resolve_interpreter(&input.spec, cwd, config.project_root.as_deref())
    } else {
        input.spec.runner.clone()
    }
}

/// One `-I<dir>` per distinct header directory, sorted for
/// deterministic output.
fn include_dirs(headers: &[PathBuf]) -> Vec<String> {
    let mut dirs: Vec<String> = headers
        .iter()
        .map(|h| {
            let parent = h.parent().filter(|p| !p.as_os_str().is_empty());
            format!("-I{}", parent.unwrap_or_else(|| Path::new(".")).display())
        })
        .collect();
    dirs.sort();
    dirs.dedup();
    dirs
}
