/// Built-in language table and registry merge logic
use crate::config::ProjectConfig;
use crate::types::{ArtifactConvention, LanguageKind, LanguageSpec, Result, RunError};
use std::collections::HashMap;

/// Built-in language definitions. Custom declarations and `[runner]`
/// overrides are layered on top at merge time.
pub fn builtins() -> Vec<LanguageSpec> {
    vec![
        LanguageSpec {
            id: "c".to_string(),
            extensions: vec![".c".to_string()],
            runner: "gcc".to_string(),
            kind: LanguageKind::Compiler,
            flags: Vec::new(),
            presets: HashMap::new(),
            family: "cc".to_string(),
            venv_aware: false,
            artifact: ArtifactConvention::Binary {
                output_flag: "-o".to_string(),
            },
        },
        LanguageSpec {
            id: "cpp".to_string(),
            extensions: vec![".cpp".to_string(), ".cc".to_string()],
            runner: "g++".to_string(),
            kind: LanguageKind::Compiler,
            flags: Vec::new(),
            presets: HashMap::new(),
            family: "cc".to_string(),
            venv_aware: false,
            artifact: ArtifactConvention::Binary {
                output_flag: "-o".to_string(),
            },
        },
        LanguageSpec {
            id: "rust".to_string(),
            extensions: vec![".rs".to_string()],
            runner: "rustc".to_string(),
            kind: LanguageKind::Compiler,
            flags: Vec::new(),
            presets: HashMap::new(),
            family: "rust".to_string(),
            venv_aware: false,
            artifact: ArtifactConvention::Binary {
                output_flag: "-o".to_string(),
            },
        },
        LanguageSpec {
            id: "java".to_string(),
            extensions: vec![".java".to_string()],
            runner: "javac".to_string(),
            kind: LanguageKind::Compiler,
            flags: Vec::new(),
            presets: HashMap::new(),
            family: "jvm".to_string(),
            venv_aware: false,
            artifact: ArtifactConvention::Classfile {
                launcher: "java".to_string(),
            },
        },
        LanguageSpec {
            id: "python".to_string(),
            extensions: vec![".py".to_string()],
            runner: "python3".to_string(),
            kind: LanguageKind::Interpreter,
            flags: Vec::new(),
            presets: HashMap::new(),
            family: "python".to_string(),
            venv_aware: true,
            artifact: ArtifactConvention::None,
        },
        LanguageSpec {
            id: "lua".to_string(),
            extensions: vec![".lua".to_string()],
            runner: "lua".to_string(),
            kind: LanguageKind::Interpreter,
            flags: Vec::new(),
            presets: HashMap::new(),
            family: "lua".to_string(),
            venv_aware: false,
            artifact: ArtifactConvention::None,
        },
    ]
}

/// Active language registry: one `LanguageSpec` per claimed extension.
/// Later insertions replace earlier ones entirely; the replacement is
/// logged as a non-fatal override notice.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    by_extension: HashMap<String, LanguageSpec>,
}

impl Registry {
    /// Merge builtins with the project configuration: custom language
    /// declarations are inserted after the builtins (replacing any
    /// extension they re-claim), then `[runner]` overrides replace the
    /// runner field of matching entries, leaving everything else as is.
    ///
    /// Two custom declarations claiming the same extension are a
    /// configuration error, not a silent last-wins.
    pub fn merge(builtins: Vec<LanguageSpec>, config: &ProjectConfig) -> Result<Self> {
        let mut registry = Registry::default();

        for spec in builtins {
            registry.insert(spec);
        }

        // Sorted for a deterministic override order and dup report.
        let mut custom_ids: Vec<&String> = config.languages.keys().collect();
        custom_ids.sort();

        let mut claimed_by_custom: HashMap<String, String> = HashMap::new();
        for id in custom_ids {
            let custom = &config.languages[id];
            for ext in &custom.extensions {
                if let Some(other) = claimed_by_custom.get(ext) {
                    return Err(RunError::Config {
                        key: format!("language.{}.extensions", id),
                        message: format!(
                            "extension '{}' is already claimed by custom language '{}'",
                            ext, other
                        ),
                    });
                }
                claimed_by_custom.insert(ext.clone(), id.clone());
            }
            registry.insert(custom_spec(id, custom));
        }

        for (language, runner) in &config.runner_overrides {
            let mut matched = false;
            for spec in registry.by_extension.values_mut() {
                if &spec.id == language {
                    spec.runner = runner.clone();
                    matched = true;
                }
            }
            if matched {
                log::info!("runner override: {} -> {}", language, runner);
            } else {
                log::warn!(
                    "runner override for unknown language '{}' ignored",
                    language
                );
            }
        }

        Ok(registry)
    }

    fn insert(&mut self, spec: LanguageSpec) {
        for ext in &spec.extensions {
            if let Some(prev) = self.by_extension.get(ext) {
                log::warn!(
                    "extension '{}' re-claimed: '{}' replaces '{}'",
                    ext,
                    spec.id,
                    prev.id
                );
            }
            self.by_extension.insert(ext.clone(), spec.clone());
        }
    }

    /// Look up the language claiming a (normalized) extension.
    pub fn lookup(&self, ext: &str) -> Option<&LanguageSpec> {
        self.by_extension.get(ext)
    }

    /// Whether any custom language carries a nested entry for this
    /// preset name. Used for the PresetNotFound/UnknownPreset split.
    pub fn preset_defined(&self, preset: &str) -> bool {
        self.by_extension
            .values()
            .any(|spec| spec.presets.contains_key(preset))
    }

    /// Whether any registry entry carries this language id.
    pub fn has_language(&self, id: &str) -> bool {
        self.by_extension.values().any(|spec| spec.id == id)
    }

    /// All claimed extensions, sorted. Mostly for diagnostics.
    pub fn extensions(&self) -> Vec<&str> {
        let mut exts: Vec<&str> = self.by_extension.keys().map(String::as_str).collect();
        exts.sort_unstable();
        exts
    }
}

fn custom_spec(id: &str, custom: &crate::config::CustomLanguage) -> LanguageSpec {
    LanguageSpec {
        id: id.to_string(),
        extensions: custom.extensions.clone(),
        runner: custom.runner.clone(),
        kind: custom.kind,
        flags: custom.flags.clone(),
        presets: custom.preset.clone(),
        // Custom languages form their own link family.
        family: id.to_string(),
        venv_aware: false,
        artifact: match custom.kind {
            LanguageKind::Compiler => ArtifactConvention::Binary {
                output_flag: "-o".to_string(),
            },
            LanguageKind::Interpreter => ArtifactConvention::None,
        },
    }
}
