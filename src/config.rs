/// Project configuration loading from Run.toml
use crate::types::{LanguageKind, Result, RunError};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Name of the configuration document searched for in the working
/// directory and then the installation directory.
pub const CONFIG_FILE_NAME: &str = "Run.toml";

/// Custom language declaration from `[language.<id>]`.
#[derive(Debug, Clone, Deserialize)]
pub struct CustomLanguage {
    pub extensions: Vec<String>,
    pub runner: String,
    #[serde(rename = "type")]
    pub kind: LanguageKind,
    #[serde(default)]
    pub flags: Vec<String>,
    /// Nested per-language preset table, takes precedence over the
    /// flat `[preset.<name>]` entries for this language
    #[serde(default)]
    pub preset: HashMap<String, String>,
}

/// Raw document shape, as deserialized. All tables are optional;
/// an absent document behaves like an empty one.
#[derive(Debug, Clone, Default, Deserialize)]
struct RawConfig {
    #[serde(default)]
    runner: HashMap<String, String>,
    #[serde(default)]
    preset: HashMap<String, HashMap<String, String>>,
    #[serde(default)]
    language: HashMap<String, CustomLanguage>,
}

/// Parsed and validated project configuration. Read once per
/// invocation; absence is not an error.
#[derive(Debug, Clone, Default)]
pub struct ProjectConfig {
    /// `[runner]`: language id -> replacement runner string
    pub runner_overrides: HashMap<String, String>,
    /// `[preset.<name>]`: preset name -> language id -> flag string
    pub presets: HashMap<String, HashMap<String, String>>,
    /// `[language.<id>]` custom declarations
    pub languages: HashMap<String, CustomLanguage>,
    /// Directory the document was found in; doubles as the project
    /// root for virtual-environment discovery
    pub project_root: Option<PathBuf>,
}

impl ProjectConfig {
    /// Search `start_dir` then `install_dir` for the configuration
    /// document. Missing document yields the empty default; a present
    /// but malformed document is a fatal `Config` error.
    pub fn resolve(start_dir: &Path, install_dir: Option<&Path>) -> Result<Self> {
        let mut candidates = vec![start_dir.join(CONFIG_FILE_NAME)];
        if let Some(dir) = install_dir {
            candidates.push(dir.join(CONFIG_FILE_NAME));
        }

        for path in candidates {
            if path.is_file() {
                log::info!("loaded config: {}", path.display());
                let mut config = Self::load_from_file(&path)?;
                config.project_root = path.parent().map(Path::to_path_buf);
                return Ok(config);
            }
        }

        log::debug!("no {} found, using defaults", CONFIG_FILE_NAME);
        Ok(Self::default())
    }

    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| RunError::Config {
            key: path.display().to_string(),
            message: format!("failed to read config file: {}", e),
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate a configuration document. The toml error
    /// message already names the offending key path for malformed
    /// tables, duplicate keys, and missing required fields.
    pub fn from_toml(content: &str) -> Result<Self> {
        let raw: RawConfig = toml::from_str(content).map_err(|e| RunError::Config {
            key: CONFIG_FILE_NAME.to_string(),
            message: e.message().to_string(),
        })?;

        let mut config = ProjectConfig {
            runner_overrides: raw.runner,
            presets: raw.preset,
            languages: HashMap::new(),
            project_root: None,
        };

        for (id, mut lang) in raw.language {
            if lang.extensions.is_empty() {
                return Err(RunError::Config {
                    key: format!("language.{}.extensions", id),
                    message: "a custom language must claim at least one extension".to_string(),
                });
            }
            if lang.runner.trim().is_empty() {
                return Err(RunError::Config {
                    key: format!("language.{}.runner", id),
                    message: "a custom language must name a runner".to_string(),
                });
            }
            for ext in &mut lang.extensions {
                *ext = normalize_extension(ext);
            }
            config.languages.insert(id, lang);
        }

        Ok(config)
    }

    /// Flat preset lookup: `[preset.<name>]` entry for one language.
    pub fn flat_preset(&self, preset: &str, language: &str) -> Option<&str> {
        self.presets
            .get(preset)
            .and_then(|table| table.get(language))
            .map(String::as_str)
    }

    /// Whether a preset name is defined anywhere: in the flat table or
    /// nested under any custom language.
    pub fn preset_defined(&self, preset: &str) -> bool {
        self.presets.contains_key(preset)
            || self
                .languages
                .values()
                .any(|lang| lang.preset.contains_key(preset))
    }
}

/// Lowercase, with a leading dot: "C" and ".C" both become ".c".
pub fn normalize_extension(ext: &str) -> String {
    let ext = ext.trim().to_ascii_lowercase();
    if ext.starts_with('.') {
        ext
    } else {
        format!(".{}", ext)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_is_empty_config() {
        let config = ProjectConfig::from_toml("").unwrap();
        assert!(config.runner_overrides.is_empty());
        assert!(config.presets.is_empty());
        assert!(config.languages.is_empty());
    }

    #[test]
    fn test_full_document() {
        let config = ProjectConfig::from_toml(
            r#"
            [runner]
            cpp = "clang++"

            [preset.debug]
            cpp = "-g -Wall -Wextra -std=c++20"
            c = "-g"

            [language.zig]
            extensions = ["zig"]
            runner = "zig"
            type = "compiler"
            flags = ["build-exe"]

            [language.zig.preset]
            debug = "-ODebug"
            "#,
        )
        .unwrap();

        assert_eq!(config.runner_overrides.get("cpp").unwrap(), "clang++");
        assert_eq!(
            config.flat_preset("debug", "cpp").unwrap(),
            "-g -Wall -Wextra -std=c++20"
        );
        assert!(config.flat_preset("debug", "rust").is_none());
        assert!(config.flat_preset("release", "cpp").is_none());

        let zig = config.languages.get("zig").unwrap();
        assert_eq!(zig.extensions, vec![".zig"]);
        assert_eq!(zig.kind, LanguageKind::Compiler);
        assert_eq!(zig.preset.get("debug").unwrap(), "-ODebug");
    }

    #[test]
    fn test_missing_runner_is_config_error() {
        let err = ProjectConfig::from_toml(
            r#"
            [language.zig]
            extensions = ["zig"]
            type = "compiler"
            "#,
        )
        .unwrap_err();
        assert_eq!(err.exit_code(), 10);
        assert!(err.to_string().contains("runner"));
    }

    #[test]
    fn test_empty_extensions_is_config_error() {
        let err = ProjectConfig::from_toml(
            r#"
            [language.zig]
            extensions = []
            runner = "zig"
            type = "compiler"
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("language.zig.extensions"));
    }

    #[test]
    fn test_unrecognized_type_is_config_error() {
        let err = ProjectConfig::from_toml(
            r#"
            [language.zig]
            extensions = ["zig"]
            runner = "zig"
            type = "transpiler"
            "#,
        )
        .unwrap_err();
        assert_eq!(err.exit_code(), 10);
    }

    #[test]
    fn test_duplicate_key_is_config_error() {
        let err = ProjectConfig::from_toml(
            r#"
            [runner]
            cpp = "clang++"
            cpp = "g++"
            "#,
        )
        .unwrap_err();
        assert_eq!(err.exit_code(), 10);
    }

    #[test]
    fn test_preset_defined_covers_nested_tables() {
        let config = ProjectConfig::from_toml(
            r#"
            [language.zig]
            extensions = ["zig"]
            runner = "zig"
            type = "compiler"

            [language.zig.preset]
            fast = "-OReleaseFast"
            "#,
        )
        .unwrap();
        assert!(config.preset_defined("fast"));
        assert!(!config.preset_defined("debug"));
    }

    #[test]
    fn test_extension_normalization() {
        assert_eq!(normalize_extension("C"), ".c");
        assert_eq!(normalize_extension(".CPP"), ".cpp");
        assert_eq!(normalize_extension(" rs "), ".rs");
    }

    #[test]
    fn test_resolve_missing_document_defaults() {
        let dir = std::env::temp_dir().join(format!("runbox-test-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let config = ProjectConfig::resolve(&dir, None).unwrap();
        assert!(config.project_root.is_none());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_resolve_prefers_start_dir() {
        let base = std::env::temp_dir().join(format!("runbox-test-{}", uuid::Uuid::new_v4()));
        let start = base.join("project");
        let install = base.join("install");
        std::fs::create_dir_all(&start).unwrap();
        std::fs::create_dir_all(&install).unwrap();
        std::fs::write(start.join(CONFIG_FILE_NAME), "[runner]\nc = \"clang\"\n").unwrap();
        std::fs::write(install.join(CONFIG_FILE_NAME), "[runner]\nc = \"tcc\"\n").unwrap();

        let config = ProjectConfig::resolve(&start, Some(&install)).unwrap();
        assert_eq!(config.runner_overrides.get("c").unwrap(), "clang");
        assert_eq!(config.project_root.as_deref(), Some(start.as_path()));

        std::fs::remove_dir_all(&base).ok();
    }
}
