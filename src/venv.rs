/// Virtual environment detection for venv-aware interpreters
use crate::types::LanguageSpec;
use std::path::{Path, PathBuf};

/// Directory names recognized as local isolated environments.
pub const VENV_DIR_NAMES: &[&str] = &[".venv", ".env"];

/// Substitute a local environment's interpreter for the registry
/// runner. Searches `cwd` and its ancestors up to the project root
/// (the directory the configuration document was found in), or `cwd`
/// alone when there is no project root. Falls back to the registry
/// runner unchanged.
pub fn resolve_interpreter(
    spec: &LanguageSpec,
    cwd: &Path,
    project_root: Option<&Path>,
) -> String {
    if !spec.venv_aware {
        return spec.runner.clone();
    }

    for dir in search_chain(cwd, project_root) {
        for name in VENV_DIR_NAMES {
            let interpreter = dir.join(name).join("bin").join("python");
            if interpreter.is_file() {
                log::info!("using venv interpreter: {}", interpreter.display());
                return interpreter.display().to_string();
            }
        }
    }

    spec.runner.clone()
}

/// `cwd` and its ancestors, stopping at the project root (inclusive).
/// If `cwd` does not sit under the root, only `cwd` is searched.
fn search_chain(cwd: &Path, project_root: Option<&Path>) -> Vec<PathBuf> {
    let mut chain = vec![cwd.to_path_buf()];
    let Some(root) = project_root else {
        return chain;
    };
    if cwd == root || !cwd.starts_with(root) {
        return chain;
    }
    let mut current = cwd;
    while let Some(parent) = current.parent() {
        chain.push(parent.to_path_buf());
        if parent == root {
            break;
        }
        current = parent;
    }
    chain
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProjectConfig;
    use crate::registry::{builtins, Registry};

    fn python_spec() -> LanguageSpec {
        let registry = Registry::merge(builtins(), &ProjectConfig::default()).unwrap();
        registry.lookup(".py").unwrap().clone()
    }

    fn scratch_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("runbox-venv-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_no_venv_keeps_registry_runner() {
        let dir = scratch_dir();
        assert_eq!(resolve_interpreter(&python_spec(), &dir, None), "python3");
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_venv_in_cwd_substitutes_interpreter() {
        let dir = scratch_dir();
        let bin = dir.join(".venv").join("bin");
        std::fs::create_dir_all(&bin).unwrap();
        std::fs::write(bin.join("python"), "").unwrap();

        let resolved = resolve_interpreter(&python_spec(), &dir, None);
        assert!(resolved.ends_with(".venv/bin/python"), "got {}", resolved);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_venv_found_in_ancestor_up_to_project_root() {
        let root = scratch_dir();
        let nested = root.join("src").join("deep");
        std::fs::create_dir_all(&nested).unwrap();
        let bin = root.join(".env").join("bin");
        std::fs::create_dir_all(&bin).unwrap();
        std::fs::write(bin.join("python"), "").unwrap();

        let resolved = resolve_interpreter(&python_spec(), &nested, Some(&root));
        assert!(resolved.ends_with(".env/bin/python"), "got {}", resolved);

        // Without a project root, ancestors are not searched.
        let resolved = resolve_interpreter(&python_spec(), &nested, None);
        assert_eq!(resolved, "python3");
        std::fs::remove_dir_all(&root).ok();
    }

    #[test]
    fn test_non_venv_aware_spec_never_substitutes() {
        let registry = Registry::merge(builtins(), &ProjectConfig::default()).unwrap();
        let lua = registry.lookup(".lua").unwrap().clone();
        let dir = scratch_dir();
        let bin = dir.join(".venv").join("bin");
        std::fs::create_dir_all(&bin).unwrap();
        std::fs::write(bin.join("python"), "").unwrap();

        assert_eq!(resolve_interpreter(&lua, &dir, None), "lua");
        std::fs::remove_dir_all(&dir).ok();
    }
}
