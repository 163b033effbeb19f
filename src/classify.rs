/// Input classification: extension lookup, dedup, auto-discovery,
/// entry-point selection, and link-family checks
use crate::registry::Registry;
use crate::types::{InputSet, LanguageSpec, Result, RunError};
use std::path::{Path, PathBuf};

/// Header extensions accepted as include units in multi-file mode.
/// Auto-discovery never collects them.
pub const C_HEADER_EXTENSIONS: &[&str] = &[".h", ".hpp"];

/// Default scan depth for `-L` given without a value.
pub const DEFAULT_AUTO_FIND_DEPTH: usize = 1;

#[derive(Debug, Clone, Default)]
pub struct ClassifyOptions {
    /// `-L [depth]`: scan the working directory this many levels deep
    pub auto_find: Option<usize>,
    /// `-m/--multi`: link all inputs into one artifact
    pub multi: bool,
}

/// Normalized (lowercase, dotted) extension of a path, if any.
fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .map(|ext| format!(".{}", ext.to_string_lossy().to_ascii_lowercase()))
}

fn is_header(path: &Path) -> bool {
    extension_of(path)
        .map(|ext| C_HEADER_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or(false)
}

/// Map the user-supplied and discovered paths to one `InputSet`.
///
/// Classification is a pure function of the merged registry and the
/// directory contents: same inputs and same configuration always yield
/// the same set, in the same order.
pub fn classify(
    registry: &Registry,
    files: &[PathBuf],
    opts: &ClassifyOptions,
    cwd: &Path,
) -> Result<InputSet> {
    let mut sources: Vec<PathBuf> = Vec::new();
    let mut headers: Vec<PathBuf> = Vec::new();
    let accept_headers = opts.multi || opts.auto_find.is_some();

    for file in dedup(files) {
        if accept_headers && is_header(&file) {
            headers.push(file);
        } else {
            sources.push(file);
        }
    }

    let mut specs: Vec<LanguageSpec> = Vec::with_capacity(sources.len());
    for file in &sources {
        specs.push(resolve_spec(registry, file)?.clone());
    }

    // Explicit files set the family; discovered files must match it.
    if let Some(depth) = opts.auto_find {
        let discovered = discover_sources(registry, cwd, depth)?;
        if let Some(primary_spec) = specs.first().cloned() {
            for file in discovered {
                if sources.iter().any(|s| same_file(s, &file, cwd)) {
                    continue;
                }
                let spec = resolve_spec(registry, &file)?;
                if spec.family != primary_spec.family {
                    return Err(RunError::LinkIncompatible {
                        file,
                        expected: primary_spec.family.clone(),
                        found: spec.family.clone(),
                    });
                }
                sources.push(file);
                specs.push(primary_spec.clone());
            }
        } else {
            // No explicit file: a unique unit named `main` becomes the
            // primary compilation unit; everything else links against it.
            let candidates: Vec<PathBuf> = discovered
                .iter()
                .filter(|p| {
                    p.file_stem()
                        .map(|s| s.to_string_lossy().eq_ignore_ascii_case("main"))
                        .unwrap_or(false)
                })
                .cloned()
                .collect();
            if candidates.len() != 1 {
                return Err(RunError::AmbiguousEntryPoint(candidates.len(), candidates));
            }
            let primary = candidates.into_iter().next().expect("one candidate");
            let primary_spec = resolve_spec(registry, &primary)?.clone();

            sources.push(primary.clone());
            specs.push(primary_spec.clone());
            for file in discovered {
                if file == primary {
                    continue;
                }
                let spec = resolve_spec(registry, &file)?;
                if spec.family != primary_spec.family {
                    return Err(RunError::LinkIncompatible {
                        file,
                        expected: primary_spec.family.clone(),
                        found: spec.family.clone(),
                    });
                }
                sources.push(file);
                specs.push(primary_spec.clone());
            }
        }
    }

    if sources.is_empty() {
        return Err(RunError::Config {
            key: "files".to_string(),
            message: "no input files supplied or discovered".to_string(),
        });
    }

    let primary = sources[0].clone();
    let primary_spec = specs[0].clone();

    for (file, spec) in sources.iter().zip(&specs).skip(1) {
        if spec.family != primary_spec.family {
            return Err(RunError::LinkIncompatible {
                file: file.clone(),
                expected: primary_spec.family.clone(),
                found: spec.family.clone(),
            });
        }
    }

    // Auto-discovery that actually added link units implies multi mode.
    let multi = opts.multi || (opts.auto_find.is_some() && sources.len() > 1);

    if !multi && sources.len() > 1 {
        return Err(RunError::MultipleFilesRequireMultiFlag);
    }
    if multi && !primary_spec.is_compiler() {
        return Err(RunError::LinkIncompatible {
            file: primary,
            expected: "a compiler-kind family".to_string(),
            found: format!("interpreter '{}'", primary_spec.id),
        });
    }
    if opts.multi && sources.len() < 2 {
        return Err(RunError::MultipleFilesRequireMultiFlag);
    }

    log::debug!(
        "classified {} source unit(s), {} header(s), language '{}'",
        sources.len(),
        headers.len(),
        primary_spec.id
    );

    Ok(InputSet {
        primary,
        spec: primary_spec,
        link_units: sources,
        headers,
        multi,
    })
}

fn resolve_spec<'a>(registry: &'a Registry, file: &Path) -> Result<&'a LanguageSpec> {
    let ext = extension_of(file)
        .ok_or_else(|| RunError::UnsupportedLanguage(format!("{} (no extension)", file.display())))?;
    registry
        .lookup(&ext)
        .ok_or(RunError::UnsupportedLanguage(ext))
}

/// Whether two spellings name the same file (`./main.c` vs `main.c`).
/// A discovered file must never join an explicit one as a second copy
/// of the same translation unit on one link line.
fn same_file(a: &Path, b: &Path, cwd: &Path) -> bool {
    if a == b {
        return true;
    }
    let resolve = |p: &Path| {
        let full = if p.is_absolute() {
            p.to_path_buf()
        } else {
            cwd.join(p)
        };
        full.canonicalize().unwrap_or(full)
    };
    resolve(a) == resolve(b)
}

fn dedup(files: &[PathBuf]) -> Vec<PathBuf> {
    let mut seen: Vec<PathBuf> = Vec::with_capacity(files.len());
    for file in files {
        if !seen.contains(file) {
            seen.push(file.clone());
        }
    }
    seen
}

/// Recursively collect files whose extension maps to a compiler-kind
/// language, up to `depth` directory levels below `root` (0 = root
/// only). Entries are visited in sorted order so discovery is
/// deterministic; hidden directories are not descended into.
fn discover_sources(registry: &Registry, root: &Path, depth: usize) -> Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    walk(registry, root, root, depth, &mut found)?;
    Ok(found)
}

fn walk(
    registry: &Registry,
    root: &Path,
    dir: &Path,
    depth_left: usize,
    found: &mut Vec<PathBuf>,
) -> Result<()> {
    let mut entries: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|e| e.ok().map(|e| e.path()))
        .collect();
    entries.sort();

    for path in entries {
        if path.is_dir() {
            let hidden = path
                .file_name()
                .map(|n| n.to_string_lossy().starts_with('.'))
                .unwrap_or(true);
            if depth_left > 0 && !hidden {
                walk(registry, root, &path, depth_left - 1, found)?;
            }
            continue;
        }
        if let Some(ext) = extension_of(&path) {
            if registry.lookup(&ext).map(|s| s.is_compiler()).unwrap_or(false) {
                // Report paths relative to the scan root, the way the
                // user would have typed them.
                let rel = path.strip_prefix(root).unwrap_or(&path).to_path_buf();
                found.push(rel);
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProjectConfig;
    use crate::registry::{builtins, Registry};

    fn registry() -> Registry {
        Registry::merge(builtins(), &ProjectConfig::default()).unwrap()
    }

    fn scratch_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("runbox-classify-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_single_file_classification() {
        let set = classify(
            &registry(),
            &[PathBuf::from("main.cpp")],
            &ClassifyOptions::default(),
            Path::new("."),
        )
        .unwrap();
        assert_eq!(set.primary, PathBuf::from("main.cpp"));
        assert_eq!(set.spec.id, "cpp");
        assert!(!set.multi);
        assert_eq!(set.link_units.len(), 1);
    }

    #[test]
    fn test_unknown_extension_fails() {
        let err = classify(
            &registry(),
            &[PathBuf::from("script.xyz")],
            &ClassifyOptions::default(),
            Path::new("."),
        )
        .unwrap_err();
        assert!(matches!(err, RunError::UnsupportedLanguage(ref e) if e == ".xyz"));
    }

    #[test]
    fn test_multiple_files_without_multi_flag_fail() {
        let err = classify(
            &registry(),
            &[PathBuf::from("a.java"), PathBuf::from("b.java")],
            &ClassifyOptions::default(),
            Path::new("."),
        )
        .unwrap_err();
        assert!(matches!(err, RunError::MultipleFilesRequireMultiFlag));
    }

    #[test]
    fn test_multi_links_same_family() {
        let opts = ClassifyOptions {
            multi: true,
            ..Default::default()
        };
        let set = classify(
            &registry(),
            &[
                PathBuf::from("Main.java"),
                PathBuf::from("Util.java"),
                PathBuf::from("Io.java"),
            ],
            &opts,
            Path::new("."),
        )
        .unwrap();
        assert!(set.multi);
        assert_eq!(set.link_units.len(), 3);
        assert_eq!(set.primary, PathBuf::from("Main.java"));
    }

    #[test]
    fn test_multi_rejects_mixed_families() {
        let opts = ClassifyOptions {
            multi: true,
            ..Default::default()
        };
        let err = classify(
            &registry(),
            &[PathBuf::from("main.c"), PathBuf::from("lib.rs")],
            &opts,
            Path::new("."),
        )
        .unwrap_err();
        assert!(matches!(err, RunError::LinkIncompatible { .. }));
    }

    #[test]
    fn test_c_and_cpp_share_a_family() {
        let opts = ClassifyOptions {
            multi: true,
            ..Default::default()
        };
        let set = classify(
            &registry(),
            &[PathBuf::from("main.cpp"), PathBuf::from("legacy.c")],
            &opts,
            Path::new("."),
        )
        .unwrap();
        assert_eq!(set.link_units.len(), 2);
        assert_eq!(set.spec.id, "cpp");
    }

    #[test]
    fn test_multi_with_single_file_fails() {
        let opts = ClassifyOptions {
            multi: true,
            ..Default::default()
        };
        let err = classify(
            &registry(),
            &[PathBuf::from("main.c")],
            &opts,
            Path::new("."),
        )
        .unwrap_err();
        assert!(matches!(err, RunError::MultipleFilesRequireMultiFlag));
    }

    #[test]
    fn test_multi_rejects_interpreters() {
        let opts = ClassifyOptions {
            multi: true,
            ..Default::default()
        };
        let err = classify(
            &registry(),
            &[PathBuf::from("a.py"), PathBuf::from("b.py")],
            &opts,
            Path::new("."),
        )
        .unwrap_err();
        assert!(matches!(err, RunError::LinkIncompatible { .. }));
    }

    #[test]
    fn test_headers_become_include_units_in_multi_mode() {
        let opts = ClassifyOptions {
            multi: true,
            ..Default::default()
        };
        let set = classify(
            &registry(),
            &[
                PathBuf::from("main.c"),
                PathBuf::from("util.c"),
                PathBuf::from("inc/util.h"),
            ],
            &opts,
            Path::new("."),
        )
        .unwrap();
        assert_eq!(set.link_units.len(), 2);
        assert_eq!(set.headers, vec![PathBuf::from("inc/util.h")]);
    }

    #[test]
    fn test_dedup_preserves_first_occurrence_order() {
        let opts = ClassifyOptions {
            multi: true,
            ..Default::default()
        };
        let set = classify(
            &registry(),
            &[
                PathBuf::from("main.c"),
                PathBuf::from("util.c"),
                PathBuf::from("main.c"),
            ],
            &opts,
            Path::new("."),
        )
        .unwrap();
        assert_eq!(
            set.link_units,
            vec![PathBuf::from("main.c"), PathBuf::from("util.c")]
        );
    }

    #[test]
    fn test_auto_find_selects_unique_main() {
        let dir = scratch_dir();
        std::fs::write(dir.join("util.c"), "int util(void) { return 0; }").unwrap();
        std::fs::create_dir(dir.join("sub")).unwrap();
        std::fs::write(dir.join("sub/main.c"), "int main(void) { return 0; }").unwrap();
        std::fs::write(dir.join("notes.txt"), "not a source file").unwrap();

        let opts = ClassifyOptions {
            auto_find: Some(2),
            ..Default::default()
        };
        let set = classify(&registry(), &[], &opts, &dir).unwrap();
        assert_eq!(set.primary, PathBuf::from("sub/main.c"));
        assert_eq!(set.link_units.len(), 2);
        assert!(set.multi);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_auto_find_two_mains_is_ambiguous() {
        let dir = scratch_dir();
        std::fs::write(dir.join("main.c"), "").unwrap();
        std::fs::create_dir(dir.join("sub")).unwrap();
        std::fs::write(dir.join("sub/main.c"), "").unwrap();

        let opts = ClassifyOptions {
            auto_find: Some(2),
            ..Default::default()
        };
        let err = classify(&registry(), &[], &opts, &dir).unwrap_err();
        match err {
            RunError::AmbiguousEntryPoint(n, candidates) => {
                assert_eq!(n, 2);
                assert_eq!(candidates.len(), 2);
            }
            other => panic!("expected AmbiguousEntryPoint, got {:?}", other),
        }
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_auto_find_no_main_is_ambiguous_too() {
        let dir = scratch_dir();
        std::fs::write(dir.join("util.c"), "").unwrap();

        let opts = ClassifyOptions {
            auto_find: Some(1),
            ..Default::default()
        };
        let err = classify(&registry(), &[], &opts, &dir).unwrap_err();
        assert!(matches!(err, RunError::AmbiguousEntryPoint(0, _)));
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_auto_find_respects_depth() {
        let dir = scratch_dir();
        std::fs::create_dir_all(dir.join("a/b")).unwrap();
        std::fs::write(dir.join("main.c"), "").unwrap();
        std::fs::write(dir.join("a/b/deep.c"), "").unwrap();

        let opts = ClassifyOptions {
            auto_find: Some(1),
            ..Default::default()
        };
        let set = classify(&registry(), &[], &opts, &dir).unwrap();
        // deep.c sits two levels down, out of reach at depth 1.
        assert_eq!(set.link_units, vec![PathBuf::from("main.c")]);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_auto_find_joins_explicit_files_of_same_family() {
        let dir = scratch_dir();
        std::fs::write(dir.join("extra.c"), "").unwrap();

        let opts = ClassifyOptions {
            auto_find: Some(1),
            ..Default::default()
        };
        let set = classify(&registry(), &[PathBuf::from("main.c")], &opts, &dir).unwrap();
        assert_eq!(set.primary, PathBuf::from("main.c"));
        assert!(set.link_units.contains(&PathBuf::from("extra.c")));
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_auto_find_does_not_duplicate_differently_spelled_explicit_file() {
        let dir = scratch_dir();
        std::fs::write(dir.join("main.c"), "").unwrap();
        std::fs::write(dir.join("extra.c"), "").unwrap();

        let opts = ClassifyOptions {
            auto_find: Some(1),
            ..Default::default()
        };
        // Discovery reports `main.c`; the user typed `./main.c`. The
        // link line must carry that unit once.
        let set = classify(&registry(), &[PathBuf::from("./main.c")], &opts, &dir).unwrap();
        assert_eq!(
            set.link_units,
            vec![PathBuf::from("./main.c"), PathBuf::from("extra.c")]
        );
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_auto_find_mismatched_family_fails() {
        let dir = scratch_dir();
        std::fs::write(dir.join("other.rs"), "").unwrap();

        let opts = ClassifyOptions {
            auto_find: Some(1),
            ..Default::default()
        };
        let err = classify(&registry(), &[PathBuf::from("main.c")], &opts, &dir).unwrap_err();
        assert!(matches!(err, RunError::LinkIncompatible { .. }));
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_auto_find_skips_interpreter_sources() {
        let dir = scratch_dir();
        std::fs::write(dir.join("main.c"), "").unwrap();
        std::fs::write(dir.join("helper.py"), "").unwrap();

        let opts = ClassifyOptions {
            auto_find: Some(1),
            ..Default::default()
        };
        let set = classify(&registry(), &[], &opts, &dir).unwrap();
        assert_eq!(set.link_units, vec![PathBuf::from("main.c")]);
        std::fs::remove_dir_all(&dir).ok();
    }
}
