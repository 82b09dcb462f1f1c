//! Locate translation files inside a Ren'Py project tree.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context};

/// Engine-generated file holding stock UI strings; usually not worth
/// re-translating, so excluded by default.
const COMMON_FILE: &str = "common.rpy";

/// Collect every `.rpy` under `game/tl/<language>`, recursively, sorted for
/// deterministic processing order. `common.rpy` is skipped unless asked for.
pub fn scan_translation_files(
    project_dir: &Path,
    language: &str,
    include_common: bool,
) -> anyhow::Result<Vec<PathBuf>> {
    let tl_dir = project_dir.join("game").join("tl").join(language);
    if !tl_dir.is_dir() {
        bail!("no translation directory for {language}: {}", tl_dir.display());
    }
    let mut found = Vec::new();
    collect(&tl_dir, include_common, &mut found)?;
    found.sort();
    Ok(found)
}

/// Drop files whose name (or trailing path components) matches an exclusion
/// entry, e.g. `"screens.rpy"` or `"chapter2/extra.rpy"`.
pub fn apply_exclusions(files: Vec<PathBuf>, exclude: &[String]) -> Vec<PathBuf> {
    if exclude.is_empty() {
        return files;
    }
    files
        .into_iter()
        .filter(|path| !exclude.iter().any(|e| path.ends_with(Path::new(e))))
        .collect()
}

fn collect(dir: &Path, include_common: bool, found: &mut Vec<PathBuf>) -> anyhow::Result<()> {
    let entries = std::fs::read_dir(dir).with_context(|| format!("read dir {}", dir.display()))?;
    for entry in entries {
        let entry = entry.with_context(|| format!("read dir {}", dir.display()))?;
        let path = entry.path();
        if path.is_dir() {
            collect(&path, include_common, found)?;
        } else if path.extension().is_some_and(|ext| ext == "rpy") {
            if !include_common && path.file_name().is_some_and(|name| name == COMMON_FILE) {
                continue;
            }
            found.push(path);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
        fs::write(path, "").expect("touch");
    }

    #[test]
    fn finds_rpy_files_recursively_sorted() {
        let dir = tempfile::tempdir().expect("tempdir");
        let tl = dir.path().join("game/tl/french");
        touch(&tl.join("script.rpy"));
        touch(&tl.join("chapter2/extra.rpy"));
        touch(&tl.join("script.rpyc"));
        touch(&tl.join("notes.txt"));
        let found = scan_translation_files(dir.path(), "french", false).expect("scan");
        let names: Vec<String> = found
            .iter()
            .map(|p| {
                p.strip_prefix(&tl)
                    .expect("under tl")
                    .to_string_lossy()
                    .into_owned()
            })
            .collect();
        assert_eq!(names, ["chapter2/extra.rpy", "script.rpy"]);
    }

    #[test]
    fn common_is_excluded_by_default() {
        let dir = tempfile::tempdir().expect("tempdir");
        let tl = dir.path().join("game/tl/french");
        touch(&tl.join("common.rpy"));
        touch(&tl.join("script.rpy"));
        let without = scan_translation_files(dir.path(), "french", false).expect("scan");
        assert_eq!(without.len(), 1);
        let with = scan_translation_files(dir.path(), "french", true).expect("scan");
        assert_eq!(with.len(), 2);
    }

    #[test]
    fn exclusions_match_names_and_suffixes() {
        let files = vec![
            PathBuf::from("/p/game/tl/french/script.rpy"),
            PathBuf::from("/p/game/tl/french/screens.rpy"),
            PathBuf::from("/p/game/tl/french/chapter2/extra.rpy"),
        ];
        let kept = apply_exclusions(
            files.clone(),
            &["screens.rpy".to_string(), "chapter2/extra.rpy".to_string()],
        );
        assert_eq!(kept, [PathBuf::from("/p/game/tl/french/script.rpy")]);
        assert_eq!(apply_exclusions(files.clone(), &[]).len(), 3);
    }

    #[test]
    fn missing_language_directory_is_fatal() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert!(scan_translation_files(dir.path(), "french", false).is_err());
    }
}
