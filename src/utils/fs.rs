use crate::utils::error::Result;
use regex::Regex;
use std::path::Path;

/// Directory names directly under `dir`, sorted. A missing directory lists as empty.
pub fn ls_dirs(dir: &Path) -> Result<Vec<String>> {
    list_entries(dir, |file_type| file_type.is_dir(), None)
}

/// File names directly under `dir` matching `pattern`, sorted.
pub fn ls_files(dir: &Path, pattern: &Regex) -> Result<Vec<String>> {
    list_entries(dir, |file_type| file_type.is_file(), Some(pattern))
}

/// Regular files with one of `extensions` (case-insensitive), full paths sorted by name.
pub fn files_with_extension(dir: &Path, extensions: &[&str]) -> Result<Vec<std::path::PathBuf>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut found = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let path = entry.path();
        let matches = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
            .unwrap_or(false);
        if matches {
            found.push(path);
        }
    }
    found.sort();
    Ok(found)
}

fn list_entries(
    dir: &Path,
    keep: impl Fn(&std::fs::FileType) -> bool,
    pattern: Option<&Regex>,
) -> Result<Vec<String>> {
    if !dir.is_dir() {
        tracing::debug!("Directory {} does not exist, listing as empty", dir.display());
        return Ok(Vec::new());
    }

    let mut names = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if !keep(&entry.file_type()?) {
            continue;
        }
        let Some(name) = entry.file_name().to_str().map(str::to_string) else {
            continue;
        };
        if pattern.map(|re| re.is_match(&name)).unwrap_or(true) {
            names.push(name);
        }
    }
    names.sort();
    Ok(names)
}
