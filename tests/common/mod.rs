#![allow(dead_code)]

use std::path::{Path, PathBuf};

/// Runs `f` with the process's working directory switched to a fresh
/// temporary directory, so cache files written by memoized functions land
/// in scratch space. Callers must serialize tests using this helper (the
/// working directory is process-global).
pub fn with_temp_cwd<T>(f: impl FnOnce(&Path) -> T) -> T {
    let dir = tempfile::tempdir().unwrap();
    let prev = std::env::current_dir().unwrap();
    std::env::set_current_dir(dir.path()).unwrap();
    let out = f(dir.path());
    std::env::set_current_dir(prev).unwrap();
    out
}

/// Writes a throwaway "source file" for explicit `Memoized` wrappers.
pub fn write_source(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, "fn body() {}").unwrap();
    path
}
