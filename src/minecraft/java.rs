use log::info;
use std::env;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

#[cfg(windows)]
const JAVA_BINARIES: &[&str] = &["javaw.exe", "java.exe"];
#[cfg(not(windows))]
const JAVA_BINARIES: &[&str] = &["java"];

#[cfg(windows)]
const FALLBACK_PATHS: &[&str] = &[];
#[cfg(not(windows))]
const FALLBACK_PATHS: &[&str] = &["/usr/lib/jvm/default-runtime/bin/java", "/usr/bin/java"];

/// Locate a Java executable for the current user
pub fn find_java() -> Option<PathBuf> {
    let java_home = env::var_os("JAVA_HOME").map(PathBuf::from);
    let path_var = env::var_os("PATH");
    let found = find_java_in(java_home.as_deref(), path_var.as_deref());
    if let Some(java) = &found {
        info!("Found Java executable at {}", java.display());
    }
    found
}

/// Search `JAVA_HOME`, then `PATH`, then well-known install locations
pub fn find_java_in(java_home: Option<&Path>, path_var: Option<&OsStr>) -> Option<PathBuf> {
    if let Some(home) = java_home {
        let bin = home.join("bin");
        if let Some(java) = first_binary_in(&bin) {
            return Some(java);
        }
    }

    if let Some(path_var) = path_var {
        for dir in env::split_paths(path_var) {
            if let Some(java) = first_binary_in(&dir) {
                return Some(java);
            }
        }
    }

    FALLBACK_PATHS
        .iter()
        .map(PathBuf::from)
        .find(|candidate| candidate.is_file())
}

fn first_binary_in(dir: &Path) -> Option<PathBuf> {
    JAVA_BINARIES
        .iter()
        .map(|name| dir.join(name))
        .find(|candidate| candidate.is_file())
}

#[cfg(all(test, not(windows)))]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn fake_java(dir: &Path) -> PathBuf {
        fs::create_dir_all(dir).unwrap();
        let java = dir.join("java");
        fs::write(&java, "#!/bin/sh\n").unwrap();
        java
    }

    #[test]
    fn java_home_takes_precedence() {
        let tmp = TempDir::new().unwrap();
        let home_java = fake_java(&tmp.path().join("jdk").join("bin"));
        let path_java_dir = tmp.path().join("path-bin");
        fake_java(&path_java_dir);

        let found = find_java_in(
            Some(&tmp.path().join("jdk")),
            Some(path_java_dir.as_os_str()),
        );
        assert_eq!(found, Some(home_java));
    }

    #[test]
    fn path_is_searched_in_order() {
        let tmp = TempDir::new().unwrap();
        let empty = tmp.path().join("empty");
        fs::create_dir_all(&empty).unwrap();
        let first = fake_java(&tmp.path().join("first"));
        fake_java(&tmp.path().join("second"));

        let path_var = env::join_paths([
            empty,
            tmp.path().join("first"),
            tmp.path().join("second"),
        ])
        .unwrap();

        let found = find_java_in(Some(&tmp.path().join("missing-jdk")), Some(&path_var));
        assert_eq!(found, Some(first));
    }

    #[test]
    fn directories_named_java_are_ignored() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("bin").join("java")).unwrap();

        let found = find_java_in(None, Some(tmp.path().join("bin").as_os_str()));
        assert!(found.map_or(true, |java| !java.starts_with(tmp.path())));
    }
}
