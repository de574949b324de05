//! # chrome-locate
//!
//! Find a Chrome or Chromium executable suitable for headless rendering,
//! so that callers of a DevTools-protocol client do not have to hard-code
//! browser paths per platform.
//!
//! ## Resolution order
//!
//! [`locate_chrome_with`] tries, first match wins:
//!
//! 1. An explicit path supplied by the caller (e.g. a `--chrome` flag).
//! 2. The `CHROME_PATH` environment variable.
//! 3. Well-known install locations for the current platform.
//! 4. A `PATH` search for the usual executable names
//!    (`google-chrome`, `chromium`, `chromium-browser`, …).
//!
//! An explicit path or `CHROME_PATH` that does not point at an executable is
//! an error rather than a silent fall-through: a misconfigured override
//! should be reported, not papered over by some other browser on the system.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use chrome_locate::locate_chrome;
//!
//! let chrome = locate_chrome().expect("no Chrome/Chromium installed");
//! println!("using {}", chrome.display());
//! ```
//!
//! ## Platform support
//!
//! | OS      | Install locations searched                                     |
//! |---------|----------------------------------------------------------------|
//! | macOS   | `/Applications/*.app`, `~/Applications/*.app`                  |
//! | Linux   | `/usr/bin`, `/usr/local/bin`, `/snap/bin`, `/opt/google/chrome` |
//! | Windows | `%ProgramFiles%`, `%ProgramFiles(x86)%`, `%LOCALAPPDATA%`       |

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use thiserror::Error;

// ── Public constants ─────────────────────────────────────────────────────────

/// Environment variable consulted before any platform search.
pub const CHROME_PATH_ENV: &str = "CHROME_PATH";

// ── Error type ───────────────────────────────────────────────────────────────

/// Errors returned by chrome-locate operations.
#[derive(Error, Debug)]
pub enum ChromeLocateError {
    /// A caller-supplied path does not name an executable file.
    #[error("Chrome executable '{path}' does not exist or is not executable")]
    NotExecutable { path: PathBuf },

    /// `CHROME_PATH` is set but does not name an executable file.
    #[error("CHROME_PATH='{path}' does not exist or is not executable")]
    EnvPathInvalid { path: PathBuf },

    /// Nothing was found in install locations or on `PATH`.
    #[error(
        "No Chrome/Chromium executable found ({searched} locations searched).\n\
Install Chrome or Chromium, or set CHROME_PATH=/path/to/chrome."
    )]
    NotFound { searched: usize },
}

// ── Internal: platform metadata ──────────────────────────────────────────────

/// Executable names searched on `PATH`, most preferred first.
pub fn executable_names() -> &'static [&'static str] {
    if cfg!(windows) {
        &["chrome.exe", "msedge.exe", "chromium.exe"]
    } else {
        &[
            "google-chrome",
            "google-chrome-stable",
            "chromium",
            "chromium-browser",
            "chrome",
            "headless_shell",
        ]
    }
}

/// Well-known install locations for the current platform.
pub fn candidate_paths() -> Vec<PathBuf> {
    let mut out = Vec::new();

    match std::env::consts::OS {
        "macos" => {
            let bundles = [
                "Google Chrome.app/Contents/MacOS/Google Chrome",
                "Chromium.app/Contents/MacOS/Chromium",
                "Google Chrome Canary.app/Contents/MacOS/Google Chrome Canary",
            ];
            for bundle in bundles {
                out.push(Path::new("/Applications").join(bundle));
                if let Some(home) = dirs::home_dir() {
                    out.push(home.join("Applications").join(bundle));
                }
            }
        }
        "windows" => {
            let roots = ["ProgramFiles", "ProgramFiles(x86)", "LOCALAPPDATA"];
            for var in roots {
                if let Some(root) = std::env::var_os(var) {
                    let root = PathBuf::from(root);
                    out.push(root.join(r"Google\Chrome\Application\chrome.exe"));
                    out.push(root.join(r"Chromium\Application\chrome.exe"));
                    out.push(root.join(r"Microsoft\Edge\Application\msedge.exe"));
                }
            }
        }
        _ => {
            for dir in ["/usr/bin", "/usr/local/bin", "/snap/bin"] {
                for name in executable_names() {
                    out.push(Path::new(dir).join(name));
                }
            }
            out.push(PathBuf::from("/opt/google/chrome/chrome"));
            if let Some(data) = dirs::data_local_dir() {
                out.push(data.join("chromium/chrome"));
            }
        }
    }

    out
}

// ── Thread-safe singleton path cache ─────────────────────────────────────────

static RESOLVED_PATH: OnceLock<PathBuf> = OnceLock::new();

// ── Public API ───────────────────────────────────────────────────────────────

/// Locate Chrome using the environment and platform search only.
///
/// The first successful lookup is cached for the lifetime of the process.
pub fn locate_chrome() -> Result<PathBuf, ChromeLocateError> {
    if let Some(path) = RESOLVED_PATH.get() {
        return Ok(path.clone());
    }

    let path = locate_chrome_with(None)?;
    let _ = RESOLVED_PATH.set(path.clone());
    Ok(path)
}

/// Locate Chrome, preferring `explicit` when given.
///
/// Never cached: an explicit path is cheap to validate and may differ
/// between calls.
pub fn locate_chrome_with(explicit: Option<&Path>) -> Result<PathBuf, ChromeLocateError> {
    // 1. Caller override.
    if let Some(path) = explicit {
        return if is_executable(path) {
            Ok(path.to_path_buf())
        } else {
            Err(ChromeLocateError::NotExecutable {
                path: path.to_path_buf(),
            })
        };
    }

    // 2. Environment variable override.
    if let Some(env_path) = std::env::var_os(CHROME_PATH_ENV).filter(|v| !v.is_empty()) {
        let path = PathBuf::from(env_path);
        return if is_executable(&path) {
            Ok(path)
        } else {
            Err(ChromeLocateError::EnvPathInvalid { path })
        };
    }

    // 3. Install locations.
    let candidates = candidate_paths();
    if let Some(found) = candidates.iter().find(|p| is_executable(p)) {
        return Ok(found.clone());
    }

    // 4. PATH search.
    let path_var = std::env::var_os("PATH").unwrap_or_default();
    if let Some(found) = search_path(executable_names(), &path_var) {
        return Ok(found);
    }

    Err(ChromeLocateError::NotFound {
        searched: candidates.len() + executable_names().len(),
    })
}

/// Search every directory of a `PATH`-style value for the first of `names`.
pub fn search_path(names: &[&str], path_var: &OsStr) -> Option<PathBuf> {
    std::env::split_paths(path_var).find_map(|dir| {
        names
            .iter()
            .map(|name| dir.join(name))
            .find(|candidate| is_executable(candidate))
    })
}

/// `true` if `path` is a regular file the current user may execute.
pub fn is_executable(path: &Path) -> bool {
    let Ok(meta) = std::fs::metadata(path) else {
        return false;
    };
    if !meta.is_file() {
        return false;
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        meta.permissions().mode() & 0o111 != 0
    }

    #[cfg(not(unix))]
    {
        true
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(unix)]
    fn fake_executable(dir: &Path, name: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;
        let path = dir.join(name);
        std::fs::write(&path, "#!/bin/sh\n").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[test]
    fn executable_names_nonempty() {
        assert!(!executable_names().is_empty());
        assert!(executable_names().iter().all(|n| !n.is_empty()));
    }

    #[test]
    fn candidate_paths_are_absolute() {
        for p in candidate_paths() {
            assert!(p.is_absolute(), "not absolute: {}", p.display());
        }
    }

    #[test]
    fn missing_file_is_not_executable() {
        assert!(!is_executable(Path::new("/definitely/not/a/browser")));
    }

    #[test]
    fn directory_is_not_executable() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!is_executable(dir.path()));
    }

    #[test]
    fn explicit_missing_path_is_an_error() {
        let err = locate_chrome_with(Some(Path::new("/no/such/chrome"))).unwrap_err();
        assert!(matches!(err, ChromeLocateError::NotExecutable { .. }));
        assert!(err.to_string().contains("/no/such/chrome"));
    }

    #[cfg(unix)]
    #[test]
    fn explicit_executable_path_wins() {
        let dir = tempfile::tempdir().unwrap();
        let exe = fake_executable(dir.path(), "my-chrome");
        assert_eq!(locate_chrome_with(Some(&exe)).unwrap(), exe);
    }

    #[cfg(unix)]
    #[test]
    fn non_executable_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chrome");
        std::fs::write(&path, "not a program").unwrap();
        assert!(!is_executable(&path));
    }

    #[cfg(unix)]
    #[test]
    fn path_search_finds_first_listed_name() {
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        fake_executable(second.path(), "chromium");
        let expected = fake_executable(second.path(), "google-chrome");

        let path_var = std::env::join_paths([first.path(), second.path()]).unwrap();
        let found = search_path(&["google-chrome", "chromium"], &path_var);
        assert_eq!(found, Some(expected));
    }

    #[test]
    fn path_search_with_empty_path_finds_nothing() {
        assert_eq!(search_path(executable_names(), OsStr::new("")), None);
    }

    #[test]
    fn not_found_message_mentions_env_var() {
        let msg = ChromeLocateError::NotFound { searched: 12 }.to_string();
        assert!(msg.contains("12 locations"));
        assert!(msg.contains(CHROME_PATH_ENV));
    }
}
