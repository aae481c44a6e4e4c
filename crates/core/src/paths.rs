//! Centralized path functions for all app storage locations.
//!
//! Single source of truth — eliminates ad-hoc `dirs::*_dir().join(...)` scattered across crates.

use std::env;
use std::path::PathBuf;

const APP_DIR_NAME: &str = "turnlog";
const SESSIONS_ROOT_ENV: &str = "TURNLOG_SESSIONS_ROOT";

/// App config root: `~/Library/Application Support/turnlog/` (macOS) or
/// `~/.config/turnlog/` (Linux).
pub fn app_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(APP_DIR_NAME))
}

/// App cache root: `~/Library/Caches/turnlog/` (macOS) or `~/.cache/turnlog/` (Linux).
pub fn app_cache_dir() -> Option<PathBuf> {
    dirs::cache_dir().map(|d| d.join(APP_DIR_NAME))
}

/// SQLite database file: `<app_cache_dir>/turnlog.db`.
pub fn db_path() -> Option<PathBuf> {
    app_cache_dir().map(|d| d.join("turnlog.db"))
}

/// Config file carrying `{"sessionsRoot": "..."}`: `<app_config_dir>/config.json`.
pub fn config_file_path() -> Option<PathBuf> {
    app_config_dir().map(|d| d.join("config.json"))
}

/// Conventional default sessions root, used when neither the environment
/// variable nor the config file name one: `~/.local/share/turnlog/sessions`
/// (Linux/macOS convention for user-local application data).
pub fn default_sessions_root() -> Option<PathBuf> {
    dirs::data_dir().map(|d| d.join(APP_DIR_NAME).join("sessions"))
}

/// Resolves the sessions root with the precedence described in SPEC_FULL.md
/// §10.3: environment variable overrides the config-supplied value, which
/// overrides the built-in default.
pub fn resolve_sessions_root(configured: Option<PathBuf>) -> Option<PathBuf> {
    if let Ok(from_env) = env::var(SESSIONS_ROOT_ENV) {
        if !from_env.is_empty() {
            return Some(PathBuf::from(from_env));
        }
    }
    configured.or_else(default_sessions_root)
}

/// Why a caller-supplied relative path was rejected by [`validate_session_path`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathSafetyError {
    Empty,
    ContainsNul,
    Absolute,
    ParentTraversal,
    EscapesRoot,
}

/// Validates a root-relative session path per §6 "Path safety": rejects an
/// empty path, a NUL byte, an absolute path, any `..` segment, and (as a
/// last resort, for anything cleverer than a literal `..`) a resolved path
/// that doesn't stay under `root`.
pub fn validate_session_path(root: &std::path::Path, relative: &str) -> Result<PathBuf, PathSafetyError> {
    if relative.is_empty() {
        return Err(PathSafetyError::Empty);
    }
    if relative.contains('\0') {
        return Err(PathSafetyError::ContainsNul);
    }
    let candidate = std::path::Path::new(relative);
    if candidate.is_absolute() {
        return Err(PathSafetyError::Absolute);
    }
    if candidate.components().any(|c| matches!(c, std::path::Component::ParentDir)) {
        return Err(PathSafetyError::ParentTraversal);
    }

    let resolved = root.join(candidate);
    let root_with_sep = {
        let mut s = root.to_string_lossy().into_owned();
        if !s.ends_with(std::path::MAIN_SEPARATOR) {
            s.push(std::path::MAIN_SEPARATOR);
        }
        s
    };
    let resolved_str = resolved.to_string_lossy();
    if resolved_str != root.to_string_lossy() && !resolved_str.starts_with(&root_with_sep) {
        return Err(PathSafetyError::EscapesRoot);
    }

    Ok(resolved)
}


#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Serializes tests that touch the process environment variable.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn test_app_cache_dir() {
        let dir = app_cache_dir().unwrap();
        assert!(dir.to_string_lossy().contains("turnlog"));
    }

    #[test]
    fn test_db_path() {
        let path = db_path().unwrap();
        assert!(path.to_string_lossy().ends_with("turnlog.db"));
    }

    #[test]
    fn test_config_file_path() {
        let path = config_file_path().unwrap();
        assert!(path.to_string_lossy().ends_with("config.json"));
    }

    #[test]
    fn test_resolve_sessions_root_prefers_env() {
        let _guard = ENV_LOCK.lock().unwrap();
        env::set_var(SESSIONS_ROOT_ENV, "/tmp/from-env");
        let resolved = resolve_sessions_root(Some(PathBuf::from("/tmp/from-config")));
        env::remove_var(SESSIONS_ROOT_ENV);
        assert_eq!(resolved, Some(PathBuf::from("/tmp/from-env")));
    }

    #[test]
    fn test_resolve_sessions_root_falls_back_to_configured() {
        let _guard = ENV_LOCK.lock().unwrap();
        env::remove_var(SESSIONS_ROOT_ENV);
        let resolved = resolve_sessions_root(Some(PathBuf::from("/tmp/from-config")));
        assert_eq!(resolved, Some(PathBuf::from("/tmp/from-config")));
    }

    #[test]
    fn test_resolve_sessions_root_falls_back_to_default() {
        let _guard = ENV_LOCK.lock().unwrap();
        env::remove_var(SESSIONS_ROOT_ENV);
        let resolved = resolve_sessions_root(None);
        assert!(resolved.is_some());
    }
}
