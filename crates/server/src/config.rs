// crates/server/src/config.rs
//! Configuration layer (§10.3). Load order: built-in default -> config
//! file (created with defaults on first run if absent) -> environment
//! variable override. Mirrors `turnlog_core::paths`'s centralized
//! path-resolution module, generalized to also resolve a sessions root.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use turnlog_core::paths;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub sessions_root: PathBuf,
}

impl Config {
    /// Loads the config file if present, falling back to the built-in
    /// default; writes the default back to disk when no file exists yet.
    /// The `TURNLOG_SESSIONS_ROOT` environment variable overrides whatever
    /// the file says.
    pub fn load() -> anyhow::Result<Self> {
        let file_path = paths::config_file_path();
        let from_file = file_path.as_deref().and_then(Self::read_file);

        let sessions_root = from_file.as_ref().map(|c| c.sessions_root.clone());
        let resolved = paths::resolve_sessions_root(sessions_root)
            .ok_or_else(|| anyhow::anyhow!("could not resolve a sessions root (no config dir on this platform)"))?;

        let config = Config { sessions_root: resolved };

        if from_file.is_none() {
            if let Some(path) = file_path.as_deref() {
                config.write_file(path)?;
            }
        }

        Ok(config)
    }

    fn read_file(path: &std::path::Path) -> Option<Self> {
        let bytes = std::fs::read(path).ok()?;
        serde_json::from_slice(&bytes).ok()
    }

    fn write_file(&self, path: &std::path::Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let bytes = serde_json::to_vec_pretty(self)?;
        std::fs::write(path, bytes)?;
        Ok(())
    }

    pub fn db_path(&self) -> anyhow::Result<PathBuf> {
        paths::db_path().ok_or_else(|| anyhow::anyhow!("could not resolve the database path on this platform"))
    }
}
