//! Path utilities for Mnemo directory resolution.

use anyhow::Result;
use std::path::PathBuf;

const MNEMO_DIR: &str = ".mnemo";
const DB_FILE: &str = "mnemo.db";

/// Environment variable to override the Mnemo directory.
const MNEMO_DIR_ENV: &str = "MNEMO_DIR";

/// Resolve the Mnemo data directory.
/// Priority: MNEMO_DIR env var > ~/.mnemo/
pub fn resolve_mnemo_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(MNEMO_DIR_ENV)
        && !dir.trim().is_empty()
    {
        return Ok(PathBuf::from(dir));
    }
    dirs::home_dir()
        .map(|h| h.join(MNEMO_DIR))
        .ok_or_else(|| anyhow::anyhow!("Failed to determine home directory"))
}

/// Ensure the Mnemo directory exists and return its path.
pub fn ensure_mnemo_dir() -> Result<PathBuf> {
    let dir = resolve_mnemo_dir()?;
    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}

/// Default database path: ~/.mnemo/mnemo.db
pub fn default_db_path() -> Result<PathBuf> {
    Ok(ensure_mnemo_dir()?.join(DB_FILE))
}
