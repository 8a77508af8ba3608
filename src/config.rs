//! Optional `config.toml` layer (§6.4): sets a default database path so
//! `--db` doesn't need repeating on every invocation. CLI flags always win.
//!
//! Grounded in the teacher's `FileConfig`/`load_file_config` pair
//! (`main.rs`), generalized from Zed's multi-field config down to the one
//! setting this crate needs.

use eyre::{Context, Result, eyre};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_DB_FILE: &str = "hackerbro.db";

#[derive(Deserialize, Default)]
pub struct FileConfig {
    pub db_path: Option<PathBuf>,
}

/// Load `explicit_path` if given, else the OS config dir's
/// `hackerbro/config.toml` if it exists, else an empty (all-default)
/// config. An explicit path that doesn't exist is an error; an
/// auto-discovered one that doesn't exist is silently skipped.
pub fn load_file_config(explicit_path: Option<&Path>) -> Result<FileConfig> {
    let path = if let Some(p) = explicit_path {
        if !p.exists() {
            return Err(eyre!("config file not found: {}", p.display()));
        }
        Some(p.to_path_buf())
    } else {
        dirs::config_dir()
            .map(|d| d.join("hackerbro/config.toml"))
            .filter(|p| p.exists())
    };

    match path {
        None => Ok(FileConfig::default()),
        Some(p) => {
            let content = fs::read_to_string(&p)
                .wrap_err_with(|| format!("failed to read config: {}", p.display()))?;
            toml::from_str(&content).wrap_err_with(|| format!("failed to parse config: {}", p.display()))
        }
    }
}

/// Resolve the effective database path: CLI flag, then config file, then
/// `hackerbro.db` in the current directory.
pub fn resolve_db_path(cli_db: Option<PathBuf>, file_cfg: &FileConfig) -> PathBuf {
    cli_db
        .or_else(|| file_cfg.db_path.clone())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_FILE))
}
