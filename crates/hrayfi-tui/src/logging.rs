//! File logging. The terminal belongs to the UI, so log lines go to
//! `<data_local_dir>/hrayfi/hrayfi.log`.

use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{anyhow, Result};
use tracing_subscriber::EnvFilter;

/// Filter directives are read from this variable, e.g. `HRAYFI_LOG=debug`.
pub const LOG_ENV: &str = "HRAYFI_LOG";

pub fn init() -> Result<PathBuf> {
    let dir = dirs::data_local_dir()
        .ok_or_else(|| anyhow!("Could not determine data directory"))?
        .join("hrayfi");
    fs::create_dir_all(&dir)?;

    let path = dir.join("hrayfi.log");
    let file = OpenOptions::new().create(true).append(true).open(&path)?;

    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init()
        .map_err(|e| anyhow!("Failed to install log subscriber: {e}"))?;

    Ok(path)
}
