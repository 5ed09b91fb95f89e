//! Environment overrides: process env → .env in dir. Applied after the config file, before CLI flags.

use anyhow::{Context, Result};
use log::{debug, warn};
use std::path::Path;
use std::time::Duration;

use crate::Opts;
use crate::utils::config::PackagePaths;

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Read `key` (e.g. `WORKERS` → `WORKPIPE_WORKERS`) from the env, falling back to `.env` in `dir`.
pub fn env_override(dir: &Path, key: &str) -> Option<String> {
    let name = PackagePaths::get().env_var(key);
    if let Some(s) = non_empty_var(&name) {
        return Some(s);
    }
    let env_path = dir.join(".env");
    if env_path.is_file() {
        if let Err(e) = dotenvy::from_path(&env_path) {
            warn!("could not load {}: {}", env_path.display(), e);
        }
        return non_empty_var(&name);
    }
    None
}

/// Apply `WORKPIPE_WORKERS` and `WORKPIPE_DEADLINE_MS` to opts. A value that does not parse is an error.
pub fn apply_env_to_opts(dir: &Path, opts: &mut Opts) -> Result<()> {
    if let Some(s) = env_override(dir, "workers") {
        opts.pipeline.workers = s
            .parse()
            .with_context(|| format!("{}={s}", PackagePaths::get().env_var("workers")))?;
        debug!("workers from environment: {}", opts.pipeline.workers);
    }
    if let Some(s) = env_override(dir, "deadline_ms") {
        let ms: u64 = s
            .parse()
            .with_context(|| format!("{}={s}", PackagePaths::get().env_var("deadline_ms")))?;
        opts.pipeline.deadline = Some(Duration::from_millis(ms));
        debug!("deadline from environment: {}ms", ms);
    }
    Ok(())
}
