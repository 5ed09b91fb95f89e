//! Application configuration constants.
//! Tuning and defaults in one place.

use std::sync::OnceLock;

// ---- Package / paths (from CARGO_PKG_NAME, cached) ----

/// Package-derived names: built once from `CARGO_PKG_NAME`, then cached.
pub struct PackagePaths {
    pkg_name: &'static str,
    config_filename: String,
    env_prefix: String,
}

static PACKAGE_PATHS: OnceLock<PackagePaths> = OnceLock::new();

impl PackagePaths {
    /// Build and cache names from `CARGO_PKG_NAME`. Called once on first use.
    pub fn get() -> &'static PackagePaths {
        PACKAGE_PATHS.get_or_init(|| {
            let pkg = env!("CARGO_PKG_NAME");
            PackagePaths {
                pkg_name: pkg,
                config_filename: format!(".{pkg}.toml"),
                env_prefix: pkg.to_uppercase(),
            }
        })
    }

    pub fn pkg_name(&self) -> &str {
        self.pkg_name
    }

    /// Config file looked up in the working directory (e.g. `.workpipe.toml`).
    pub fn config_filename(&self) -> &str {
        &self.config_filename
    }

    /// Environment variable name for `key`, e.g. `WORKPIPE_WORKERS`.
    pub fn env_var(&self, key: &str) -> String {
        format!("{}_{}", self.env_prefix, key.to_uppercase())
    }
}

// ---- Worker threads ----

/// Worker count limits. Use [`WorkerLimits::current()`] to fill `all_threads` from rayon; the rest are const.
#[derive(Clone, Copy, Debug)]
pub struct WorkerLimits {
    /// Available threads (from rayon); set by [`WorkerLimits::current()`].
    pub all_threads: usize,
    /// Floor for the default worker count.
    pub floor: usize,
    /// Ceiling for the default worker count (explicit counts may exceed it).
    pub default_max: usize,
}

impl Default for WorkerLimits {
    fn default() -> Self {
        Self {
            all_threads: 0, // use current() to set from rayon
            floor: Self::FLOOR_WORKERS,
            default_max: Self::DEFAULT_MAX_WORKERS,
        }
    }
}

impl WorkerLimits {
    pub const FLOOR_WORKERS: usize = 2;
    pub const DEFAULT_MAX_WORKERS: usize = 16;

    /// Build limits with `all_threads` set from `rayon::current_num_threads()`.
    pub fn current() -> Self {
        Self {
            all_threads: rayon::current_num_threads(),
            ..Self::default()
        }
    }

    /// Default worker count: available threads clamped to `[floor, default_max]`.
    pub fn default_workers(&self) -> usize {
        self.all_threads.clamp(self.floor, self.default_max)
    }
}

// ---- Queue capacities ----

/// Default capacities for the task queue and result sink.
pub struct QueueConsts;

impl QueueConsts {
    /// Task queue: small, so the dispatcher feels backpressure early.
    pub const DEFAULT_QUEUE_CAP: usize = 64;
    /// Result sink: larger, so workers rarely wait on a slow collector.
    pub const DEFAULT_SINK_CAP: usize = 256;
}

// ---- CLI defaults ----

/// Task payloads when none are given on the command line (`1..=10`).
pub const DEFAULT_TASK_RANGE: std::ops::RangeInclusive<i64> = 1..=10;

/// Dividend used by the `divide` op when no divisor is given.
pub const DEFAULT_DIVIDEND: i64 = 100;
