//! Load `.workpipe.toml` from a directory (CLI only). Lib does not use this; callers pass PipelineOpts directly.

use anyhow::Context;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::Opts;
use crate::engine::ops::Op;
use crate::utils::config::PackagePaths;

#[derive(Debug, Default, Deserialize)]
pub struct WorkpipeToml {
    #[serde(default)]
    settings: RunSection,
}

#[derive(Debug, Default, Deserialize)]
struct RunSection {
    workers: Option<usize>,
    queue_cap: Option<usize>,
    sink_cap: Option<usize>,
    deadline_ms: Option<u64>,
    op: Option<Op>,
    sleep_ms: Option<u64>,
    verbose: Option<bool>,
    json: Option<bool>,
}

/// Parse config text. Errors carry the toml crate's line/column message.
pub fn parse_workpipe_toml(s: &str) -> Result<WorkpipeToml, toml::de::Error> {
    toml::from_str(s)
}

/// Load `.workpipe.toml` from `dir`. Ok(None) if the file is missing or unreadable; Err if it is malformed.
/// Does not log, so it can run before the logger is set up.
pub fn load_workpipe_toml(dir: &Path) -> anyhow::Result<Option<WorkpipeToml>> {
    let path = dir.join(PackagePaths::get().config_filename());
    let Ok(s) = std::fs::read_to_string(&path) else {
        return Ok(None);
    };
    let file = parse_workpipe_toml(&s).with_context(|| path.display().to_string())?;
    Ok(Some(file))
}

/// Overwrite opts field from file when present.
macro_rules! apply_file_opt {
    ($sec:expr, $opts:expr, $sec_field:ident => $($opts_field:ident).+) => {
        if let Some(v) = $sec.$sec_field {
            $opts.$($opts_field).+ = v;
        }
    };
}

/// Apply file config to opts (only fields present in the file). Call before env and CLI.
pub fn apply_file_to_opts(file: &WorkpipeToml, opts: &mut Opts) {
    let sec = &file.settings;
    apply_file_opt!(sec, opts, workers => pipeline.workers);
    apply_file_opt!(sec, opts, queue_cap => pipeline.queue_capacity);
    apply_file_opt!(sec, opts, sink_cap => pipeline.sink_capacity);
    if let Some(ms) = sec.deadline_ms {
        opts.pipeline.deadline = Some(Duration::from_millis(ms));
    }
    apply_file_opt!(sec, opts, op => op);
    apply_file_opt!(sec, opts, sleep_ms => sleep_ms);
    apply_file_opt!(sec, opts, verbose => verbose);
    apply_file_opt!(sec, opts, json => json);
}
