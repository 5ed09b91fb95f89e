use clap::Parser;
use std::path::PathBuf;

use crate::engine::ops::Op;

struct DefaultArgs;

impl DefaultArgs {
    pub const CONFIG_DIR: &'static str = ".";
}

/// Bounded worker pool with cancellable dispatch.
#[derive(Clone, Parser)]
#[command(name = "workpipe")]
#[command(about = "Run integer tasks through a bounded worker pool; cancel on deadline, count or Ctrl+C.")]
pub struct Cli {
    /// Task payloads: integers or ranges (`1..5`, `1..=5`, `1,2,3`). Default: 1..=10.
    #[arg(value_name = "TASKS", allow_negative_numbers = true)]
    pub tasks: Vec<String>,

    /// Operation applied to each payload.
    #[arg(long, short = 'o', value_enum)]
    pub op: Option<Op>,

    /// Divisor for `--op divide`. Without it each task computes 100 / payload.
    #[arg(long, allow_negative_numbers = true)]
    pub divisor: Option<i64>,

    /// Delay in milliseconds before each task's op runs.
    #[arg(long, short = 's')]
    pub sleep_ms: Option<u64>,

    /// Number of worker threads. Default: available threads, clamped.
    #[arg(long, short = 'w')]
    pub workers: Option<usize>,

    /// Results to wait for. Default: number of tasks.
    #[arg(long)]
    pub expected: Option<usize>,

    /// Cancel the run after this many milliseconds.
    #[arg(long, short = 'd')]
    pub deadline_ms: Option<u64>,

    /// Cancel the run after this many results have been collected. 0 cancels before the run starts.
    #[arg(long)]
    pub cancel_after: Option<usize>,

    /// Task queue capacity.
    #[arg(long)]
    pub queue_cap: Option<usize>,

    /// Result sink capacity.
    #[arg(long)]
    pub sink_cap: Option<usize>,

    /// Print the outcome as JSON.
    #[arg(long, num_args = 0..=1, default_missing_value = "true", value_parser = clap::value_parser!(bool))]
    pub json: Option<bool>,

    /// Verbose output (debug logging and progress bar).
    #[arg(long, short = 'v', num_args = 0..=1, default_missing_value = "true", value_parser = clap::value_parser!(bool))]
    pub verbose: Option<bool>,

    /// Directory holding `.workpipe.toml` and `.env`. Default: current directory.
    #[arg(long, value_name = "DIR", default_value = DefaultArgs::CONFIG_DIR)]
    pub config_dir: PathBuf,
}
