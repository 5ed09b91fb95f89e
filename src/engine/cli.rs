//! CLI command handler: resolve options, run the pipeline, print the outcome.

use anyhow::{Context, Result};
use log::{debug, info, warn};
use std::time::Duration;

use crate::engine::arg_parser::Cli;
use crate::engine::ops::{handler_for, parse_task_values, tasks_from_values};
use crate::engine::progress::{finish_progress_bar, setup_progress, update_progress_bar};
use crate::engine::report::{outcome_to_json, outcome_to_text};
use crate::pipeline::CancelToken;
use crate::utils::{apply_env_to_opts, apply_file_to_opts, load_workpipe_toml, setup_logging};
use crate::{CancelReason, Opts, Pipeline};

/// Overwrite opts field from CLI when the flag was given.
macro_rules! apply_cli_opt {
    ($cli:expr, $opts:expr, $cli_field:ident => $($opts_field:ident).+) => {
        if let Some(v) = $cli.$cli_field {
            $opts.$($opts_field).+ = v;
        }
    };
}

/// Apply CLI flags on top of opts (file and env already applied).
pub fn apply_cli_to_opts(cli: &Cli, opts: &mut Opts) {
    apply_cli_opt!(cli, opts, workers => pipeline.workers);
    apply_cli_opt!(cli, opts, queue_cap => pipeline.queue_capacity);
    apply_cli_opt!(cli, opts, sink_cap => pipeline.sink_capacity);
    if let Some(ms) = cli.deadline_ms {
        opts.pipeline.deadline = Some(Duration::from_millis(ms));
    }
    if cli.expected.is_some() {
        opts.pipeline.expected = cli.expected;
    }
    apply_cli_opt!(cli, opts, op => op);
    if cli.divisor.is_some() {
        opts.divisor = cli.divisor;
    }
    apply_cli_opt!(cli, opts, sleep_ms => sleep_ms);
    if cli.cancel_after.is_some() {
        opts.cancel_after = cli.cancel_after;
    }
    apply_cli_opt!(cli, opts, json => json);
    apply_cli_opt!(cli, opts, verbose => verbose);
}

/// Ctrl+C cancels the run; in-flight tasks finish and the partial outcome is still printed.
fn install_interrupt_handler(token: &CancelToken) -> Result<()> {
    let token = token.clone();
    ctrlc::set_handler(move || {
        token.cancel_with(CancelReason::Interrupted);
    })
    .context("set Ctrl+C handler")
}

/// Resolve options (defaults → .workpipe.toml → env/.env → flags), set up logging, run, report.
/// Returns an error when the run did not complete, after the report is printed.
pub fn handle_run(cli: &Cli) -> Result<()> {
    let mut opts = Opts::default();
    let file = load_workpipe_toml(&cli.config_dir);
    if let Ok(Some(file)) = &file {
        apply_file_to_opts(file, &mut opts);
    }
    // Flags first so `--verbose` reaches the logger before env loading logs anything.
    apply_cli_to_opts(cli, &mut opts);
    setup_logging(opts.verbose);
    if let Err(e) = &file {
        warn!("ignoring config file: {:#}", e);
    }
    apply_env_to_opts(&cli.config_dir, &mut opts)?;
    apply_cli_to_opts(cli, &mut opts);
    debug!(
        "{} CONFIG:{:#?}",
        env!("CARGO_PKG_NAME").to_string().to_uppercase(),
        opts
    );

    let tasks = tasks_from_values(parse_task_values(&cli.tasks)?);
    let expected = opts.pipeline.expected.unwrap_or(tasks.len());
    let pipeline = Pipeline::new(opts.pipeline.clone());
    let token = pipeline.cancel_token();
    install_interrupt_handler(&token)?;

    let bar = setup_progress(opts.verbose && !opts.json, expected);
    let cancel_after = opts.cancel_after;
    // The per-result callback never runs for a limit of 0.
    if cancel_after == Some(0) && token.cancel() {
        info!("cancelling before any result");
    }
    let mut collected = 0_usize;
    let outcome = pipeline.run_with(tasks, handler_for(&opts), |_| {
        collected += 1;
        if let Some(bar) = &bar {
            update_progress_bar(bar, 1);
        }
        if cancel_after.is_some_and(|n| collected >= n) && token.cancel() {
            info!("cancelling after {} results", collected);
        }
    })?;
    if let Some(bar) = &bar {
        finish_progress_bar(bar);
    }

    if opts.json {
        println!("{}", outcome_to_json(&outcome)?);
    } else {
        println!("{}", outcome_to_text(&outcome));
    }
    outcome.ensure_complete()?;
    Ok(())
}
