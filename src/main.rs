//! Workpipe CLI: run integer tasks through a bounded, cancellable worker pool.

use anyhow::Result;
use clap::Parser;
use std::time::Instant;
use workpipe::engine::arg_parser::Cli;
use workpipe::engine::handle_run;

fn main() -> Result<()> {
    let start_time = Instant::now();
    let cli = Cli::parse();
    handle_run(&cli)?;
    log::debug!("Total time: {:?}", start_time.elapsed());
    Ok(())
}
