//! Built-in payload functions and task-list parsing for the CLI.

use anyhow::{Context, Result, anyhow, bail};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::thread;
use std::time::Duration;

use crate::utils::config::{DEFAULT_DIVIDEND, DEFAULT_TASK_RANGE};
use crate::{Opts, Task, TaskId};

/// Operation applied to every integer payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Op {
    Double,
    Square,
    Negate,
    /// `payload / divisor`, or `100 / payload` when no divisor is set.
    Divide,
    /// Identity after the per-task delay.
    Sleep,
}

/// Apply `op` to `x`. Overflow and division by zero are errors.
pub fn apply_op(op: Op, x: i64, divisor: Option<i64>) -> Result<i64> {
    match op {
        Op::Double => x.checked_mul(2).ok_or_else(|| anyhow!("{x} * 2 overflows")),
        Op::Square => x.checked_mul(x).ok_or_else(|| anyhow!("{x}^2 overflows")),
        Op::Negate => x.checked_neg().ok_or_else(|| anyhow!("-({x}) overflows")),
        Op::Divide => {
            let (dividend, divisor) = match divisor {
                Some(d) => (x, d),
                None => (DEFAULT_DIVIDEND, x),
            };
            if divisor == 0 {
                bail!("division by zero ({dividend} / 0)");
            }
            dividend
                .checked_div(divisor)
                .ok_or_else(|| anyhow!("{dividend} / {divisor} overflows"))
        }
        Op::Sleep => Ok(x),
    }
}

/// Build the payload function for `opts`: optional delay, then the op.
pub fn handler_for(opts: &Opts) -> impl Fn(i64) -> Result<i64> + Send + Sync + 'static {
    let op = opts.op;
    let divisor = opts.divisor;
    let delay = Duration::from_millis(opts.sleep_ms);
    move |x| {
        if !delay.is_zero() {
            thread::sleep(delay);
        }
        apply_op(op, x, divisor)
    }
}

fn parse_bound(s: &str, arg: &str) -> Result<i64> {
    s.trim()
        .parse::<i64>()
        .with_context(|| format!("invalid task value `{arg}`"))
}

/// Parse task payloads from CLI args: integers or ranges (`1..5`, `1..=5`). Empty → `1..=10`.
pub fn parse_task_values(args: &[String]) -> Result<Vec<i64>> {
    if args.is_empty() {
        return Ok(DEFAULT_TASK_RANGE.collect());
    }
    let mut values = Vec::new();
    for arg in args {
        for part in arg.split(',').filter(|p| !p.trim().is_empty()) {
            if let Some((lo, hi)) = part.split_once("..=") {
                values.extend(parse_bound(lo, arg)?..=parse_bound(hi, arg)?);
            } else if let Some((lo, hi)) = part.split_once("..") {
                values.extend(parse_bound(lo, arg)?..parse_bound(hi, arg)?);
            } else {
                values.push(parse_bound(part, arg)?);
            }
        }
    }
    Ok(values)
}

/// Wrap payloads into tasks with ids 1.. in submission order.
pub fn tasks_from_values(values: Vec<i64>) -> Vec<Task<i64>> {
    values
        .into_iter()
        .zip(1..)
        .map(|(payload, id): (i64, TaskId)| Task::new(id, payload))
        .collect()
}
