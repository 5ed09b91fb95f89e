//! Outcome output: plain `key=value` text or JSON.
//!
//! JSON field names are fixed by the record structs below; results are mapped into them
//! explicitly rather than serialized straight from the pipeline types.

use anyhow::{Context, Result};
use colored::Colorize;
use serde::Serialize;

use crate::{CancelReason, CollectStatus, PipelineOutcome, TaskId, TaskResult};

#[derive(Debug, Serialize)]
pub struct ResultRecord<'a, O> {
    #[serde(rename = "id")]
    pub task_id: TaskId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<&'a O>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<&'a str>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub panicked: bool,
    pub worker: usize,
    pub elapsed_us: u128,
}

impl<'a, O> From<&'a TaskResult<O>> for ResultRecord<'a, O> {
    fn from(r: &'a TaskResult<O>) -> Self {
        Self {
            task_id: r.task_id,
            output: r.output(),
            failure: r.failure().map(|f| f.message.as_str()),
            panicked: r.failure().is_some_and(|f| f.panicked),
            worker: r.worker,
            elapsed_us: r.elapsed.as_micros(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct OutcomeReport<'a, O> {
    pub status: CollectStatus,
    pub expected: usize,
    pub submitted: usize,
    pub delivered: usize,
    pub received: usize,
    pub failed: usize,
    pub cancel_reason: Option<CancelReason>,
    pub results: Vec<ResultRecord<'a, O>>,
}

impl<'a, O> From<&'a PipelineOutcome<O>> for OutcomeReport<'a, O> {
    fn from(o: &'a PipelineOutcome<O>) -> Self {
        Self {
            status: o.status,
            expected: o.expected,
            submitted: o.submitted,
            delivered: o.delivered,
            received: o.results.len(),
            failed: o.failures().count(),
            cancel_reason: o.cancel_reason,
            results: o.results.iter().map(ResultRecord::from).collect(),
        }
    }
}

pub fn outcome_to_json<O: Serialize>(outcome: &PipelineOutcome<O>) -> Result<String> {
    serde_json::to_string_pretty(&OutcomeReport::from(outcome)).context("serialize outcome")
}

fn status_str(status: CollectStatus) -> &'static str {
    match status {
        CollectStatus::Complete => "complete",
        CollectStatus::Cancelled => "cancelled",
        CollectStatus::Exhausted => "exhausted",
    }
}

fn reason_str(reason: Option<CancelReason>) -> &'static str {
    match reason {
        None => "none",
        Some(CancelReason::Requested) => "requested",
        Some(CancelReason::Deadline) => "deadline",
        Some(CancelReason::Interrupted) => "interrupted",
    }
}

/// Text report: one line per result in completion order, then `key=value` summary lines.
pub fn outcome_to_text<O: std::fmt::Display>(outcome: &PipelineOutcome<O>) -> String {
    let mut lines = Vec::with_capacity(outcome.results.len() + 6);
    for r in &outcome.results {
        let line = match &r.outcome {
            Ok(v) => format!("task {} -> {} (worker {})", r.task_id, v, r.worker),
            Err(f) => format!(
                "task {} -> {} {} (worker {})",
                r.task_id,
                "FAILED".red(),
                f,
                r.worker
            ),
        };
        lines.push(line);
    }
    lines.push(format!("status={}", status_str(outcome.status)));
    lines.push(format!("expected={}", outcome.expected));
    lines.push(format!("submitted={}", outcome.submitted));
    lines.push(format!("delivered={}", outcome.delivered));
    lines.push(format!("received={}", outcome.results.len()));
    lines.push(format!("failed={}", outcome.failures().count()));
    lines.push(format!("cancel_reason={}", reason_str(outcome.cancel_reason)));
    lines.join("\n")
}
