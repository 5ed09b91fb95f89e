//! Engine module: CLI surface over the pipeline

pub mod arg_parser;
pub mod cli;
pub mod ops;
pub mod progress;
pub mod report;

// Re-export commonly used functions
pub use arg_parser::Cli;
pub use cli::{apply_cli_to_opts, handle_run};
pub use ops::{Op, apply_op, handler_for, parse_task_values, tasks_from_values};
pub use report::{outcome_to_json, outcome_to_text};
