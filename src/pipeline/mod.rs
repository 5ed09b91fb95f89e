//! Pipeline components: queues, cancellation, dispatcher, workers, collector, orchestration.

pub mod cancel;
pub mod collector;
pub mod context;
pub mod dispatcher;
pub mod orchestrator;
pub mod queue;
pub mod worker;

pub use cancel::{CancelToken, DeadlineGuard};
pub use collector::{Collected, Collector};
pub use context::{PipelineChannels, PipelineHandles, create_pipeline_channels};
pub use dispatcher::{Dispatcher, spawn_dispatch_thread};
pub use orchestrator::{Pipeline, Shutdown, shutdown_pipeline_handles, start_pipeline};
pub use queue::{QueueReceiver, QueueSender, Take, bounded_queue};
pub use worker::{Handler, execute, spawn_workers};
