//! Pipeline components: path sources, cancellation, execution strategies, and the coordinator.

pub mod cancel;
pub mod context;
pub mod error_handler;
pub mod orchestrator;
pub mod source;
pub mod strategy;

pub use cancel::{CancelSource, CancellationToken};
pub use context::{EnumerationOutcome, PipelineChannels, PipelineContext, PipelineStats, create_pipeline_channels};
pub use error_handler::collect_results;
pub use orchestrator::{DigestStream, run_pipeline};
pub use source::{Enumeration, PathSource, SourceItem};
pub use strategy::{dispatch, parallel_worker_cap};
