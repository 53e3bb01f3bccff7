//! Parallel upload engine
//!
//! A fixed pool of worker threads drains a bounded work queue fed by the
//! collector. Each worker owns one transport for its whole lifetime.
//!
//! # Architecture
//!
//! ```text
//!                     ┌─────────────────────────┐
//!                     │   UploadCoordinator     │
//!                     │  - Collector (producer) │
//!                     │  - blocks when full     │
//!                     └───────────┬─────────────┘
//!                                 │ WorkQueue (bounded, FIFO)
//!       ┌─────────────────────────┼─────────────────────────┐
//!       │                         │                         │
//! ┌─────▼─────┐             ┌─────▼─────┐             ┌─────▼─────┐
//! │  Worker 1 │             │  Worker 2 │             │  Worker N │
//! │ validate  │             │ validate  │             │ validate  │
//! │ Transport │             │ Transport │             │ Transport │
//! └─────┬─────┘             └─────┬─────┘             └─────┬─────┘
//!       └─────────────────────────┼─────────────────────────┘
//!                                 ▼
//!                         UploadStats (atomics)
//! ```

pub mod coordinator;
pub mod queue;
pub mod stats;
pub mod worker;

pub use coordinator::{UploadCoordinator, UploadResult};
pub use queue::{CloseGuard, QueueStats, UploadJob, WorkQueue, WorkQueueReceiver};
pub use stats::{StatsSnapshot, UploadStats};
pub use worker::{process_job, validate_file, Worker, WorkerContext, WorkerStats};
