//! Background job scheduling and execution.
//!
//! Keeps recommendation precomputation off the interactive path: jobs run
//! on interval schedules or in response to hooks (startup, catalog
//! refresh), with cancellation on shutdown.

mod context;
mod job;
pub mod jobs;
mod scheduler;

pub use context::JobContext;
pub use job::{BackgroundJob, HookEvent, JobError, JobSchedule, ShutdownBehavior};
pub use scheduler::JobScheduler;
