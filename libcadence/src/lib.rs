//! Cadence - scheduling and rate-limited execution for social media work
//!
//! This library holds the engine shared by the `cadence-send` daemon and
//! the `cadence-queue` CLI: the task and post store, the per-platform rate
//! limiter, the dispatcher that drives platform adapters, and the periodic
//! triggers that feed it.

pub mod config;
pub mod db;
pub mod dispatcher;
pub mod error;
pub mod jobs;
pub mod logging;
pub mod operations;
pub mod platforms;
pub mod rate_limiter;
pub mod repository;
pub mod retry;
pub mod scheduler;
pub mod scheduling;
pub mod service;
pub mod types;

// Re-export commonly used types
pub use config::Config;
pub use db::Database;
pub use dispatcher::{Dispatcher, PublishOutcome, TaskOutcome};
pub use error::{CadenceError, Result};
pub use repository::Repository;
pub use scheduler::{OverlapPolicy, Scheduler, TickSummary, Trigger};
pub use service::CadenceService;
pub use types::{PlatformKind, ScheduledPost, Task, TaskStatus, TaskType};
