//! Service layer for Cadence
//!
//! `CadenceService` is the single entry point used by the binaries. It owns
//! the shared resources (database, rate limiter, dispatcher) and the
//! scheduler with its six standard triggers.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use libcadence::platforms::{mock::MockPlatform, PlatformRegistry};
//! use libcadence::service::{CadenceService, TaskRequest};
//! use libcadence::types::PlatformKind;
//! use libcadence::Config;
//!
//! # async fn example() -> libcadence::Result<()> {
//! let mut registry = PlatformRegistry::new();
//! registry.register(Arc::new(MockPlatform::dry_run(PlatformKind::Twitter)));
//!
//! let service = CadenceService::from_config(Config::load()?, registry).await?;
//! let task = service
//!     .schedule_task(TaskRequest::new("follow", "twitter", "rustlang", "follow"))
//!     .await?;
//! println!("Queued {}", task.id);
//!
//! service.start()?;
//! # service.stop_all_schedulers().await;
//! # Ok(())
//! # }
//! ```

pub mod requests;

pub use requests::{PostRequest, TaskRequest};

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::config::Config;
use crate::db::Database;
use crate::dispatcher::Dispatcher;
use crate::error::{CadenceError, PlatformError, Result};
use crate::jobs::default_triggers;
use crate::platforms::PlatformRegistry;
use crate::rate_limiter::RateLimiter;
use crate::retry::RetryPolicy;
use crate::scheduler::{Scheduler, TickSummary, TriggerStatus};
use crate::types::{ScheduledPost, Task, TaskEdit};

pub struct CadenceService {
    db: Database,
    config: Arc<Config>,
    limiter: Arc<RateLimiter>,
    dispatcher: Arc<Dispatcher>,
    scheduler: Scheduler,
}

impl CadenceService {
    /// Create a service from the default configuration file
    pub async fn new(registry: PlatformRegistry) -> Result<Self> {
        let config = Config::load()?;
        Self::from_config(config, registry).await
    }

    /// Create a service with a custom configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the database
    /// cannot be opened and migrated.
    pub async fn from_config(config: Config, registry: PlatformRegistry) -> Result<Self> {
        config.validate()?;
        let db = Database::new(&config.database_path()).await?;
        Self::with_database(config, db, registry)
    }

    /// Wire the service around an already opened database
    pub fn with_database(config: Config, db: Database, registry: PlatformRegistry) -> Result<Self> {
        let scheduling = &config.scheduling;
        let limiter = Arc::new(RateLimiter::new(scheduling.platform_rate_limits()?));

        let dispatcher = Dispatcher::new(Arc::new(db.clone()), registry, limiter.clone())
            .with_retry_policy(RetryPolicy::new(
                scheduling.retry_policy,
                scheduling.retry_delay,
            ))
            .with_timeout(scheduling.adapter_timeout());
        let dispatcher = Arc::new(dispatcher);

        let mut scheduler = Scheduler::new();
        for trigger in default_triggers(scheduling, Arc::clone(&dispatcher))? {
            scheduler.add(trigger)?;
        }

        Ok(Self {
            db,
            config: Arc::new(config),
            limiter,
            dispatcher,
            scheduler,
        })
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    /// Validate and queue a task as `pending`
    pub async fn schedule_task(&self, request: TaskRequest) -> Result<Task> {
        let task = request.into_task(chrono::Utc::now().timestamp())?;
        self.db.create_task(&task).await?;

        tracing::info!(
            task_id = %task.id,
            task_type = %task.task_type,
            platform = %task.platform,
            priority = task.priority,
            "Task scheduled"
        );
        Ok(task)
    }

    /// Queue many tasks; one invalid request does not block the rest
    pub async fn schedule_tasks(&self, requests: Vec<TaskRequest>) -> Vec<Result<Task>> {
        let mut results = Vec::with_capacity(requests.len());
        for request in requests {
            results.push(self.schedule_task(request).await);
        }
        results
    }

    /// Edit a task that has not been executed yet
    pub async fn update_pending_task(&self, id: &str, edit: TaskEdit) -> Result<Task> {
        if edit.is_empty() {
            return Err(CadenceError::InvalidInput("Nothing to update".to_string()));
        }
        if edit.action.as_deref().is_some_and(|a| a.trim().is_empty()) {
            return Err(CadenceError::InvalidInput("Action cannot be empty".to_string()));
        }

        if !self.db.update_pending_task(id, &edit).await? {
            return Err(match self.db.get_task(id).await? {
                Some(task) => CadenceError::InvalidInput(format!(
                    "Task {} is {} and can no longer be edited",
                    id, task.status
                )),
                None => CadenceError::InvalidInput(format!("Task not found: {}", id)),
            });
        }

        self.db
            .get_task(id)
            .await?
            .ok_or_else(|| CadenceError::InvalidInput(format!("Task not found: {}", id)))
    }

    /// Validate and store a post for later publication
    pub async fn schedule_post(&self, request: PostRequest) -> Result<ScheduledPost> {
        let post = request.into_post(chrono::Utc::now().timestamp())?;

        if let Some(adapter) = self.dispatcher.platforms().get(post.platform) {
            adapter.validate_content(&post.content).map_err(|e| match e {
                CadenceError::Platform(PlatformError::Validation(msg)) => {
                    CadenceError::InvalidInput(msg)
                }
                other => other,
            })?;
        }

        self.db.create_post(&post).await?;
        tracing::info!(id = %post.id, platform = %post.platform, "Post scheduled for {}", post.scheduled_time);
        Ok(post)
    }

    /// Start every trigger loop
    pub fn start(&self) -> Result<()> {
        self.scheduler.start()
    }

    pub fn scheduler_status(&self) -> BTreeMap<String, TriggerStatus> {
        self.scheduler.status()
    }

    pub async fn run_trigger_now(&self, name: &str) -> Result<Option<TickSummary>> {
        self.scheduler.run_now(name).await
    }

    /// Run each trigger once in name order, as the daemon's `--once` does
    pub async fn run_all_once(&self) -> BTreeMap<String, Option<TickSummary>> {
        self.scheduler.run_all_once().await
    }

    pub async fn stop_all_schedulers(&self) {
        self.scheduler.stop_all().await
    }
}
