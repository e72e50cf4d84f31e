//! Jobs run by the default triggers
//!
//! Each job selects its due items (bounded by the batch limit) and handles
//! them one after another. A failing item is counted and logged, and the
//! tick moves on to the next one. Task triggers overlap in the types they
//! select; a task another tick already claimed is counted as skipped.

use async_trait::async_trait;
use chrono::{Days, Utc};
use std::sync::Arc;

use crate::config::{parse_interval, SchedulingConfig};
use crate::dispatcher::Dispatcher;
use crate::error::Result;
use crate::repository::Repository;
use crate::scheduler::{Job, OverlapPolicy, TickSummary, Trigger};
use crate::types::TaskType;

pub const PUBLISH_POSTS: &str = "publish-posts";
pub const INTERACTION_TASKS: &str = "interaction-tasks";
pub const MONITOR_TRENDS: &str = "monitor-trends";
pub const SCRAPE_TASKS: &str = "scrape-tasks";
pub const GENERIC_TASKS: &str = "generic-tasks";
pub const DAILY_ANALYTICS: &str = "daily-analytics";

/// Executes due tasks of the given types
pub struct TaskBatchJob {
    dispatcher: Arc<Dispatcher>,
    /// Empty means every type
    types: Vec<TaskType>,
    batch_limit: usize,
}

impl TaskBatchJob {
    pub fn new(dispatcher: Arc<Dispatcher>, types: &[TaskType], batch_limit: usize) -> Self {
        Self {
            dispatcher,
            types: types.to_vec(),
            batch_limit,
        }
    }
}

#[async_trait]
impl Job for TaskBatchJob {
    async fn run(&self) -> Result<TickSummary> {
        let now = Utc::now().timestamp();
        let tasks = self
            .dispatcher
            .repository()
            .find_due_tasks(now, &self.types, self.batch_limit)
            .await?;

        let mut summary = TickSummary {
            selected: tasks.len(),
            ..Default::default()
        };

        for task in &tasks {
            match self.dispatcher.execute(task).await {
                Ok(Some(outcome)) => summary.record(outcome.succeeded()),
                Ok(None) => summary.skipped += 1,
                Err(e) => {
                    tracing::error!(task_id = %task.id, "Failed to record task outcome: {}", e);
                    summary.errors += 1;
                }
            }
        }

        Ok(summary)
    }
}

/// Publishes due scheduled posts
pub struct PublishPostsJob {
    dispatcher: Arc<Dispatcher>,
    batch_limit: usize,
}

impl PublishPostsJob {
    pub fn new(dispatcher: Arc<Dispatcher>, batch_limit: usize) -> Self {
        Self {
            dispatcher,
            batch_limit,
        }
    }
}

#[async_trait]
impl Job for PublishPostsJob {
    async fn run(&self) -> Result<TickSummary> {
        let now = Utc::now().timestamp();
        let posts = self
            .dispatcher
            .repository()
            .find_due_posts(now, self.batch_limit)
            .await?;

        let mut summary = TickSummary {
            selected: posts.len(),
            ..Default::default()
        };

        for post in &posts {
            match self.dispatcher.publish(post).await {
                Ok(outcome) => summary.record(outcome.published),
                Err(e) => {
                    tracing::error!(id = %post.id, "Failed to record publish outcome: {}", e);
                    summary.errors += 1;
                }
            }
        }

        Ok(summary)
    }
}

/// Rolls up the previous UTC day
pub struct DailyAnalyticsJob {
    repo: Arc<dyn Repository>,
}

impl DailyAnalyticsJob {
    pub fn new(repo: Arc<dyn Repository>) -> Self {
        Self { repo }
    }
}

#[async_trait]
impl Job for DailyAnalyticsJob {
    async fn run(&self) -> Result<TickSummary> {
        let now = Utc::now();
        let Some(yesterday) = now.date_naive().checked_sub_days(Days::new(1)) else {
            return Ok(TickSummary::default());
        };

        let rollup = self.repo.roll_up_daily(yesterday, now.timestamp()).await?;
        tracing::info!(
            day = %rollup.day,
            completed = rollup.tasks_completed,
            failed = rollup.tasks_failed,
            rate_limited = rollup.rate_limited,
            published = rollup.posts_published,
            "Daily analytics updated"
        );

        Ok(TickSummary {
            selected: 1,
            succeeded: 1,
            ..Default::default()
        })
    }
}

/// Build the six standard triggers from configuration
pub fn default_triggers(
    config: &SchedulingConfig,
    dispatcher: Arc<Dispatcher>,
) -> Result<Vec<Trigger>> {
    let intervals = &config.triggers;
    let limit = config.batch_limit;
    let every = |field: &str, value: &str| parse_interval(&format!("scheduling.triggers.{}", field), value);

    Ok(vec![
        Trigger::every(
            PUBLISH_POSTS,
            every("publish_posts", &intervals.publish_posts)?,
            Arc::new(PublishPostsJob::new(Arc::clone(&dispatcher), limit)),
        ),
        Trigger::every(
            INTERACTION_TASKS,
            every("interaction_tasks", &intervals.interaction_tasks)?,
            Arc::new(TaskBatchJob::new(
                Arc::clone(&dispatcher),
                &TaskType::INTERACTIONS,
                limit,
            )),
        ),
        Trigger::every(
            MONITOR_TRENDS,
            every("monitor_trends", &intervals.monitor_trends)?,
            Arc::new(TaskBatchJob::new(
                Arc::clone(&dispatcher),
                &[TaskType::TrendMonitor],
                limit,
            )),
        ),
        Trigger::every(
            SCRAPE_TASKS,
            every("scrape_tasks", &intervals.scrape_tasks)?,
            Arc::new(TaskBatchJob::new(
                Arc::clone(&dispatcher),
                &[TaskType::Scrape],
                limit,
            )),
        ),
        Trigger::every(
            GENERIC_TASKS,
            every("generic_tasks", &intervals.generic_tasks)?,
            Arc::new(TaskBatchJob::new(Arc::clone(&dispatcher), &[], limit)),
        ),
        Trigger::every(
            DAILY_ANALYTICS,
            every("daily_analytics", &intervals.daily_analytics)?,
            Arc::new(DailyAnalyticsJob::new(Arc::clone(dispatcher.repository()))),
        )
        .with_overlap(OverlapPolicy::Serialize),
    ])
}
