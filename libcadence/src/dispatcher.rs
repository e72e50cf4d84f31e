//! Execution dispatcher
//!
//! Runs one due task or post against its platform adapter and writes the
//! outcome back through the repository. Adapter, admission and timeout
//! failures never escape as errors: they become a failed [`TaskResult`] (or
//! a post's `last_error`). Only repository errors propagate to the caller.
//!
//! A task is claimed before its attempt. When the claim is lost to another
//! tick the task is left alone and no outcome is produced.

use serde_json::json;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

use crate::error::{CadenceError, PlatformError, Result};
use crate::operations::{operation_for, Operation};
use crate::platforms::{Platform, PlatformRegistry, SearchOptions};
use crate::rate_limiter::Admission;
use crate::repository::Repository;
use crate::retry::{Failure, FailureKind, RetryPolicy};
use crate::types::{Interaction, PlatformKind, ScheduledPost, Task, TaskResult, TaskStatus};

/// Result message recorded when admission is refused
pub const RATE_LIMIT_MESSAGE: &str = "Rate limit exceeded";

/// Number of post ids kept in a trend monitor result
const TOP_POSTS: usize = 5;

/// What happened to one task
#[derive(Debug, Clone, PartialEq)]
pub struct TaskOutcome {
    pub task_id: String,
    pub status: TaskStatus,
    pub result: TaskResult,
    pub retry_count: u32,
    /// False when the task had already left pending/scheduled and the
    /// write was skipped
    pub persisted: bool,
}

impl TaskOutcome {
    pub fn succeeded(&self) -> bool {
        self.result.success
    }
}

/// What happened to one scheduled post
#[derive(Debug, Clone, PartialEq)]
pub struct PublishOutcome {
    pub id: String,
    pub published: bool,
    /// Identifier assigned by the platform
    pub post_id: Option<String>,
    pub message: String,
}

pub struct Dispatcher {
    repo: Arc<dyn Repository>,
    platforms: PlatformRegistry,
    limiter: Arc<dyn Admission>,
    retry: RetryPolicy,
    call_timeout: Duration,
}

impl Dispatcher {
    pub fn new(
        repo: Arc<dyn Repository>,
        platforms: PlatformRegistry,
        limiter: Arc<dyn Admission>,
    ) -> Self {
        Self {
            repo,
            platforms,
            limiter,
            retry: RetryPolicy::default(),
            call_timeout: Duration::from_secs(30),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_timeout(mut self, call_timeout: Duration) -> Self {
        self.call_timeout = call_timeout;
        self
    }

    pub fn repository(&self) -> &Arc<dyn Repository> {
        &self.repo
    }

    pub fn platforms(&self) -> &PlatformRegistry {
        &self.platforms
    }

    /// Execute a task now
    pub async fn execute(&self, task: &Task) -> Result<Option<TaskOutcome>> {
        self.execute_at(task, chrono::Utc::now().timestamp()).await
    }

    /// Execute a task as of `now` and persist the outcome. `None` means the
    /// task was already claimed or finished elsewhere.
    pub async fn execute_at(&self, task: &Task, now: i64) -> Result<Option<TaskOutcome>> {
        if !self.repo.claim_task(&task.id, now).await? {
            tracing::debug!(task_id = %task.id, "Task claimed elsewhere, skipping");
            return Ok(None);
        }

        let attempt = self.attempt(task, now).await?;

        match &attempt {
            Ok(result) => tracing::info!(
                task_id = %task.id,
                task_type = %task.task_type,
                platform = %task.platform,
                "Task succeeded: {}",
                result.message
            ),
            Err(failure) => tracing::warn!(
                task_id = %task.id,
                task_type = %task.task_type,
                platform = %task.platform,
                "Task failed: {}",
                failure.message
            ),
        }

        let update = self.retry.apply(task, attempt, now);
        let persisted = self.repo.update_task_result(&update).await?;
        if !persisted {
            tracing::debug!(task_id = %task.id, "Task already left the queue, result discarded");
        }

        Ok(Some(TaskOutcome {
            task_id: update.id,
            status: update.status,
            result: update.result,
            retry_count: update.retry_count,
            persisted,
        }))
    }

    /// One attempt. The outer error is a store failure, the inner one a
    /// failed attempt to be recorded on the task.
    async fn attempt(&self, task: &Task, now: i64) -> Result<std::result::Result<TaskResult, Failure>> {
        if !self.limiter.admit(task.platform, now) {
            self.record_rate_limited(task.platform, &task.id, now).await;
            return Ok(Err(Failure::new(FailureKind::RateLimited, RATE_LIMIT_MESSAGE)));
        }

        let adapter = match self.platforms.configured(task.platform) {
            Some(adapter) => Arc::clone(adapter),
            None => return Ok(Err(not_configured(task.platform.as_str()))),
        };

        let operation = match operation_for(task.task_type, task.platform) {
            Some(operation) => operation,
            None => {
                return Ok(Err(Failure::new(
                    FailureKind::Unsupported,
                    format!("Unsupported {} task", task.task_type),
                )))
            }
        };

        let result = match operation {
            Operation::Like => self
                .call(adapter.like(&task.target))
                .await
                .map(|_| TaskResult::success(format!("Liked {}", task.target), None)),
            Operation::Comment => self
                .call(adapter.comment(&task.target, &task.action))
                .await
                .map(|comment_id| {
                    TaskResult::success(
                        format!("Commented on {}", task.target),
                        Some(json!({ "comment_id": comment_id })),
                    )
                }),
            Operation::Follow => self
                .call(adapter.follow(&task.target))
                .await
                .map(|_| TaskResult::success(format!("Followed {}", task.target), None)),
            Operation::Retweet => self
                .call(adapter.retweet(&task.target))
                .await
                .map(|_| TaskResult::success(format!("Retweeted {}", task.target), None)),
            Operation::Scrape => return self.scrape(adapter.as_ref(), task, now).await,
            Operation::TrendMonitor => self.monitor_trend(adapter.as_ref(), task).await,
        };

        if result.is_ok() && task.task_type.is_interaction() {
            self.record_interaction(task, now).await;
        }

        Ok(result)
    }

    async fn scrape(
        &self,
        adapter: &dyn Platform,
        task: &Task,
        now: i64,
    ) -> Result<std::result::Result<TaskResult, Failure>> {
        let limit = task.metadata.limits.max_results;
        let options = SearchOptions {
            max_results: limit,
            include_users: true,
        };

        let found = match self.call(adapter.search(&task.target, &options)).await {
            Ok(found) => found,
            Err(failure) => return Ok(Err(failure)),
        };

        let total = found.users.len();
        let mut stored = Vec::new();
        for user in found
            .users
            .iter()
            .filter(|user| task.metadata.filters.matches(user))
            .take(limit)
        {
            self.repo.upsert_user(task.platform, user, now).await?;
            stored.push(user.user_id.clone());
        }

        tracing::debug!(
            task_id = %task.id,
            "Scrape of {} kept {} of {} users",
            task.target,
            stored.len(),
            total
        );

        Ok(Ok(TaskResult::success(
            format!("Scraped {} users", stored.len()),
            Some(json!({ "found": total, "stored": stored.len(), "user_ids": stored })),
        )))
    }

    async fn monitor_trend(
        &self,
        adapter: &dyn Platform,
        task: &Task,
    ) -> std::result::Result<TaskResult, Failure> {
        let options = SearchOptions {
            max_results: task.metadata.limits.max_results,
            include_users: false,
        };
        let found = self.call(adapter.search(&task.target, &options)).await?;

        let mut posts = found.posts;
        posts.sort_by(|a, b| b.engagement.cmp(&a.engagement));
        let top: Vec<&str> = posts.iter().take(TOP_POSTS).map(|p| p.id.as_str()).collect();

        Ok(TaskResult::success(
            format!("Found {} posts for {}", posts.len(), task.target),
            Some(json!({ "matches": posts.len(), "top_posts": top })),
        ))
    }

    async fn record_interaction(&self, task: &Task, now: i64) {
        let interaction = Interaction {
            platform: task.platform,
            user_id: task.target.clone(),
            task_id: task.id.clone(),
            interaction: task.task_type,
            at: now,
        };

        if let Err(e) = self.repo.append_interaction(&interaction).await {
            tracing::warn!(task_id = %task.id, "Failed to record interaction: {}", e);
        }
    }

    async fn record_rate_limited(&self, platform: PlatformKind, subject_id: &str, now: i64) {
        if let Err(e) = self.repo.record_rate_limited(platform, subject_id, now).await {
            tracing::warn!(id = %subject_id, "Failed to record rate limit event: {}", e);
        }
    }

    /// Publish a post now
    pub async fn publish(&self, post: &ScheduledPost) -> Result<PublishOutcome> {
        self.publish_at(post, chrono::Utc::now().timestamp()).await
    }

    /// Publish a post as of `now`. Success flips `posted` once; failure
    /// leaves the post eligible for the next tick.
    pub async fn publish_at(&self, post: &ScheduledPost, now: i64) -> Result<PublishOutcome> {
        match self.attempt_publish(post, now).await {
            Ok(post_id) => {
                let published = self
                    .repo
                    .update_post_published(&post.id, &post_id, &post.metadata, now)
                    .await?;
                if published {
                    tracing::info!(id = %post.id, platform = %post.platform, "Published as {}", post_id);
                } else {
                    tracing::warn!(id = %post.id, "Post was already published, keeping the original id");
                }

                Ok(PublishOutcome {
                    id: post.id.clone(),
                    published,
                    message: format!("Published to {}", post.platform),
                    post_id: Some(post_id),
                })
            }
            Err(failure) => {
                tracing::warn!(id = %post.id, platform = %post.platform, "Publish failed: {}", failure.message);
                self.repo.record_post_failure(&post.id, &failure.message).await?;

                Ok(PublishOutcome {
                    id: post.id.clone(),
                    published: false,
                    post_id: None,
                    message: failure.message,
                })
            }
        }
    }

    async fn attempt_publish(
        &self,
        post: &ScheduledPost,
        now: i64,
    ) -> std::result::Result<String, Failure> {
        if !self.limiter.admit(post.platform, now) {
            self.record_rate_limited(post.platform, &post.id, now).await;
            return Err(Failure::new(FailureKind::RateLimited, RATE_LIMIT_MESSAGE));
        }

        let adapter = self
            .platforms
            .configured(post.platform)
            .ok_or_else(|| not_configured(post.platform.as_str()))?;

        adapter.validate_content(&post.content).map_err(failure_from)?;

        self.call(adapter.post(&post.content, &post.media)).await
    }

    /// Bound an adapter call by the configured timeout
    async fn call<T, F>(&self, fut: F) -> std::result::Result<T, Failure>
    where
        F: Future<Output = Result<T>>,
    {
        match timeout(self.call_timeout, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(failure_from(e)),
            Err(_) => Err(Failure::new(
                FailureKind::Timeout,
                PlatformError::Timeout(self.call_timeout.as_secs()).to_string(),
            )),
        }
    }
}

fn not_configured(platform: &str) -> Failure {
    Failure::new(
        FailureKind::NotConfigured,
        PlatformError::NotConfigured(platform.to_string()).to_string(),
    )
}

/// Classify an adapter error for the retry policy
fn failure_from(error: CadenceError) -> Failure {
    match error {
        CadenceError::Platform(e) => {
            let kind = match &e {
                PlatformError::NotConfigured(_) => FailureKind::NotConfigured,
                PlatformError::NotImplemented(_) => FailureKind::Unsupported,
                PlatformError::Timeout(_) => FailureKind::Timeout,
                other => FailureKind::Adapter {
                    transient: other.is_transient(),
                },
            };
            Failure::new(kind, e.to_string())
        }
        other => Failure::new(FailureKind::Adapter { transient: false }, other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RateLimitConfig;
    use crate::db::Database;
    use crate::platforms::mock::{MockCall, MockPlatform};
    use crate::platforms::SearchResults;
    use crate::rate_limiter::RateLimiter;
    use crate::retry::RetryMode;
    use crate::types::{
        FoundPost, PlatformKind, ScrapeFilters, ScrapedUser, TaskType, MAX_RETRIES,
    };
    use std::collections::HashMap;

    const NOW: i64 = 1_700_000_000;

    async fn setup(adapters: Vec<Arc<MockPlatform>>) -> (Database, Dispatcher) {
        setup_with_limiter(adapters, Arc::new(RateLimiter::unlimited())).await
    }

    async fn setup_with_limiter(
        adapters: Vec<Arc<MockPlatform>>,
        limiter: Arc<dyn Admission>,
    ) -> (Database, Dispatcher) {
        let db = Database::in_memory().await.unwrap();
        let mut registry = PlatformRegistry::new();
        for adapter in adapters {
            registry.register(adapter);
        }
        let dispatcher = Dispatcher::new(Arc::new(db.clone()), registry, limiter);
        (db, dispatcher)
    }

    async fn stored_task(db: &Database, task_type: TaskType, platform: PlatformKind) -> Task {
        let task = Task::new(task_type, platform, "target_user", "Nice post!").scheduled_at(NOW - 60);
        db.create_task(&task).await.unwrap();
        task
    }

    fn user(id: &str, followers: u64, verified: bool) -> ScrapedUser {
        ScrapedUser {
            user_id: id.to_string(),
            username: format!("user_{}", id),
            followers,
            verified,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_like_on_unconfigured_platform_fails() {
        let twitter = Arc::new(MockPlatform::not_configured(PlatformKind::Twitter));
        let (db, dispatcher) = setup(vec![twitter.clone()]).await;
        let task = stored_task(&db, TaskType::Like, PlatformKind::Twitter).await;

        let outcome = dispatcher.execute_at(&task, NOW).await.unwrap().unwrap();

        assert!(!outcome.succeeded());
        assert_eq!(outcome.result.message, "twitter service not configured");
        assert_eq!(outcome.status, TaskStatus::Failed);
        assert_eq!(twitter.call_count(), 0);

        let stored = db.get_task(&task.id).await.unwrap().unwrap();
        assert_eq!(stored.status, TaskStatus::Failed);
        assert_eq!(stored.retry_count, 1);
        assert_eq!(stored.executed_time, Some(NOW));
    }

    #[tokio::test]
    async fn test_missing_adapter_is_not_configured() {
        let (db, dispatcher) = setup(vec![]).await;
        let task = stored_task(&db, TaskType::Follow, PlatformKind::Reddit).await;

        let outcome = dispatcher.execute_at(&task, NOW).await.unwrap().unwrap();
        assert_eq!(outcome.result.message, "reddit service not configured");
    }

    #[tokio::test]
    async fn test_like_success_completes_and_records_interaction() {
        let twitter = Arc::new(MockPlatform::success(PlatformKind::Twitter));
        let (db, dispatcher) = setup(vec![twitter.clone()]).await;
        let task = stored_task(&db, TaskType::Like, PlatformKind::Twitter).await;

        let outcome = dispatcher.execute_at(&task, NOW).await.unwrap().unwrap();

        assert!(outcome.succeeded());
        assert!(outcome.persisted);
        assert_eq!(
            twitter.calls(),
            vec![MockCall::Like {
                target: "target_user".to_string()
            }]
        );

        let stored = db.get_task(&task.id).await.unwrap().unwrap();
        assert_eq!(stored.status, TaskStatus::Completed);
        assert_eq!(stored.executed_time, Some(NOW));
        assert_eq!(stored.retry_count, 0);

        let history = db
            .get_interactions(PlatformKind::Twitter, "target_user")
            .await
            .unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].interaction, TaskType::Like);
        assert_eq!(history[0].task_id, task.id);
    }

    #[tokio::test]
    async fn test_comment_records_comment_id() {
        let reddit = Arc::new(MockPlatform::success(PlatformKind::Reddit));
        let (db, dispatcher) = setup(vec![reddit.clone()]).await;
        let task = stored_task(&db, TaskType::Comment, PlatformKind::Reddit).await;

        let outcome = dispatcher.execute_at(&task, NOW).await.unwrap().unwrap();

        assert_eq!(
            outcome.result.data,
            Some(json!({ "comment_id": "reddit:comment-1" }))
        );
        assert_eq!(
            reddit.calls(),
            vec![MockCall::Comment {
                target: "target_user".to_string(),
                text: "Nice post!".to_string()
            }]
        );
    }

    #[tokio::test]
    async fn test_rate_limit_rejects_without_adapter_call() {
        let twitter = Arc::new(MockPlatform::success(PlatformKind::Twitter));
        let mut limits = HashMap::new();
        limits.insert(
            PlatformKind::Twitter,
            RateLimitConfig {
                max_requests: 2,
                window: 60,
            },
        );
        let (db, dispatcher) =
            setup_with_limiter(vec![twitter.clone()], Arc::new(RateLimiter::new(limits))).await;

        let mut outcomes = Vec::new();
        for _ in 0..3 {
            let task = stored_task(&db, TaskType::Like, PlatformKind::Twitter).await;
            outcomes.push(dispatcher.execute_at(&task, NOW).await.unwrap().unwrap());
        }

        let successes: Vec<bool> = outcomes.iter().map(|o| o.succeeded()).collect();
        assert_eq!(successes, vec![true, true, false]);
        assert_eq!(outcomes[2].result.message, RATE_LIMIT_MESSAGE);
        assert_eq!(twitter.call_count(), 2);

        // A new window admits again
        let task = stored_task(&db, TaskType::Like, PlatformKind::Twitter).await;
        let outcome = dispatcher.execute_at(&task, NOW + 60).await.unwrap().unwrap();
        assert!(outcome.succeeded());
    }

    #[tokio::test]
    async fn test_requeued_rate_limit_refusal_is_counted() {
        let twitter = Arc::new(MockPlatform::success(PlatformKind::Twitter));
        let mut limits = HashMap::new();
        limits.insert(
            PlatformKind::Twitter,
            RateLimitConfig {
                max_requests: 1,
                window: 600,
            },
        );
        let (db, dispatcher) =
            setup_with_limiter(vec![twitter.clone()], Arc::new(RateLimiter::new(limits))).await;
        let dispatcher = dispatcher.with_retry_policy(RetryPolicy::new(RetryMode::Requeue, 60));

        let first = stored_task(&db, TaskType::Like, PlatformKind::Twitter).await;
        let second = stored_task(&db, TaskType::Like, PlatformKind::Twitter).await;
        assert!(dispatcher.execute_at(&first, NOW).await.unwrap().unwrap().succeeded());
        let refused = dispatcher.execute_at(&second, NOW).await.unwrap().unwrap();
        assert_eq!(refused.status, TaskStatus::Pending);
        assert_eq!(refused.result.message, RATE_LIMIT_MESSAGE);

        let stored = db.get_task(&second.id).await.unwrap().unwrap();
        assert!(stored.executed_time.is_none());

        let day = chrono::DateTime::from_timestamp(NOW, 0).unwrap().date_naive();
        let rollup = db.roll_up_daily(day, NOW + 1).await.unwrap();
        assert_eq!(rollup.rate_limited, 1);
        assert_eq!(rollup.tasks_completed, 1);
        assert_eq!(twitter.call_count(), 1);
    }

    #[tokio::test]
    async fn test_unsupported_pair_fails_without_adapter_call() {
        let reddit = Arc::new(MockPlatform::success(PlatformKind::Reddit));
        let (db, dispatcher) = setup(vec![reddit.clone()]).await;
        let task = stored_task(&db, TaskType::Retweet, PlatformKind::Reddit).await;

        let outcome = dispatcher.execute_at(&task, NOW).await.unwrap().unwrap();

        assert_eq!(outcome.result.message, "Unsupported retweet task");
        assert_eq!(outcome.status, TaskStatus::Failed);
        assert_eq!(reddit.call_count(), 0);
    }

    #[tokio::test]
    async fn test_adapter_timeout_becomes_failure() {
        let slow = Arc::new(MockPlatform::with_delay(
            PlatformKind::Instagram,
            Duration::from_millis(500),
        ));
        let (db, dispatcher) = setup(vec![slow]).await;
        let dispatcher = dispatcher.with_timeout(Duration::from_millis(20));
        let task = stored_task(&db, TaskType::Follow, PlatformKind::Instagram).await;

        let outcome = dispatcher.execute_at(&task, NOW).await.unwrap().unwrap();

        assert!(!outcome.succeeded());
        assert!(outcome.result.message.contains("Timed out"));
        assert_eq!(outcome.status, TaskStatus::Failed);
    }

    #[tokio::test]
    async fn test_adapter_error_message_is_recorded() {
        let twitter = Arc::new(MockPlatform::failing(
            PlatformKind::Twitter,
            PlatformError::Network("connection reset".to_string()),
        ));
        let (db, dispatcher) = setup(vec![twitter]).await;
        let task = stored_task(&db, TaskType::Follow, PlatformKind::Twitter).await;

        let outcome = dispatcher.execute_at(&task, NOW).await.unwrap().unwrap();
        assert_eq!(outcome.result.message, "Network error: connection reset");

        // No interaction is logged for a failed call
        let history = db
            .get_interactions(PlatformKind::Twitter, "target_user")
            .await
            .unwrap();
        assert!(history.is_empty());
    }

    #[tokio::test]
    async fn test_requeue_policy_rearms_transient_failures() {
        let twitter = Arc::new(MockPlatform::failing(
            PlatformKind::Twitter,
            PlatformError::Network("reset".to_string()),
        ));
        let (db, dispatcher) = setup(vec![twitter]).await;
        let dispatcher = dispatcher.with_retry_policy(RetryPolicy::new(RetryMode::Requeue, 60));
        let task = stored_task(&db, TaskType::Like, PlatformKind::Twitter).await;

        let mut now = NOW;
        for attempt in 1..=MAX_RETRIES {
            let current = db.get_task(&task.id).await.unwrap().unwrap();
            assert!(current.is_due(now));
            let outcome = dispatcher.execute_at(&current, now).await.unwrap().unwrap();
            assert_eq!(outcome.retry_count, attempt);

            let stored = db.get_task(&task.id).await.unwrap().unwrap();
            if attempt < MAX_RETRIES {
                assert_eq!(stored.status, TaskStatus::Pending);
                assert!(stored.scheduled_time > now);
                assert!(stored.executed_time.is_none());
                now = stored.scheduled_time;
            } else {
                assert_eq!(stored.status, TaskStatus::Failed);
                assert_eq!(stored.executed_time, Some(now));
            }
        }
    }

    #[tokio::test]
    async fn test_terminal_task_is_not_rewritten() {
        let twitter = Arc::new(MockPlatform::success(PlatformKind::Twitter));
        let (db, dispatcher) = setup(vec![twitter.clone()]).await;
        let task = stored_task(&db, TaskType::Like, PlatformKind::Twitter).await;

        let first = dispatcher.execute_at(&task, NOW).await.unwrap().unwrap();
        assert!(first.persisted);

        // A stale copy dispatched again is not claimed or run
        let second = dispatcher.execute_at(&task, NOW + 5).await.unwrap();
        assert!(second.is_none());
        assert_eq!(twitter.call_count(), 1);
        let stored = db.get_task(&task.id).await.unwrap().unwrap();
        assert_eq!(stored.executed_time, Some(NOW));
    }

    #[tokio::test]
    async fn test_scrape_filters_caps_and_upserts_users() {
        let results = SearchResults {
            users: vec![
                user("1", 5_000, true),
                user("2", 10, true),
                user("3", 8_000, false),
                user("4", 9_000, true),
                user("5", 7_000, true),
            ],
            posts: vec![],
        };
        let instagram = Arc::new(MockPlatform::with_search_results(
            PlatformKind::Instagram,
            results,
        ));
        let (db, dispatcher) = setup(vec![instagram.clone()]).await;

        let mut task = Task::new(TaskType::Scrape, PlatformKind::Instagram, "#rustlang", "scrape")
            .scheduled_at(NOW - 1);
        task.metadata.filters = ScrapeFilters {
            min_followers: Some(1_000),
            verified_only: true,
            ..Default::default()
        };
        task.metadata.limits.max_results = 2;
        db.create_task(&task).await.unwrap();

        let outcome = dispatcher.execute_at(&task, NOW).await.unwrap().unwrap();

        assert!(outcome.succeeded());
        assert_eq!(outcome.result.message, "Scraped 2 users");
        assert_eq!(
            instagram.calls(),
            vec![MockCall::Search {
                query: "#rustlang".to_string(),
                max_results: 2
            }]
        );
        assert_eq!(db.count_users(PlatformKind::Instagram).await.unwrap(), 2);
        assert!(db.get_user(PlatformKind::Instagram, "1").await.unwrap().is_some());
        assert!(db.get_user(PlatformKind::Instagram, "4").await.unwrap().is_some());
        assert!(db.get_user(PlatformKind::Instagram, "2").await.unwrap().is_none());

        // Scrapes are not interactions
        assert!(db
            .get_interactions(PlatformKind::Instagram, "#rustlang")
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_trend_monitor_reports_top_posts() {
        let posts = (1..=7)
            .map(|i| FoundPost {
                id: format!("p{}", i),
                author: "someone".to_string(),
                text: "#rust".to_string(),
                engagement: i * 10,
            })
            .collect();
        let twitter = Arc::new(MockPlatform::with_search_results(
            PlatformKind::Twitter,
            SearchResults {
                users: vec![],
                posts,
            },
        ));
        let (db, dispatcher) = setup(vec![twitter]).await;
        let task = stored_task(&db, TaskType::TrendMonitor, PlatformKind::Twitter).await;

        let outcome = dispatcher.execute_at(&task, NOW).await.unwrap().unwrap();

        assert!(outcome.succeeded());
        assert_eq!(
            outcome.result.data,
            Some(json!({
                "matches": 7,
                "top_posts": ["p7", "p6", "p5", "p4", "p3"]
            }))
        );
    }

    #[tokio::test]
    async fn test_publish_success_marks_posted_once() {
        let twitter = Arc::new(MockPlatform::success(PlatformKind::Twitter));
        let (db, dispatcher) = setup(vec![twitter.clone()]).await;
        let mut post = ScheduledPost::new("Hello world", PlatformKind::Twitter, NOW - 10);
        post.media = vec!["cat.png".to_string()];
        db.create_post(&post).await.unwrap();

        let outcome = dispatcher.publish_at(&post, NOW).await.unwrap();

        assert!(outcome.published);
        assert_eq!(outcome.post_id.as_deref(), Some("twitter:post-1"));
        assert_eq!(
            twitter.calls(),
            vec![MockCall::Post {
                content: "Hello world".to_string(),
                media: vec!["cat.png".to_string()]
            }]
        );

        let stored = db.get_post(&post.id).await.unwrap().unwrap();
        assert!(stored.posted);
        assert_eq!(stored.post_id.as_deref(), Some("twitter:post-1"));
        assert_eq!(stored.posted_at, Some(NOW));
    }

    #[tokio::test]
    async fn test_publish_failure_keeps_post_eligible() {
        let reddit = Arc::new(MockPlatform::failing(
            PlatformKind::Reddit,
            PlatformError::Posting("subreddit locked".to_string()),
        ));
        let (db, dispatcher) = setup(vec![reddit]).await;
        let post = ScheduledPost::new("Hello", PlatformKind::Reddit, NOW - 10);
        db.create_post(&post).await.unwrap();

        let outcome = dispatcher.publish_at(&post, NOW).await.unwrap();

        assert!(!outcome.published);
        assert_eq!(outcome.message, "Posting failed: subreddit locked");

        let stored = db.get_post(&post.id).await.unwrap().unwrap();
        assert!(!stored.posted);
        assert_eq!(stored.last_error.as_deref(), Some("Posting failed: subreddit locked"));
        assert_eq!(db.find_due_posts(NOW, 10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_publish_validates_content_before_posting() {
        let twitter = Arc::new(MockPlatform::with_limit(PlatformKind::Twitter, 10));
        let (db, dispatcher) = setup(vec![twitter.clone()]).await;
        let post = ScheduledPost::new("This is far too long", PlatformKind::Twitter, NOW);
        db.create_post(&post).await.unwrap();

        let outcome = dispatcher.publish_at(&post, NOW).await.unwrap();

        assert!(!outcome.published);
        assert!(outcome.message.contains("character limit"));
        assert_eq!(twitter.call_count(), 0);
    }
}
