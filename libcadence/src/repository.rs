//! Storage contract consumed by the dispatcher and the trigger jobs
//!
//! [`crate::db::Database`] is the SQLite implementation. Writes that move a
//! record out of its selectable state are conditional, so a task that has
//! already reached `completed`/`failed` (or a post that is already posted)
//! is never modified by a late or duplicate dispatch.
//!
//! Tasks are claimed before they run. Triggers with overlapping type sets
//! select the same due rows, and only the tick that wins the claim calls
//! the platform.

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::error::Result;
use crate::retry::TaskUpdate;
use crate::types::{
    DailyRollup, Interaction, PlatformKind, PostMetadata, ScheduledPost, ScrapedUser, Task,
    TaskType,
};

/// Age after which a claim left by a crashed process is ignored
pub const CLAIM_EXPIRY_SECS: i64 = 3600;

#[async_trait]
pub trait Repository: Send + Sync {
    /// Selectable, unclaimed tasks due at `now`, priority DESC then
    /// scheduled_time ASC. An empty `types` slice means every task type.
    async fn find_due_tasks(&self, now: i64, types: &[TaskType], limit: usize)
        -> Result<Vec<Task>>;

    /// Unposted posts due at `now`, oldest schedule first
    async fn find_due_posts(&self, now: i64, limit: usize) -> Result<Vec<ScheduledPost>>;

    /// Mark a selectable task as being run. Returns false when it is no
    /// longer selectable or another dispatch holds a live claim.
    async fn claim_task(&self, id: &str, now: i64) -> Result<bool>;

    /// Persist an attempt's outcome and release the claim. Returns false
    /// when the task was no longer selectable and nothing was written.
    async fn update_task_result(&self, update: &TaskUpdate) -> Result<bool>;

    /// Flip `posted` to true. Returns false if it was already posted.
    async fn update_post_published(
        &self,
        id: &str,
        post_id: &str,
        metadata: &PostMetadata,
        posted_at: i64,
    ) -> Result<bool>;

    /// Record the latest failed publish attempt without changing `posted`
    async fn record_post_failure(&self, id: &str, message: &str) -> Result<()>;

    /// Insert or refresh a user keyed by `(platform, user_id)`
    async fn upsert_user(&self, platform: PlatformKind, user: &ScrapedUser, seen_at: i64)
        -> Result<()>;

    async fn append_interaction(&self, interaction: &Interaction) -> Result<()>;

    /// Count one refused admission for a task or post
    async fn record_rate_limited(&self, platform: PlatformKind, subject_id: &str, at: i64)
        -> Result<()>;

    /// Compute and store the counters for one UTC day
    async fn roll_up_daily(&self, day: NaiveDate, now: i64) -> Result<DailyRollup>;
}
