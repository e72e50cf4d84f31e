//! Database operations for Cadence

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use std::path::Path;

use crate::error::{DbError, Result};
use crate::repository::{Repository, CLAIM_EXPIRY_SECS};
use crate::retry::TaskUpdate;
use crate::types::{
    clamp_priority, DailyRollup, Interaction, PlatformKind, PostMetadata, ScheduledPost,
    ScrapedUser, Task, TaskEdit, TaskResult, TaskStatus, TaskType, User,
};

const TASK_COLUMNS: &str = "id, task_type, platform, target, action, status, priority, \
     scheduled_time, executed_time, retry_count, result_success, result_message, result_data, \
     metadata, created_at";

const POST_COLUMNS: &str = "id, content, platform, media, scheduled_time, posted, post_id, \
     posted_at, metadata, last_error, created_at";

#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Create a new database connection
    pub async fn new(db_path: &str) -> Result<Self> {
        // Expand path and create parent directories
        let expanded_path = shellexpand::tilde(db_path).to_string();
        let path = Path::new(&expanded_path);

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(DbError::IoError)?;
        }

        // Forward slashes work for SQLite URLs on every platform;
        // mode=rwc creates the file if it does not exist
        let db_url = format!("sqlite://{}?mode=rwc", expanded_path.replace('\\', "/"));

        let pool = SqlitePool::connect(&db_url)
            .await
            .map_err(DbError::SqlxError)?;

        Self::migrate(pool).await
    }

    /// Private in-memory database, mainly for tests
    pub async fn in_memory() -> Result<Self> {
        // Every connection to :memory: is its own database, so keep exactly one alive
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await
            .map_err(DbError::SqlxError)?;
        Self::migrate(pool).await
    }

    async fn migrate(pool: SqlitePool) -> Result<Self> {
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(DbError::MigrationError)?;

        Ok(Self { pool })
    }

    /// Create a new task
    pub async fn create_task(&self, task: &Task) -> Result<()> {
        let metadata = to_json(&task.id, &task.metadata)?;
        let result_data = task
            .result
            .as_ref()
            .and_then(|r| r.data.as_ref())
            .map(|data| to_json(&task.id, data))
            .transpose()?;

        sqlx::query(
            r#"
            INSERT INTO tasks (id, task_type, platform, target, action, status, priority,
                               scheduled_time, executed_time, retry_count, result_success,
                               result_message, result_data, metadata, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&task.id)
        .bind(task.task_type.as_str())
        .bind(task.platform.as_str())
        .bind(&task.target)
        .bind(&task.action)
        .bind(task.status.as_str())
        .bind(i64::from(task.priority))
        .bind(task.scheduled_time)
        .bind(task.executed_time)
        .bind(i64::from(task.retry_count))
        .bind(task.result.as_ref().map(|r| r.success))
        .bind(task.result.as_ref().map(|r| r.message.as_str()))
        .bind(result_data)
        .bind(metadata)
        .bind(task.created_at)
        .execute(&self.pool)
        .await
        .map_err(DbError::SqlxError)?;

        Ok(())
    }

    /// Get a task by ID
    pub async fn get_task(&self, task_id: &str) -> Result<Option<Task>> {
        let query = format!("SELECT {} FROM tasks WHERE id = ?", TASK_COLUMNS);
        let row = sqlx::query(&query)
            .bind(task_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(DbError::SqlxError)?;

        row.as_ref().map(task_from_row).transpose()
    }

    /// List tasks, newest schedule first, optionally filtered by status
    pub async fn list_tasks(&self, status: Option<TaskStatus>, limit: usize) -> Result<Vec<Task>> {
        let mut query_str = format!("SELECT {} FROM tasks", TASK_COLUMNS);
        if status.is_some() {
            query_str.push_str(" WHERE status = ?");
        }
        query_str.push_str(" ORDER BY scheduled_time DESC, id ASC LIMIT ?");

        let mut query = sqlx::query(&query_str);
        if let Some(status) = status {
            query = query.bind(status.as_str());
        }
        let rows = query
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(DbError::SqlxError)?;

        rows.iter().map(task_from_row).collect()
    }

    /// Apply user edits to a task that has not run yet
    ///
    /// Returns false when the task does not exist or already left the
    /// pending/scheduled states.
    pub async fn update_pending_task(&self, task_id: &str, edit: &TaskEdit) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE tasks
            SET action = COALESCE(?, action),
                priority = COALESCE(?, priority),
                scheduled_time = COALESCE(?, scheduled_time)
            WHERE id = ? AND status IN ('pending', 'scheduled')
            "#,
        )
        .bind(edit.action.as_deref())
        .bind(edit.priority.map(|p| i64::from(clamp_priority(p))))
        .bind(edit.scheduled_time)
        .bind(task_id)
        .execute(&self.pool)
        .await
        .map_err(DbError::SqlxError)?;

        Ok(result.rows_affected() == 1)
    }

    /// Create a new scheduled post
    pub async fn create_post(&self, post: &ScheduledPost) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO scheduled_posts (id, content, platform, media, scheduled_time, posted,
                                         post_id, posted_at, metadata, last_error, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&post.id)
        .bind(&post.content)
        .bind(post.platform.as_str())
        .bind(to_json(&post.id, &post.media)?)
        .bind(post.scheduled_time)
        .bind(post.posted)
        .bind(&post.post_id)
        .bind(post.posted_at)
        .bind(to_json(&post.id, &post.metadata)?)
        .bind(&post.last_error)
        .bind(post.created_at)
        .execute(&self.pool)
        .await
        .map_err(DbError::SqlxError)?;

        Ok(())
    }

    /// Get a scheduled post by ID
    pub async fn get_post(&self, post_id: &str) -> Result<Option<ScheduledPost>> {
        let query = format!("SELECT {} FROM scheduled_posts WHERE id = ?", POST_COLUMNS);
        let row = sqlx::query(&query)
            .bind(post_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(DbError::SqlxError)?;

        row.as_ref().map(post_from_row).transpose()
    }

    /// List posts by schedule, optionally only posted or only unposted ones
    pub async fn list_posts(&self, posted: Option<bool>, limit: usize) -> Result<Vec<ScheduledPost>> {
        let mut query_str = format!("SELECT {} FROM scheduled_posts", POST_COLUMNS);
        if posted.is_some() {
            query_str.push_str(" WHERE posted = ?");
        }
        query_str.push_str(" ORDER BY scheduled_time ASC, id ASC LIMIT ?");

        let mut query = sqlx::query(&query_str);
        if let Some(posted) = posted {
            query = query.bind(posted);
        }
        let rows = query
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(DbError::SqlxError)?;

        rows.iter().map(post_from_row).collect()
    }

    pub async fn get_user(&self, platform: PlatformKind, user_id: &str) -> Result<Option<User>> {
        let row = sqlx::query(
            r#"
            SELECT platform, user_id, username, display_name, followers, following, verified,
                   bio, last_seen
            FROM users WHERE platform = ? AND user_id = ?
            "#,
        )
        .bind(platform.as_str())
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(DbError::SqlxError)?;

        row.as_ref().map(user_from_row).transpose()
    }

    pub async fn count_users(&self, platform: PlatformKind) -> Result<u64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users WHERE platform = ?")
            .bind(platform.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(DbError::SqlxError)?;

        Ok(count.max(0) as u64)
    }

    /// Interaction history for one user, oldest first
    pub async fn get_interactions(
        &self,
        platform: PlatformKind,
        user_id: &str,
    ) -> Result<Vec<Interaction>> {
        let rows = sqlx::query(
            r#"
            SELECT platform, user_id, task_id, interaction, at
            FROM user_interactions
            WHERE platform = ? AND user_id = ?
            ORDER BY at ASC, id ASC
            "#,
        )
        .bind(platform.as_str())
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(DbError::SqlxError)?;

        rows.iter()
            .map(|r| {
                let task_id: String = r.try_get("task_id").map_err(DbError::SqlxError)?;
                Ok(Interaction {
                    platform: parse_column(&task_id, r, "platform")?,
                    user_id: r.try_get("user_id").map_err(DbError::SqlxError)?,
                    interaction: parse_column(&task_id, r, "interaction")?,
                    at: r.try_get("at").map_err(DbError::SqlxError)?,
                    task_id,
                })
            })
            .collect()
    }

    /// Stored roll-up for a day (`YYYY-MM-DD`)
    pub async fn get_rollup(&self, day: &str) -> Result<Option<DailyRollup>> {
        let row = sqlx::query(
            r#"
            SELECT day, tasks_completed, tasks_failed, rate_limited, posts_published, computed_at
            FROM daily_analytics WHERE day = ?
            "#,
        )
        .bind(day)
        .fetch_optional(&self.pool)
        .await
        .map_err(DbError::SqlxError)?;

        row.map(|r| {
            Ok(DailyRollup {
                day: r.try_get("day").map_err(DbError::SqlxError)?,
                tasks_completed: get_u64(&r, "tasks_completed")?,
                tasks_failed: get_u64(&r, "tasks_failed")?,
                rate_limited: get_u64(&r, "rate_limited")?,
                posts_published: get_u64(&r, "posts_published")?,
                computed_at: r.try_get("computed_at").map_err(DbError::SqlxError)?,
            })
        })
        .transpose()
    }
}

#[async_trait]
impl Repository for Database {
    async fn find_due_tasks(
        &self,
        now: i64,
        types: &[TaskType],
        limit: usize,
    ) -> Result<Vec<Task>> {
        let mut query_str = format!(
            "SELECT {} FROM tasks WHERE status IN ('pending', 'scheduled') AND scheduled_time <= ? \
             AND (claimed_at IS NULL OR claimed_at < ?)",
            TASK_COLUMNS
        );
        if !types.is_empty() {
            let placeholders = vec!["?"; types.len()].join(", ");
            query_str.push_str(&format!(" AND task_type IN ({})", placeholders));
        }
        query_str.push_str(" ORDER BY priority DESC, scheduled_time ASC, created_at ASC, id ASC LIMIT ?");

        let mut query = sqlx::query(&query_str)
            .bind(now)
            .bind(now - CLAIM_EXPIRY_SECS);
        for task_type in types {
            query = query.bind(task_type.as_str());
        }
        let rows = query
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(DbError::SqlxError)?;

        rows.iter().map(task_from_row).collect()
    }

    async fn find_due_posts(&self, now: i64, limit: usize) -> Result<Vec<ScheduledPost>> {
        let query_str = format!(
            "SELECT {} FROM scheduled_posts WHERE posted = 0 AND scheduled_time <= ? \
             ORDER BY scheduled_time ASC, created_at ASC, id ASC LIMIT ?",
            POST_COLUMNS
        );
        let rows = sqlx::query(&query_str)
            .bind(now)
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(DbError::SqlxError)?;

        rows.iter().map(post_from_row).collect()
    }

    async fn claim_task(&self, id: &str, now: i64) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE tasks
            SET claimed_at = ?
            WHERE id = ? AND status IN ('pending', 'scheduled')
              AND (claimed_at IS NULL OR claimed_at < ?)
            "#,
        )
        .bind(now)
        .bind(id)
        .bind(now - CLAIM_EXPIRY_SECS)
        .execute(&self.pool)
        .await
        .map_err(DbError::SqlxError)?;

        Ok(result.rows_affected() == 1)
    }

    async fn update_task_result(&self, update: &TaskUpdate) -> Result<bool> {
        let result_data = update
            .result
            .data
            .as_ref()
            .map(|data| to_json(&update.id, data))
            .transpose()?;

        let result = sqlx::query(
            r#"
            UPDATE tasks
            SET status = ?, result_success = ?, result_message = ?, result_data = ?,
                retry_count = ?, executed_time = ?, scheduled_time = ?, claimed_at = NULL
            WHERE id = ? AND status IN ('pending', 'scheduled')
            "#,
        )
        .bind(update.status.as_str())
        .bind(update.result.success)
        .bind(&update.result.message)
        .bind(result_data)
        .bind(i64::from(update.retry_count))
        .bind(update.executed_time)
        .bind(update.scheduled_time)
        .bind(&update.id)
        .execute(&self.pool)
        .await
        .map_err(DbError::SqlxError)?;

        Ok(result.rows_affected() == 1)
    }

    async fn update_post_published(
        &self,
        id: &str,
        post_id: &str,
        metadata: &PostMetadata,
        posted_at: i64,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE scheduled_posts
            SET posted = 1, post_id = ?, metadata = ?, posted_at = ?, last_error = NULL
            WHERE id = ? AND posted = 0
            "#,
        )
        .bind(post_id)
        .bind(to_json(id, metadata)?)
        .bind(posted_at)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(DbError::SqlxError)?;

        Ok(result.rows_affected() == 1)
    }

    async fn record_post_failure(&self, id: &str, message: &str) -> Result<()> {
        sqlx::query("UPDATE scheduled_posts SET last_error = ? WHERE id = ? AND posted = 0")
            .bind(message)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(DbError::SqlxError)?;

        Ok(())
    }

    async fn upsert_user(
        &self,
        platform: PlatformKind,
        user: &ScrapedUser,
        seen_at: i64,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO users (platform, user_id, username, display_name, followers, following,
                               verified, bio, last_seen)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(platform, user_id) DO UPDATE SET
                username = excluded.username,
                display_name = excluded.display_name,
                followers = excluded.followers,
                following = excluded.following,
                verified = excluded.verified,
                bio = excluded.bio,
                last_seen = excluded.last_seen
            "#,
        )
        .bind(platform.as_str())
        .bind(&user.user_id)
        .bind(&user.username)
        .bind(&user.display_name)
        .bind(to_i64(user.followers))
        .bind(to_i64(user.following))
        .bind(user.verified)
        .bind(&user.bio)
        .bind(seen_at)
        .execute(&self.pool)
        .await
        .map_err(DbError::SqlxError)?;

        Ok(())
    }

    async fn append_interaction(&self, interaction: &Interaction) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(DbError::SqlxError)?;

        // Interactions can target accounts no scrape has seen yet
        sqlx::query(
            r#"
            INSERT INTO users (platform, user_id, username, last_seen)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(platform, user_id) DO UPDATE SET last_seen = excluded.last_seen
            "#,
        )
        .bind(interaction.platform.as_str())
        .bind(&interaction.user_id)
        .bind(&interaction.user_id)
        .bind(interaction.at)
        .execute(&mut *tx)
        .await
        .map_err(DbError::SqlxError)?;

        sqlx::query(
            r#"
            INSERT INTO user_interactions (platform, user_id, task_id, interaction, at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(interaction.platform.as_str())
        .bind(&interaction.user_id)
        .bind(&interaction.task_id)
        .bind(interaction.interaction.as_str())
        .bind(interaction.at)
        .execute(&mut *tx)
        .await
        .map_err(DbError::SqlxError)?;

        tx.commit().await.map_err(DbError::SqlxError)?;
        Ok(())
    }

    async fn record_rate_limited(
        &self,
        platform: PlatformKind,
        subject_id: &str,
        at: i64,
    ) -> Result<()> {
        sqlx::query("INSERT INTO rate_limit_events (platform, subject_id, at) VALUES (?, ?, ?)")
            .bind(platform.as_str())
            .bind(subject_id)
            .bind(at)
            .execute(&self.pool)
            .await
            .map_err(DbError::SqlxError)?;

        Ok(())
    }

    async fn roll_up_daily(&self, day: NaiveDate, now: i64) -> Result<DailyRollup> {
        let start = day
            .and_hms_opt(0, 0, 0)
            .map(|dt| dt.and_utc().timestamp())
            .ok_or_else(|| crate::error::CadenceError::InvalidInput(format!("Invalid day: {}", day)))?;
        let end = start + 24 * 3600;

        let (completed, failed): (i64, i64) = sqlx::query_as(
            r#"
            SELECT
                COALESCE(SUM(CASE WHEN status = 'completed' THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN status = 'failed' THEN 1 ELSE 0 END), 0)
            FROM tasks
            WHERE executed_time >= ? AND executed_time < ?
            "#,
        )
        .bind(start)
        .bind(end)
        .fetch_one(&self.pool)
        .await
        .map_err(DbError::SqlxError)?;

        // Requeued attempts leave no executed_time behind, so refusals are
        // counted from their own log
        let (rate_limited,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM rate_limit_events WHERE at >= ? AND at < ?")
                .bind(start)
                .bind(end)
                .fetch_one(&self.pool)
                .await
                .map_err(DbError::SqlxError)?;

        let (published,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM scheduled_posts WHERE posted = 1 AND posted_at >= ? AND posted_at < ?",
        )
        .bind(start)
        .bind(end)
        .fetch_one(&self.pool)
        .await
        .map_err(DbError::SqlxError)?;

        let rollup = DailyRollup {
            day: day.format("%Y-%m-%d").to_string(),
            tasks_completed: completed.max(0) as u64,
            tasks_failed: failed.max(0) as u64,
            rate_limited: rate_limited.max(0) as u64,
            posts_published: published.max(0) as u64,
            computed_at: now,
        };

        sqlx::query(
            r#"
            INSERT OR REPLACE INTO daily_analytics
                (day, tasks_completed, tasks_failed, rate_limited, posts_published, computed_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&rollup.day)
        .bind(to_i64(rollup.tasks_completed))
        .bind(to_i64(rollup.tasks_failed))
        .bind(to_i64(rollup.rate_limited))
        .bind(to_i64(rollup.posts_published))
        .bind(rollup.computed_at)
        .execute(&self.pool)
        .await
        .map_err(DbError::SqlxError)?;

        Ok(rollup)
    }
}

fn to_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn to_json<T: serde::Serialize + ?Sized>(id: &str, value: &T) -> Result<String> {
    serde_json::to_string(value).map_err(|e| {
        DbError::CorruptRecord {
            id: id.to_string(),
            reason: e.to_string(),
        }
        .into()
    })
}

fn from_json<T: serde::de::DeserializeOwned>(id: &str, column: &str, raw: &str) -> Result<T> {
    serde_json::from_str(raw).map_err(|e| {
        DbError::CorruptRecord {
            id: id.to_string(),
            reason: format!("{}: {}", column, e),
        }
        .into()
    })
}

fn parse_column<T>(id: &str, row: &SqliteRow, column: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let raw: String = row.try_get(column).map_err(DbError::SqlxError)?;
    raw.parse::<T>().map_err(|e| {
        DbError::CorruptRecord {
            id: id.to_string(),
            reason: format!("{}: {}", column, e),
        }
        .into()
    })
}

fn get_u64(row: &SqliteRow, column: &str) -> Result<u64> {
    let value: i64 = row.try_get(column).map_err(DbError::SqlxError)?;
    Ok(value.max(0) as u64)
}

fn task_from_row(r: &SqliteRow) -> Result<Task> {
    let id: String = r.try_get("id").map_err(DbError::SqlxError)?;

    let result_success: Option<bool> = r.try_get("result_success").map_err(DbError::SqlxError)?;
    let result = match result_success {
        Some(success) => {
            let message: Option<String> =
                r.try_get("result_message").map_err(DbError::SqlxError)?;
            let data: Option<String> = r.try_get("result_data").map_err(DbError::SqlxError)?;
            Some(TaskResult {
                success,
                message: message.unwrap_or_default(),
                data: data
                    .map(|raw| from_json(&id, "result_data", &raw))
                    .transpose()?,
            })
        }
        None => None,
    };

    let metadata: String = r.try_get("metadata").map_err(DbError::SqlxError)?;
    let priority: i64 = r.try_get("priority").map_err(DbError::SqlxError)?;
    let retry_count: i64 = r.try_get("retry_count").map_err(DbError::SqlxError)?;

    Ok(Task {
        task_type: parse_column(&id, r, "task_type")?,
        platform: parse_column(&id, r, "platform")?,
        target: r.try_get("target").map_err(DbError::SqlxError)?,
        action: r.try_get("action").map_err(DbError::SqlxError)?,
        status: parse_column(&id, r, "status")?,
        priority: clamp_priority(priority),
        scheduled_time: r.try_get("scheduled_time").map_err(DbError::SqlxError)?,
        executed_time: r.try_get("executed_time").map_err(DbError::SqlxError)?,
        retry_count: retry_count.clamp(0, i64::from(u32::MAX)) as u32,
        result,
        metadata: from_json(&id, "metadata", &metadata)?,
        created_at: r.try_get("created_at").map_err(DbError::SqlxError)?,
        id,
    })
}

fn post_from_row(r: &SqliteRow) -> Result<ScheduledPost> {
    let id: String = r.try_get("id").map_err(DbError::SqlxError)?;
    let media: String = r.try_get("media").map_err(DbError::SqlxError)?;
    let metadata: String = r.try_get("metadata").map_err(DbError::SqlxError)?;

    Ok(ScheduledPost {
        content: r.try_get("content").map_err(DbError::SqlxError)?,
        platform: parse_column(&id, r, "platform")?,
        media: from_json(&id, "media", &media)?,
        scheduled_time: r.try_get("scheduled_time").map_err(DbError::SqlxError)?,
        posted: r.try_get("posted").map_err(DbError::SqlxError)?,
        post_id: r.try_get("post_id").map_err(DbError::SqlxError)?,
        posted_at: r.try_get("posted_at").map_err(DbError::SqlxError)?,
        metadata: from_json(&id, "metadata", &metadata)?,
        last_error: r.try_get("last_error").map_err(DbError::SqlxError)?,
        created_at: r.try_get("created_at").map_err(DbError::SqlxError)?,
        id,
    })
}

fn user_from_row(r: &SqliteRow) -> Result<User> {
    let user_id: String = r.try_get("user_id").map_err(DbError::SqlxError)?;

    Ok(User {
        platform: parse_column(&user_id, r, "platform")?,
        username: r.try_get("username").map_err(DbError::SqlxError)?,
        display_name: r.try_get("display_name").map_err(DbError::SqlxError)?,
        followers: get_u64(r, "followers")?,
        following: get_u64(r, "following")?,
        verified: r.try_get("verified").map_err(DbError::SqlxError)?,
        bio: r.try_get("bio").map_err(DbError::SqlxError)?,
        last_seen: r.try_get("last_seen").map_err(DbError::SqlxError)?,
        user_id,
    })
}
