//! Core types for Cadence

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::CadenceError;

/// Hard cap on recorded failures for a single task
pub const MAX_RETRIES: u32 = 3;

pub const MIN_PRIORITY: i64 = 1;
pub const MAX_PRIORITY: i64 = 5;
pub const DEFAULT_PRIORITY: u8 = 3;

/// Default cap on users persisted from one scrape
pub const DEFAULT_MAX_RESULTS: usize = 50;

/// Platforms an adapter can be registered for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlatformKind {
    Twitter,
    Reddit,
    Instagram,
    Facebook,
}

impl PlatformKind {
    pub const ALL: [PlatformKind; 4] = [
        PlatformKind::Twitter,
        PlatformKind::Reddit,
        PlatformKind::Instagram,
        PlatformKind::Facebook,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PlatformKind::Twitter => "twitter",
            PlatformKind::Reddit => "reddit",
            PlatformKind::Instagram => "instagram",
            PlatformKind::Facebook => "facebook",
        }
    }
}

impl fmt::Display for PlatformKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PlatformKind {
    type Err = CadenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "twitter" => Ok(PlatformKind::Twitter),
            "reddit" => Ok(PlatformKind::Reddit),
            "instagram" => Ok(PlatformKind::Instagram),
            "facebook" => Ok(PlatformKind::Facebook),
            other => Err(CadenceError::InvalidInput(format!(
                "Unknown platform: '{}'. Valid options: twitter, reddit, instagram, facebook",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    Like,
    Comment,
    Follow,
    Retweet,
    Scrape,
    TrendMonitor,
}

impl TaskType {
    pub const ALL: [TaskType; 6] = [
        TaskType::Like,
        TaskType::Comment,
        TaskType::Follow,
        TaskType::Retweet,
        TaskType::Scrape,
        TaskType::TrendMonitor,
    ];

    /// Types that touch another account and are logged in interaction history
    pub const INTERACTIONS: [TaskType; 4] = [
        TaskType::Like,
        TaskType::Comment,
        TaskType::Follow,
        TaskType::Retweet,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskType::Like => "like",
            TaskType::Comment => "comment",
            TaskType::Follow => "follow",
            TaskType::Retweet => "retweet",
            TaskType::Scrape => "scrape",
            TaskType::TrendMonitor => "trend_monitor",
        }
    }

    pub fn is_interaction(&self) -> bool {
        Self::INTERACTIONS.contains(self)
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskType {
    type Err = CadenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "like" => Ok(TaskType::Like),
            "comment" => Ok(TaskType::Comment),
            "follow" => Ok(TaskType::Follow),
            "retweet" => Ok(TaskType::Retweet),
            "scrape" => Ok(TaskType::Scrape),
            "trend_monitor" | "trend-monitor" => Ok(TaskType::TrendMonitor),
            other => Err(CadenceError::InvalidInput(format!(
                "Unknown task type: '{}'. Valid options: like, comment, follow, retweet, scrape, trend_monitor",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Scheduled,
    Completed,
    Failed,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Scheduled => "scheduled",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
        }
    }

    /// Pending and scheduled tasks are eligible for selection
    pub fn is_selectable(&self) -> bool {
        matches!(self, TaskStatus::Pending | TaskStatus::Scheduled)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = CadenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(TaskStatus::Pending),
            "scheduled" => Ok(TaskStatus::Scheduled),
            "completed" => Ok(TaskStatus::Completed),
            "failed" => Ok(TaskStatus::Failed),
            other => Err(CadenceError::InvalidInput(format!(
                "Unknown task status: {}",
                other
            ))),
        }
    }
}

/// Outcome of the most recent execution attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskResult {
    pub success: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl TaskResult {
    pub fn success(message: impl Into<String>, data: Option<serde_json::Value>) -> Self {
        Self {
            success: true,
            message: message.into(),
            data,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: None,
        }
    }
}

/// Narrowing applied to users returned by a scrape
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScrapeFilters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_followers: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_followers: Option<u64>,
    #[serde(default)]
    pub verified_only: bool,
    /// Every keyword must appear in the username, display name or bio
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keywords: Vec<String>,
}

impl ScrapeFilters {
    pub fn matches(&self, user: &ScrapedUser) -> bool {
        if self.verified_only && !user.verified {
            return false;
        }
        if self.min_followers.is_some_and(|min| user.followers < min) {
            return false;
        }
        if self.max_followers.is_some_and(|max| user.followers > max) {
            return false;
        }

        let haystack = format!(
            "{} {} {}",
            user.username,
            user.display_name.as_deref().unwrap_or_default(),
            user.bio.as_deref().unwrap_or_default()
        )
        .to_lowercase();

        self.keywords
            .iter()
            .all(|keyword| haystack.contains(&keyword.to_lowercase()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrapeLimits {
    #[serde(default = "default_max_results")]
    pub max_results: usize,
}

impl Default for ScrapeLimits {
    fn default() -> Self {
        Self {
            max_results: DEFAULT_MAX_RESULTS,
        }
    }
}

fn default_max_results() -> usize {
    DEFAULT_MAX_RESULTS
}

/// Per-task parameters that do not fit in `target`/`action`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskMetadata {
    #[serde(default)]
    pub filters: ScrapeFilters,
    #[serde(default)]
    pub limits: ScrapeLimits,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub task_type: TaskType,
    pub platform: PlatformKind,
    pub target: String,
    pub action: String,
    pub status: TaskStatus,
    pub priority: u8,
    pub scheduled_time: i64,
    pub executed_time: Option<i64>,
    pub retry_count: u32,
    pub result: Option<TaskResult>,
    pub metadata: TaskMetadata,
    pub created_at: i64,
}

impl Task {
    pub fn new(
        task_type: TaskType,
        platform: PlatformKind,
        target: impl Into<String>,
        action: impl Into<String>,
    ) -> Self {
        let now = chrono::Utc::now().timestamp();
        Self {
            id: Uuid::new_v4().to_string(),
            task_type,
            platform,
            target: target.into(),
            action: action.into(),
            status: TaskStatus::Pending,
            priority: DEFAULT_PRIORITY,
            scheduled_time: now,
            executed_time: None,
            retry_count: 0,
            result: None,
            metadata: TaskMetadata::default(),
            created_at: now,
        }
    }

    pub fn with_priority(mut self, priority: i64) -> Self {
        self.priority = clamp_priority(priority);
        self
    }

    pub fn scheduled_at(mut self, scheduled_time: i64) -> Self {
        self.scheduled_time = scheduled_time;
        self
    }

    pub fn is_due(&self, now: i64) -> bool {
        self.status.is_selectable() && self.scheduled_time <= now
    }
}

/// User-editable fields of a task that has not run yet
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskEdit {
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub priority: Option<i64>,
    #[serde(default)]
    pub scheduled_time: Option<i64>,
}

impl TaskEdit {
    pub fn is_empty(&self) -> bool {
        self.action.is_none() && self.priority.is_none() && self.scheduled_time.is_none()
    }
}

/// Clamp a requested priority into the supported 1..=5 range
pub fn clamp_priority(priority: i64) -> u8 {
    priority.clamp(MIN_PRIORITY, MAX_PRIORITY) as u8
}

/// Engagement counters tracked for a published post
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PostMetadata {
    #[serde(default)]
    pub likes: u64,
    #[serde(default)]
    pub shares: u64,
    #[serde(default)]
    pub comments: u64,
    #[serde(default)]
    pub views: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledPost {
    pub id: String,
    pub content: String,
    pub platform: PlatformKind,
    pub media: Vec<String>,
    pub scheduled_time: i64,
    pub posted: bool,
    pub post_id: Option<String>,
    pub posted_at: Option<i64>,
    pub metadata: PostMetadata,
    pub last_error: Option<String>,
    pub created_at: i64,
}

impl ScheduledPost {
    pub fn new(content: impl Into<String>, platform: PlatformKind, scheduled_time: i64) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            content: content.into(),
            platform,
            media: Vec::new(),
            scheduled_time,
            posted: false,
            post_id: None,
            posted_at: None,
            metadata: PostMetadata::default(),
            last_error: None,
            created_at: chrono::Utc::now().timestamp(),
        }
    }

    pub fn is_due(&self, now: i64) -> bool {
        !self.posted && self.scheduled_time <= now
    }
}

/// A user profile discovered by a scrape
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScrapedUser {
    pub user_id: String,
    pub username: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub followers: u64,
    #[serde(default)]
    pub following: u64,
    #[serde(default)]
    pub verified: bool,
    #[serde(default)]
    pub bio: Option<String>,
}

/// Stored user record, keyed by `(platform, user_id)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub platform: PlatformKind,
    pub user_id: String,
    pub username: String,
    pub display_name: Option<String>,
    pub followers: u64,
    pub following: u64,
    pub verified: bool,
    pub bio: Option<String>,
    pub last_seen: i64,
}

/// One entry in a user's interaction history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interaction {
    pub platform: PlatformKind,
    pub user_id: String,
    pub task_id: String,
    pub interaction: TaskType,
    pub at: i64,
}

/// A post surfaced by a platform search
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FoundPost {
    pub id: String,
    pub author: String,
    pub text: String,
    #[serde(default)]
    pub engagement: u64,
}

/// Per-day counters produced by the analytics roll-up
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyRollup {
    pub day: String,
    pub tasks_completed: u64,
    pub tasks_failed: u64,
    pub rate_limited: u64,
    pub posts_published: u64,
    pub computed_at: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_new_defaults() {
        let task = Task::new(TaskType::Like, PlatformKind::Twitter, "12345", "like it");

        assert!(Uuid::parse_str(&task.id).is_ok(), "Task ID should be a valid UUID");
        assert_eq!(task.status, TaskStatus::Pending);
        assert_eq!(task.priority, DEFAULT_PRIORITY);
        assert_eq!(task.retry_count, 0);
        assert_eq!(task.scheduled_time, task.created_at);
        assert!(task.executed_time.is_none());
        assert!(task.result.is_none());
    }

    #[test]
    fn test_priority_is_clamped() {
        assert_eq!(clamp_priority(0), 1);
        assert_eq!(clamp_priority(-10), 1);
        assert_eq!(clamp_priority(4), 4);
        assert_eq!(clamp_priority(99), 5);
    }

    #[test]
    fn test_task_type_parsing() {
        assert_eq!("like".parse::<TaskType>().unwrap(), TaskType::Like);
        assert_eq!("Retweet".parse::<TaskType>().unwrap(), TaskType::Retweet);
        assert_eq!("trend-monitor".parse::<TaskType>().unwrap(), TaskType::TrendMonitor);
        assert_eq!(TaskType::TrendMonitor.to_string(), "trend_monitor");

        let err = "poke".parse::<TaskType>().unwrap_err();
        assert!(err.to_string().contains("Unknown task type"));
    }

    #[test]
    fn test_platform_parsing() {
        assert_eq!(" Reddit ".parse::<PlatformKind>().unwrap(), PlatformKind::Reddit);
        assert!("myspace".parse::<PlatformKind>().is_err());
        for platform in PlatformKind::ALL {
            assert_eq!(platform.as_str().parse::<PlatformKind>().unwrap(), platform);
        }
    }

    #[test]
    fn test_status_selection_predicate() {
        let now = 1_000;
        let task = Task::new(TaskType::Follow, PlatformKind::Reddit, "spez", "follow").scheduled_at(now);
        assert!(task.is_due(now));
        assert!(!task.is_due(now - 1));

        let mut scheduled = task.clone();
        scheduled.status = TaskStatus::Scheduled;
        assert!(scheduled.is_due(now));

        for status in [TaskStatus::Completed, TaskStatus::Failed] {
            let mut done = task.clone();
            done.status = status;
            assert!(!done.is_due(now + 100));
            assert!(status.is_terminal());
        }
    }

    #[test]
    fn test_serde_uses_wire_names() {
        let json = serde_json::to_string(&TaskType::TrendMonitor).unwrap();
        assert_eq!(json, "\"trend_monitor\"");
        let json = serde_json::to_string(&PlatformKind::Instagram).unwrap();
        assert_eq!(json, "\"instagram\"");
    }

    #[test]
    fn test_scrape_filters() {
        let user = ScrapedUser {
            user_id: "1".into(),
            username: "rustacean".into(),
            display_name: Some("Ferris".into()),
            followers: 500,
            following: 10,
            verified: false,
            bio: Some("Writes Rust daily".into()),
        };

        assert!(ScrapeFilters::default().matches(&user));
        assert!(ScrapeFilters {
            min_followers: Some(100),
            keywords: vec!["rust".into()],
            ..Default::default()
        }
        .matches(&user));
        assert!(!ScrapeFilters {
            max_followers: Some(100),
            ..Default::default()
        }
        .matches(&user));
        assert!(!ScrapeFilters {
            verified_only: true,
            ..Default::default()
        }
        .matches(&user));
        assert!(!ScrapeFilters {
            keywords: vec!["golang".into()],
            ..Default::default()
        }
        .matches(&user));
    }

    #[test]
    fn test_metadata_defaults_from_empty_json() {
        let metadata: TaskMetadata = serde_json::from_str("{}").unwrap();
        assert_eq!(metadata.limits.max_results, DEFAULT_MAX_RESULTS);
        assert!(metadata.filters.keywords.is_empty());
    }

    #[test]
    fn test_post_due_predicate() {
        let mut post = ScheduledPost::new("hello", PlatformKind::Facebook, 100);
        assert!(post.is_due(100));
        assert!(!post.is_due(99));
        post.posted = true;
        assert!(!post.is_due(1_000));
    }
}
