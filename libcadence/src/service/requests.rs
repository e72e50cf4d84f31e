//! Inbound requests accepted by the service layer
//!
//! Requests carry plain strings so they can come straight from a CLI
//! argument list or a JSON import file. [`TaskRequest::into_task`] and
//! [`PostRequest::into_post`] do all validation.

use serde::{Deserialize, Serialize};

use crate::error::{CadenceError, Result};
use crate::operations::is_supported;
use crate::types::{PlatformKind, ScheduledPost, Task, TaskMetadata, TaskType};

/// Request to queue one task
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskRequest {
    #[serde(rename = "type")]
    pub task_type: String,
    pub platform: String,
    pub target: String,
    pub action: String,
    /// Clamped to 1..=5, defaults to 3
    #[serde(default)]
    pub priority: Option<i64>,
    /// Unix seconds; defaults to now
    #[serde(default)]
    pub scheduled_time: Option<i64>,
    #[serde(default)]
    pub metadata: Option<TaskMetadata>,
}

impl TaskRequest {
    pub fn new(
        task_type: impl Into<String>,
        platform: impl Into<String>,
        target: impl Into<String>,
        action: impl Into<String>,
    ) -> Self {
        Self {
            task_type: task_type.into(),
            platform: platform.into(),
            target: target.into(),
            action: action.into(),
            ..Default::default()
        }
    }

    /// Validate and build a pending task
    pub fn into_task(self, now: i64) -> Result<Task> {
        require("type", &self.task_type)?;
        require("platform", &self.platform)?;
        require("target", &self.target)?;
        require("action", &self.action)?;

        let task_type: TaskType = self.task_type.parse()?;
        let platform: PlatformKind = self.platform.parse()?;

        if !is_supported(task_type, platform) {
            return Err(CadenceError::InvalidInput(format!(
                "Unsupported {} task for {}",
                task_type, platform
            )));
        }

        let mut task = Task::new(task_type, platform, self.target.trim(), self.action)
            .scheduled_at(self.scheduled_time.unwrap_or(now));
        task.created_at = now;
        if let Some(priority) = self.priority {
            task = task.with_priority(priority);
        }
        if let Some(metadata) = self.metadata {
            task.metadata = metadata;
        }

        Ok(task)
    }
}

/// Request to schedule one post
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PostRequest {
    pub content: String,
    pub platform: String,
    /// Unix seconds, must be in the future
    pub scheduled_time: i64,
    #[serde(default)]
    pub media: Vec<String>,
}

impl PostRequest {
    /// Validate the fields that do not need an adapter and build the post
    pub fn into_post(self, now: i64) -> Result<ScheduledPost> {
        require("platform", &self.platform)?;
        let platform: PlatformKind = self.platform.parse()?;

        if self.content.trim().is_empty() {
            return Err(CadenceError::InvalidInput(
                "Content cannot be empty".to_string(),
            ));
        }

        if self.scheduled_time <= now {
            return Err(CadenceError::InvalidInput(
                "Scheduled time must be in the future".to_string(),
            ));
        }

        let mut post = ScheduledPost::new(self.content, platform, self.scheduled_time);
        post.media = self.media;
        post.created_at = now;
        Ok(post)
    }
}

fn require(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(CadenceError::InvalidInput(format!(
            "Missing required field: {}",
            field
        )));
    }
    Ok(())
}
