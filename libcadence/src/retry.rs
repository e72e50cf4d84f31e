//! Retry policy for failed task executions
//!
//! Turns the outcome of one dispatch attempt into the task's next state.
//! Two modes are supported:
//!
//! - `terminal`: every failure ends the task as `failed`. `retry_count` is
//!   still recorded, but nothing re-arms the task.
//! - `requeue`: transient failures put the task back to `pending` with an
//!   exponential delay until the retry cap is reached.

use serde::{Deserialize, Serialize};

use crate::types::{Task, TaskResult, TaskStatus, MAX_RETRIES};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RetryMode {
    #[default]
    Terminal,
    Requeue,
}

/// Why an attempt did not succeed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    RateLimited,
    NotConfigured,
    Unsupported,
    Timeout,
    Adapter { transient: bool },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Failure {
    pub kind: FailureKind,
    pub message: String,
}

impl Failure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Configuration and unsupported-operation failures will fail again
    pub fn is_retryable(&self) -> bool {
        match self.kind {
            FailureKind::RateLimited | FailureKind::Timeout => true,
            FailureKind::Adapter { transient } => transient,
            FailureKind::NotConfigured | FailureKind::Unsupported => false,
        }
    }
}

/// Fields the dispatcher writes back after an attempt
#[derive(Debug, Clone, PartialEq)]
pub struct TaskUpdate {
    pub id: String,
    pub status: TaskStatus,
    pub result: TaskResult,
    pub retry_count: u32,
    pub executed_time: Option<i64>,
    pub scheduled_time: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    mode: RetryMode,
    /// Base requeue delay in seconds
    delay: u64,
}

impl RetryPolicy {
    pub fn new(mode: RetryMode, delay: u64) -> Self {
        Self { mode, delay }
    }

    pub fn terminal() -> Self {
        Self::new(RetryMode::Terminal, 0)
    }

    /// Compute the task's next state from one attempt
    pub fn apply(
        &self,
        task: &Task,
        attempt: std::result::Result<TaskResult, Failure>,
        now: i64,
    ) -> TaskUpdate {
        match attempt {
            Ok(result) => TaskUpdate {
                id: task.id.clone(),
                status: TaskStatus::Completed,
                result,
                retry_count: task.retry_count,
                executed_time: Some(now),
                scheduled_time: task.scheduled_time,
            },
            Err(failure) => {
                let retry_count = (task.retry_count + 1).min(MAX_RETRIES);
                let requeue = self.mode == RetryMode::Requeue
                    && failure.is_retryable()
                    && retry_count < MAX_RETRIES;

                if requeue {
                    TaskUpdate {
                        id: task.id.clone(),
                        status: TaskStatus::Pending,
                        result: TaskResult::failure(failure.message),
                        retry_count,
                        executed_time: None,
                        scheduled_time: now + self.backoff(retry_count),
                    }
                } else {
                    TaskUpdate {
                        id: task.id.clone(),
                        status: TaskStatus::Failed,
                        result: TaskResult::failure(failure.message),
                        retry_count,
                        executed_time: Some(now),
                        scheduled_time: task.scheduled_time,
                    }
                }
            }
        }
    }

    /// Delay before attempt `retry_count + 1`: delay, 2*delay, 4*delay...
    fn backoff(&self, retry_count: u32) -> i64 {
        let factor = 2_u64.saturating_pow(retry_count.saturating_sub(1));
        self.delay.saturating_mul(factor).min(i64::MAX as u64) as i64
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::terminal()
    }
}
