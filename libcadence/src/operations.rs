//! Typed mapping from `(TaskType, PlatformKind)` to adapter operations
//!
//! The match below is exhaustive over both enums, so adding a platform or
//! task type does not compile until every combination is decided.

use crate::types::{PlatformKind, TaskType};

/// Adapter operation a task resolves to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Like,
    Comment,
    Follow,
    Retweet,
    Scrape,
    TrendMonitor,
}

/// Resolve the operation for a task, `None` when the platform cannot do it
pub fn operation_for(task_type: TaskType, platform: PlatformKind) -> Option<Operation> {
    use PlatformKind::{Facebook, Instagram, Reddit, Twitter};

    match (task_type, platform) {
        (TaskType::Like, Twitter | Reddit | Instagram | Facebook) => Some(Operation::Like),
        (TaskType::Comment, Twitter | Reddit | Instagram | Facebook) => Some(Operation::Comment),
        (TaskType::Follow, Twitter | Reddit | Instagram) => Some(Operation::Follow),
        (TaskType::Follow, Facebook) => None,
        (TaskType::Retweet, Twitter) => Some(Operation::Retweet),
        (TaskType::Retweet, Reddit | Instagram | Facebook) => None,
        (TaskType::Scrape, Twitter | Reddit | Instagram) => Some(Operation::Scrape),
        (TaskType::Scrape, Facebook) => None,
        (TaskType::TrendMonitor, Twitter | Reddit) => Some(Operation::TrendMonitor),
        (TaskType::TrendMonitor, Instagram | Facebook) => None,
    }
}

/// Whether a task of this type may be registered for `platform`
pub fn is_supported(task_type: TaskType, platform: PlatformKind) -> bool {
    operation_for(task_type, platform).is_some()
}

/// Every supported combination, in declaration order
pub fn supported_pairs() -> impl Iterator<Item = (TaskType, PlatformKind)> {
    TaskType::ALL.into_iter().flat_map(|task_type| {
        PlatformKind::ALL
            .into_iter()
            .filter(move |platform| is_supported(task_type, *platform))
            .map(move |platform| (task_type, platform))
    })
}
