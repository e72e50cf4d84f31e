//! Platform adapter abstraction
//!
//! Adapters are the only components with external side effects. Each one
//! wraps a single platform's client and exposes the small set of
//! operations the dispatcher needs. The engine never builds requests itself.
//!
//! # Examples
//!
//! ```no_run
//! use std::sync::Arc;
//! use libcadence::platforms::{mock::MockPlatform, PlatformRegistry};
//! use libcadence::types::PlatformKind;
//!
//! let mut registry = PlatformRegistry::new();
//! registry.register(Arc::new(MockPlatform::success(PlatformKind::Twitter)));
//!
//! if let Some(adapter) = registry.get(PlatformKind::Twitter) {
//!     println!("{} configured: {}", adapter.name(), adapter.is_configured());
//! }
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{PlatformError, Result};
use crate::types::{FoundPost, PlatformKind, ScrapedUser, DEFAULT_MAX_RESULTS};

// Mock platform is available for all builds (not just tests) to support
// integration tests and the daemon's dry-run mode
pub mod mock;

/// Parameters for a platform search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchOptions {
    /// Upper bound on returned items
    pub max_results: usize,
    /// Ask the platform for user profiles rather than posts
    pub include_users: bool,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            max_results: DEFAULT_MAX_RESULTS,
            include_users: true,
        }
    }
}

/// Items returned by a search
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResults {
    pub users: Vec<ScrapedUser>,
    pub posts: Vec<FoundPost>,
}

/// Unified interface over one social platform's client
#[async_trait]
pub trait Platform: Send + Sync {
    /// Which platform this adapter talks to
    fn kind(&self) -> PlatformKind;

    /// Lowercase platform name, used in logs and result messages
    fn name(&self) -> &str {
        self.kind().as_str()
    }

    /// Whether credentials and settings are present
    ///
    /// The dispatcher checks this before every call and records
    /// `"<platform> service not configured"` when it returns false.
    fn is_configured(&self) -> bool;

    /// Maximum post length, or `None` when the platform has no hard limit
    fn character_limit(&self) -> Option<usize> {
        None
    }

    /// Check content against platform rules before publishing
    fn validate_content(&self, content: &str) -> Result<()> {
        if content.trim().is_empty() {
            return Err(PlatformError::Validation("Content cannot be empty".to_string()).into());
        }

        if let Some(limit) = self.character_limit() {
            let length = content.chars().count();
            if length > limit {
                return Err(PlatformError::Validation(format!(
                    "Content exceeds {}'s {} character limit (current: {} characters)",
                    self.name(),
                    limit,
                    length
                ))
                .into());
            }
        }

        Ok(())
    }

    /// Publish content, returning the platform-assigned post id
    async fn post(&self, content: &str, media: &[String]) -> Result<String>;

    async fn like(&self, target: &str) -> Result<()>;

    /// Reply to `target`, returning the id of the new comment
    async fn comment(&self, target: &str, text: &str) -> Result<String>;

    async fn follow(&self, target: &str) -> Result<()>;

    /// Re-share `target`. Only some platforms support it.
    async fn retweet(&self, _target: &str) -> Result<()> {
        Err(PlatformError::NotImplemented(format!("{} does not support retweets", self.name())).into())
    }

    async fn search(&self, query: &str, options: &SearchOptions) -> Result<SearchResults>;
}

/// Adapters keyed by platform, one per platform
#[derive(Clone, Default)]
pub struct PlatformRegistry {
    adapters: HashMap<PlatformKind, Arc<dyn Platform>>,
}

impl PlatformRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an adapter, replacing any previous one for the same platform
    pub fn register(&mut self, adapter: Arc<dyn Platform>) -> &mut Self {
        let kind = adapter.kind();
        if self.adapters.insert(kind, adapter).is_some() {
            tracing::debug!("Replaced adapter for {}", kind);
        }
        self
    }

    pub fn get(&self, platform: PlatformKind) -> Option<&Arc<dyn Platform>> {
        self.adapters.get(&platform)
    }

    /// Adapter for `platform` only if it reports itself configured
    pub fn configured(&self, platform: PlatformKind) -> Option<&Arc<dyn Platform>> {
        self.get(platform).filter(|adapter| adapter.is_configured())
    }

    pub fn platforms(&self) -> Vec<PlatformKind> {
        let mut kinds: Vec<_> = self.adapters.keys().copied().collect();
        kinds.sort();
        kinds
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }
}
