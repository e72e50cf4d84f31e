//! Mock platform implementation for testing
//!
//! A configurable adapter that can succeed, fail, stall, or report itself
//! unconfigured. Every call is recorded so tests can assert on what the
//! dispatcher actually invoked. The daemon also uses it for `--dry-run`.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::sleep;

use crate::error::{PlatformError, Result};
use crate::platforms::{Platform, SearchOptions, SearchResults};
use crate::types::PlatformKind;

/// A call observed by the mock
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCall {
    Post { content: String, media: Vec<String> },
    Like { target: String },
    Comment { target: String, text: String },
    Follow { target: String },
    Retweet { target: String },
    Search { query: String, max_results: usize },
}

/// Configuration for mock platform behavior
#[derive(Debug, Clone)]
pub struct MockConfig {
    pub kind: PlatformKind,

    /// Whether the platform is configured
    pub is_configured: bool,

    /// Error returned by every operation while `fail_first` allows it
    pub error: Option<PlatformError>,

    /// Number of calls that fail before the mock starts succeeding.
    /// `usize::MAX` fails forever.
    pub fail_first: usize,

    /// Delay before completing operations (simulates network latency)
    pub delay: Duration,

    pub character_limit: Option<usize>,

    /// Canned response for `search`
    pub search_results: SearchResults,

    /// Log every call at info level
    pub dry_run: bool,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            kind: PlatformKind::Twitter,
            is_configured: true,
            error: None,
            fail_first: 0,
            delay: Duration::from_millis(0),
            character_limit: None,
            search_results: SearchResults::default(),
            dry_run: false,
        }
    }
}

/// Mock platform for testing
pub struct MockPlatform {
    config: MockConfig,
    calls: Arc<Mutex<Vec<MockCall>>>,
    failures: Arc<AtomicUsize>,
    sequence: AtomicUsize,
}

impl MockPlatform {
    /// Create a new mock platform with the given configuration
    pub fn new(config: MockConfig) -> Self {
        Self {
            config,
            calls: Arc::new(Mutex::new(Vec::new())),
            failures: Arc::new(AtomicUsize::new(0)),
            sequence: AtomicUsize::new(0),
        }
    }

    /// Create a mock platform that always succeeds
    pub fn success(kind: PlatformKind) -> Self {
        Self::new(MockConfig {
            kind,
            ..Default::default()
        })
    }

    /// Create a mock platform whose every call fails with `error`
    pub fn failing(kind: PlatformKind, error: PlatformError) -> Self {
        Self::flaky(kind, usize::MAX, error)
    }

    /// Create a mock platform that fails the first `times` calls
    pub fn flaky(kind: PlatformKind, times: usize, error: PlatformError) -> Self {
        Self::new(MockConfig {
            kind,
            error: Some(error),
            fail_first: times,
            ..Default::default()
        })
    }

    /// Create a mock platform with a delay
    pub fn with_delay(kind: PlatformKind, delay: Duration) -> Self {
        Self::new(MockConfig {
            kind,
            delay,
            ..Default::default()
        })
    }

    /// Create a mock platform with a character limit
    pub fn with_limit(kind: PlatformKind, limit: usize) -> Self {
        Self::new(MockConfig {
            kind,
            character_limit: Some(limit),
            ..Default::default()
        })
    }

    /// Create a mock platform that returns `results` from search
    pub fn with_search_results(kind: PlatformKind, results: SearchResults) -> Self {
        Self::new(MockConfig {
            kind,
            search_results: results,
            ..Default::default()
        })
    }

    /// Create a mock platform that is not configured
    pub fn not_configured(kind: PlatformKind) -> Self {
        Self::new(MockConfig {
            kind,
            is_configured: false,
            ..Default::default()
        })
    }

    /// Create a logging stand-in that succeeds without side effects
    pub fn dry_run(kind: PlatformKind) -> Self {
        Self::new(MockConfig {
            kind,
            dry_run: true,
            ..Default::default()
        })
    }

    /// All calls made so far, in order
    pub fn calls(&self) -> Vec<MockCall> {
        self.lock_calls().clone()
    }

    pub fn call_count(&self) -> usize {
        self.lock_calls().len()
    }

    fn lock_calls(&self) -> std::sync::MutexGuard<'_, Vec<MockCall>> {
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Record the call, wait out the delay, then decide success or failure
    async fn invoke(&self, call: MockCall) -> Result<()> {
        if self.config.dry_run {
            tracing::info!(platform = %self.config.kind, "[dry-run] {:?}", call);
        }
        self.lock_calls().push(call);

        if !self.config.delay.is_zero() {
            sleep(self.config.delay).await;
        }

        if let Some(error) = &self.config.error {
            let failed = self.failures.fetch_add(1, Ordering::SeqCst);
            if failed < self.config.fail_first {
                return Err(error.clone().into());
            }
        }

        Ok(())
    }

    fn next_id(&self, prefix: &str) -> String {
        let n = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        format!("{}:{}-{}", self.config.kind, prefix, n)
    }
}

#[async_trait]
impl Platform for MockPlatform {
    fn kind(&self) -> PlatformKind {
        self.config.kind
    }

    fn is_configured(&self) -> bool {
        self.config.is_configured
    }

    fn character_limit(&self) -> Option<usize> {
        self.config.character_limit
    }

    async fn post(&self, content: &str, media: &[String]) -> Result<String> {
        self.invoke(MockCall::Post {
            content: content.to_string(),
            media: media.to_vec(),
        })
        .await?;
        Ok(self.next_id("post"))
    }

    async fn like(&self, target: &str) -> Result<()> {
        self.invoke(MockCall::Like {
            target: target.to_string(),
        })
        .await
    }

    async fn comment(&self, target: &str, text: &str) -> Result<String> {
        self.invoke(MockCall::Comment {
            target: target.to_string(),
            text: text.to_string(),
        })
        .await?;
        Ok(self.next_id("comment"))
    }

    async fn follow(&self, target: &str) -> Result<()> {
        self.invoke(MockCall::Follow {
            target: target.to_string(),
        })
        .await
    }

    async fn retweet(&self, target: &str) -> Result<()> {
        if self.config.kind != PlatformKind::Twitter {
            return Err(PlatformError::NotImplemented(format!(
                "{} does not support retweets",
                self.config.kind
            ))
            .into());
        }
        self.invoke(MockCall::Retweet {
            target: target.to_string(),
        })
        .await
    }

    async fn search(&self, query: &str, options: &SearchOptions) -> Result<SearchResults> {
        self.invoke(MockCall::Search {
            query: query.to_string(),
            max_results: options.max_results,
        })
        .await?;
        Ok(self.config.search_results.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_success_records_calls() {
        let platform = MockPlatform::success(PlatformKind::Twitter);

        assert!(platform.is_configured());
        assert_eq!(platform.name(), "twitter");

        let post_id = platform.post("Hello", &["img.png".to_string()]).await.unwrap();
        assert_eq!(post_id, "twitter:post-1");
        platform.like("42").await.unwrap();
        let comment_id = platform.comment("42", "nice").await.unwrap();
        assert_eq!(comment_id, "twitter:comment-2");

        assert_eq!(
            platform.calls(),
            vec![
                MockCall::Post {
                    content: "Hello".to_string(),
                    media: vec!["img.png".to_string()]
                },
                MockCall::Like {
                    target: "42".to_string()
                },
                MockCall::Comment {
                    target: "42".to_string(),
                    text: "nice".to_string()
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_mock_failing() {
        let platform = MockPlatform::failing(
            PlatformKind::Reddit,
            PlatformError::Network("connection refused".to_string()),
        );

        for _ in 0..3 {
            let err = platform.follow("spez").await.unwrap_err();
            assert!(err.to_string().contains("connection refused"));
        }
        assert_eq!(platform.call_count(), 3);
    }

    #[tokio::test]
    async fn test_mock_flaky_recovers() {
        let platform = MockPlatform::flaky(
            PlatformKind::Twitter,
            2,
            PlatformError::Network("reset".to_string()),
        );

        assert!(platform.like("1").await.is_err());
        assert!(platform.like("1").await.is_err());
        assert!(platform.like("1").await.is_ok());
    }

    #[tokio::test]
    async fn test_mock_with_delay() {
        let platform = MockPlatform::with_delay(PlatformKind::Twitter, Duration::from_millis(50));

        let start = std::time::Instant::now();
        platform.like("1").await.unwrap();
        assert!(start.elapsed() >= Duration::from_millis(50));
    }

    #[tokio::test]
    async fn test_mock_retweet_only_on_twitter() {
        let reddit = MockPlatform::success(PlatformKind::Reddit);
        assert!(reddit.retweet("1").await.is_err());
        assert_eq!(reddit.call_count(), 0);

        let twitter = MockPlatform::success(PlatformKind::Twitter);
        assert!(twitter.retweet("1").await.is_ok());
    }

    #[tokio::test]
    async fn test_mock_search_returns_canned_results() {
        let results = SearchResults {
            users: vec![crate::types::ScrapedUser {
                user_id: "u1".to_string(),
                username: "alice".to_string(),
                ..Default::default()
            }],
            posts: vec![],
        };
        let platform = MockPlatform::with_search_results(PlatformKind::Instagram, results.clone());

        let found = platform
            .search("#rust", &SearchOptions::default())
            .await
            .unwrap();
        assert_eq!(found, results);
    }

    #[test]
    fn test_mock_not_configured() {
        let platform = MockPlatform::not_configured(PlatformKind::Facebook);
        assert!(!platform.is_configured());
    }
}
