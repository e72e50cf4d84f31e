//! Per-platform admission control
//!
//! A fixed-window counter per platform. The window starts on the first
//! admission check and is replaced as soon as `now >= reset_time`. Bursts of
//! up to twice the limit are possible across a window boundary; the platform
//! API remains the authority, this only avoids wasted calls.
//!
//! State is process-local and lost on restart. A deployment with several
//! daemons needs a shared implementation of [`Admission`].

use serde::Serialize;
use std::collections::HashMap;
use std::sync::Mutex;

use crate::config::RateLimitConfig;
use crate::types::PlatformKind;

/// Yes/no decision on whether a call to `platform` may proceed at `now`
pub trait Admission: Send + Sync {
    fn admit(&self, platform: PlatformKind, now: i64) -> bool;
}

/// Counter state of one platform's current window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowState {
    pub count: u32,
    pub reset_time: i64,
}

/// Configured limit of one platform next to its current window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RateLimitUsage {
    pub platform: PlatformKind,
    pub max_requests: u32,
    pub window: i64,
    /// Admissions in the current window, 0 before the first check
    pub used: u32,
    pub reset_time: Option<i64>,
}

/// In-memory fixed-window rate limiter
pub struct RateLimiter {
    /// Platform-specific limits
    limits: HashMap<PlatformKind, RateLimitConfig>,
    windows: Mutex<HashMap<PlatformKind, WindowState>>,
}

impl RateLimiter {
    /// Create a new rate limiter with the given limits
    pub fn new(limits: HashMap<PlatformKind, RateLimitConfig>) -> Self {
        Self {
            limits,
            windows: Mutex::new(HashMap::new()),
        }
    }

    /// Limiter that admits everything
    pub fn unlimited() -> Self {
        Self::new(HashMap::new())
    }

    /// Current window for `platform`, if one has been opened
    pub fn snapshot(&self, platform: PlatformKind) -> Option<WindowState> {
        self.lock().get(&platform).copied()
    }

    /// Every limited platform with its window, ordered by platform
    pub fn usage(&self) -> Vec<RateLimitUsage> {
        let windows = self.lock();
        let mut usage: Vec<RateLimitUsage> = self
            .limits
            .iter()
            .map(|(platform, limit)| {
                let window = windows.get(platform);
                RateLimitUsage {
                    platform: *platform,
                    max_requests: limit.max_requests,
                    window: limit.window,
                    used: window.map_or(0, |w| w.count),
                    reset_time: window.map(|w| w.reset_time),
                }
            })
            .collect();
        usage.sort_by_key(|u| u.platform);
        usage
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<PlatformKind, WindowState>> {
        // A panic while holding the lock cannot leave a window half-updated
        self.windows
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Admission for RateLimiter {
    fn admit(&self, platform: PlatformKind, now: i64) -> bool {
        let limit = match self.limits.get(&platform) {
            Some(limit) => *limit,
            None => return true, // No limit configured, allow
        };

        let mut windows = self.lock();
        let window = windows.entry(platform).or_insert(WindowState {
            count: 0,
            reset_time: now + limit.window,
        });

        if now >= window.reset_time {
            window.count = 0;
            window.reset_time = now + limit.window;
        }

        if window.count < limit.max_requests {
            window.count += 1;
            true
        } else {
            tracing::debug!(
                platform = %platform,
                count = window.count,
                reset_time = window.reset_time,
                "Admission rejected"
            );
            false
        }
    }
}
