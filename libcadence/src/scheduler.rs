//! Periodic trigger runner
//!
//! A [`Trigger`] says "run this job every D". Each trigger gets its own tokio
//! task; the first run happens one interval after [`Scheduler::start`] and
//! ticks missed while a job is busy are skipped rather than replayed.
//!
//! Two runs of the same trigger never overlap. With [`OverlapPolicy::Skip`]
//! a run that finds the job busy is dropped; with
//! [`OverlapPolicy::Serialize`] it waits its turn. Manual runs through
//! [`Scheduler::run_now`] follow the same rule.

use async_trait::async_trait;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::error::{Result, SchedulerError};

/// Work performed by one trigger tick
#[async_trait]
pub trait Job: Send + Sync {
    async fn run(&self) -> Result<TickSummary>;
}

/// Per-tick counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TickSummary {
    pub selected: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Selected items another tick had already claimed
    pub skipped: usize,
    /// Items (or whole ticks) that hit an error instead of an outcome
    pub errors: usize,
}

impl TickSummary {
    pub fn record(&mut self, succeeded: bool) {
        if succeeded {
            self.succeeded += 1;
        } else {
            self.failed += 1;
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OverlapPolicy {
    /// Drop a run that would overlap the one in progress
    #[default]
    Skip,
    /// Wait for the run in progress, then run
    Serialize,
}

pub struct Trigger {
    pub name: String,
    pub interval: Duration,
    pub overlap: OverlapPolicy,
    pub job: Arc<dyn Job>,
}

impl Trigger {
    pub fn every(name: impl Into<String>, interval: Duration, job: Arc<dyn Job>) -> Self {
        Self {
            name: name.into(),
            interval,
            overlap: OverlapPolicy::default(),
            job,
        }
    }

    pub fn with_overlap(mut self, overlap: OverlapPolicy) -> Self {
        self.overlap = overlap;
        self
    }
}

impl std::fmt::Debug for Trigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Trigger")
            .field("name", &self.name)
            .field("interval", &self.interval)
            .field("overlap", &self.overlap)
            .finish_non_exhaustive()
    }
}

/// Snapshot of one trigger
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TriggerStatus {
    /// A run is in progress
    pub running: bool,
    /// The periodic loop is active
    pub scheduled: bool,
    #[serde(with = "duration_text")]
    pub interval: Duration,
    pub runs: u64,
    /// Unix seconds of the last finished run
    pub last_run: Option<i64>,
}

mod duration_text {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&humantime::format_duration(*d).to_string())
    }
}

struct TriggerState {
    trigger: Trigger,
    guard: tokio::sync::Mutex<()>,
    running: AtomicBool,
    runs: AtomicU64,
    last_run: AtomicI64,
}

impl TriggerState {
    fn new(trigger: Trigger) -> Self {
        Self {
            trigger,
            guard: tokio::sync::Mutex::new(()),
            running: AtomicBool::new(false),
            runs: AtomicU64::new(0),
            last_run: AtomicI64::new(0),
        }
    }

    /// Run the job once under the overlap policy. `None` means skipped.
    async fn tick(&self) -> Option<TickSummary> {
        let name = &self.trigger.name;
        let _guard = match self.trigger.overlap {
            OverlapPolicy::Skip => match self.guard.try_lock() {
                Ok(guard) => guard,
                Err(_) => {
                    tracing::debug!(trigger = %name, "Previous run still in progress, skipping");
                    return None;
                }
            },
            OverlapPolicy::Serialize => self.guard.lock().await,
        };

        self.running.store(true, Ordering::SeqCst);
        let started = Instant::now();

        let summary = match self.trigger.job.run().await {
            Ok(summary) => summary,
            Err(e) => {
                tracing::error!(trigger = %name, "Tick failed: {}", e);
                TickSummary {
                    errors: 1,
                    ..Default::default()
                }
            }
        };

        self.running.store(false, Ordering::SeqCst);
        self.runs.fetch_add(1, Ordering::SeqCst);
        self.last_run
            .store(chrono::Utc::now().timestamp(), Ordering::SeqCst);

        tracing::info!(
            trigger = %name,
            selected = summary.selected,
            succeeded = summary.succeeded,
            failed = summary.failed,
            skipped = summary.skipped,
            errors = summary.errors,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Tick complete"
        );

        Some(summary)
    }

    async fn run_loop(self: Arc<Self>, token: CancellationToken) {
        let period = self.trigger.interval;
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        tracing::debug!(trigger = %self.trigger.name, "Trigger loop started, every {:?}", period);

        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = ticker.tick() => {
                    self.tick().await;
                }
            }
        }

        tracing::debug!(trigger = %self.trigger.name, "Trigger loop stopped");
    }
}

/// Owns the triggers and their loops
#[derive(Default)]
pub struct Scheduler {
    triggers: BTreeMap<String, Arc<TriggerState>>,
    token: Mutex<Option<CancellationToken>>,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a trigger. Names must be unique.
    pub fn add(&mut self, trigger: Trigger) -> Result<()> {
        if self.triggers.contains_key(&trigger.name) {
            return Err(SchedulerError::DuplicateTrigger(trigger.name).into());
        }
        self.triggers
            .insert(trigger.name.clone(), Arc::new(TriggerState::new(trigger)));
        Ok(())
    }

    pub fn trigger_names(&self) -> Vec<&str> {
        self.triggers.keys().map(String::as_str).collect()
    }

    /// Spawn one loop per trigger. Must be called inside a tokio runtime.
    pub fn start(&self) -> Result<()> {
        let mut token = lock(&self.token);
        if token.is_some() {
            return Err(SchedulerError::AlreadyRunning.into());
        }

        let cancel = CancellationToken::new();
        let mut handles = lock(&self.handles);
        for state in self.triggers.values() {
            handles.push(tokio::spawn(
                Arc::clone(state).run_loop(cancel.child_token()),
            ));
        }
        *token = Some(cancel);

        tracing::info!("Scheduler started with {} triggers", self.triggers.len());
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        lock(&self.token).is_some()
    }

    pub fn status(&self) -> BTreeMap<String, TriggerStatus> {
        let scheduled = self.is_running();
        self.triggers
            .iter()
            .map(|(name, state)| {
                let last_run = state.last_run.load(Ordering::SeqCst);
                (
                    name.clone(),
                    TriggerStatus {
                        running: state.running.load(Ordering::SeqCst),
                        scheduled,
                        interval: state.trigger.interval,
                        runs: state.runs.load(Ordering::SeqCst),
                        last_run: (last_run > 0).then_some(last_run),
                    },
                )
            })
            .collect()
    }

    /// Run a trigger's job immediately. Returns `None` if the overlap
    /// policy dropped the run.
    pub async fn run_now(&self, name: &str) -> Result<Option<TickSummary>> {
        let state = self
            .triggers
            .get(name)
            .ok_or_else(|| SchedulerError::UnknownTrigger(name.to_string()))?;
        Ok(state.tick().await)
    }

    /// Run every trigger once, one after another, in name order
    pub async fn run_all_once(&self) -> BTreeMap<String, Option<TickSummary>> {
        let mut summaries = BTreeMap::new();
        for (name, state) in &self.triggers {
            summaries.insert(name.clone(), state.tick().await);
        }
        summaries
    }

    /// Cancel every loop and wait for in-flight runs to finish
    pub async fn stop_all(&self) {
        let token = lock(&self.token).take();
        let Some(token) = token else {
            return;
        };
        token.cancel();

        let handles: Vec<_> = lock(&self.handles).drain(..).collect();
        for result in futures::future::join_all(handles).await {
            if let Err(e) = result {
                tracing::error!("Trigger loop ended abnormally: {}", e);
            }
        }

        tracing::info!("Scheduler stopped");
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
