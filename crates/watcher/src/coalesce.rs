//! Change coalescing for fragment sources
//!
//! Every raw change notification goes through [`ChangeCoalescer::on_change`].
//! Per source the coalescer runs a small state machine:
//!
//! ```text
//! Idle --change--> Pending(token) --quiet period--> Rebuilding --> Idle
//!                     |  ^
//!                     +--+ newer change: cancel token, reschedule
//! ```
//!
//! The per-source lock only covers the compare/update of the last write
//! time, the burst counter and the pending token. Waiting and rebuilding
//! happen outside of it.

use crate::debounce::DebouncePolicy;
use crate::EventKind;
use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use dashmap::DashMap;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, trace};

/// Something that can be rebuilt after sources change
///
/// Called on a blocking thread. `cancel` fires when a newer change
/// supersedes this rebuild; implementations should stop early and report
/// failure in that case.
pub trait RebuildTarget: Send + Sync + 'static {
    /// Returns true when a new tree was published
    fn rebuild(&self, cancel: &CancellationToken) -> bool;
}

/// Where a source is in its debounce cycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Phase {
    #[default]
    Idle,
    Pending,
    Rebuilding,
}

/// A rebuild scheduled by [`ChangeCoalescer::on_change`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    /// Increases with every accepted change of the source
    pub generation: u64,
    pub burst: u32,
    pub delay: Duration,
}

#[derive(Debug, Default)]
struct SourceState {
    last_change: Option<SystemTime>,
    burst: u32,
    pending: Option<CancellationToken>,
    generation: u64,
    phase: Phase,
}

type SharedState = Arc<Mutex<SourceState>>;

/// Debounces change notifications into rebuilds
pub struct ChangeCoalescer {
    target: Arc<dyn RebuildTarget>,
    policy: DebouncePolicy,
    sources: DashMap<PathBuf, SharedState>,
    runtime: Handle,
    shutdown: CancellationToken,
}

impl ChangeCoalescer {
    /// Create a coalescer bound to the current tokio runtime
    pub fn new(target: Arc<dyn RebuildTarget>, policy: DebouncePolicy) -> Result<Self> {
        let runtime = Handle::try_current()
            .context("ChangeCoalescer must be created inside a tokio runtime")?;
        Ok(Self::with_runtime(target, policy, runtime))
    }

    /// Create a coalescer that schedules its waits on `runtime`
    pub fn with_runtime(target: Arc<dyn RebuildTarget>, policy: DebouncePolicy, runtime: Handle) -> Self {
        Self {
            target,
            policy,
            sources: DashMap::new(),
            runtime,
            shutdown: CancellationToken::new(),
        }
    }

    pub fn policy(&self) -> DebouncePolicy {
        self.policy
    }

    /// Record a raw change of `source` written at `observed`
    ///
    /// Notifications that are not strictly newer than the last accepted one
    /// are ignored and return `None`, as is everything after
    /// [`ChangeCoalescer::cancel_all`]. Otherwise any pending wait for the
    /// source is cancelled and a new one is scheduled.
    pub fn on_change(&self, source: &Path, observed: SystemTime, kind: EventKind) -> Option<Schedule> {
        if self.shutdown.is_cancelled() {
            trace!(path = %source.display(), ?kind, "change after shutdown ignored");
            return None;
        }

        let state = self.state(source);

        let (token, schedule) = {
            let mut st = state.lock();
            if st.last_change.is_some_and(|last| observed <= last) {
                trace!(path = %source.display(), ?kind, "stale change notification ignored");
                return None;
            }

            st.last_change = Some(observed);
            st.burst = st.burst.saturating_add(1);
            st.generation += 1;
            if let Some(previous) = st.pending.take() {
                previous.cancel();
            }

            let token = self.shutdown.child_token();
            st.pending = Some(token.clone());
            st.phase = Phase::Pending;

            let schedule = Schedule {
                generation: st.generation,
                burst: st.burst,
                delay: self.policy.delay_for(st.burst),
            };
            (token, schedule)
        };

        trace!(
            path = %source.display(),
            burst = schedule.burst,
            delay_ms = schedule.delay.as_millis() as u64,
            "rebuild scheduled"
        );

        let pending = PendingRebuild {
            state,
            target: Arc::clone(&self.target),
            token,
            schedule,
            source: source.to_path_buf(),
            observed,
            kind,
        };
        self.runtime.spawn(pending.run());

        Some(schedule)
    }

    pub fn phase(&self, source: &Path) -> Phase {
        self.sources
            .get(source)
            .map(|state| state.lock().phase)
            .unwrap_or_default()
    }

    pub fn burst(&self, source: &Path) -> u32 {
        self.sources
            .get(source)
            .map(|state| state.lock().burst)
            .unwrap_or(0)
    }

    pub fn last_change(&self, source: &Path) -> Option<SystemTime> {
        self.sources
            .get(source)
            .and_then(|state| state.lock().last_change)
    }

    /// Cancel every pending wait; later changes are ignored
    pub fn cancel_all(&self) {
        self.shutdown.cancel();
    }

    pub fn is_shut_down(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    fn state(&self, source: &Path) -> SharedState {
        if let Some(state) = self.sources.get(source) {
            return Arc::clone(&state);
        }
        Arc::clone(&self.sources.entry(source.to_path_buf()).or_default())
    }
}

impl Drop for ChangeCoalescer {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

/// One scheduled wait-then-rebuild
struct PendingRebuild {
    state: SharedState,
    target: Arc<dyn RebuildTarget>,
    token: CancellationToken,
    schedule: Schedule,
    source: PathBuf,
    observed: SystemTime,
    kind: EventKind,
}

impl PendingRebuild {
    async fn run(self) {
        tokio::select! {
            _ = self.token.cancelled() => {
                trace!(path = %self.source.display(), generation = self.schedule.generation, "pending rebuild superseded");
                return;
            }
            _ = tokio::time::sleep(self.schedule.delay) => {}
        }

        if !self.begin() {
            return;
        }

        info!(
            "({}) fragment changed, path: {}, change type: {:?}",
            DateTime::<Local>::from(self.observed).format("%H:%M:%S"),
            self.source.display(),
            self.kind
        );

        let target = Arc::clone(&self.target);
        let token = self.token.clone();
        let rebuilt = match tokio::task::spawn_blocking(move || target.rebuild(&token)).await {
            Ok(rebuilt) => rebuilt,
            Err(e) => {
                error!(error = %e, path = %self.source.display(), "rebuild task failed");
                false
            }
        };

        let mut st = self.state.lock();
        if rebuilt {
            st.burst = 0;
        }
        if st.generation == self.schedule.generation {
            st.phase = Phase::Idle;
            st.pending = None;
        }
    }

    /// Move to `Rebuilding` unless a newer change got in first
    fn begin(&self) -> bool {
        let mut st = self.state.lock();
        if self.token.is_cancelled() || st.generation != self.schedule.generation {
            return false;
        }
        st.phase = Phase::Rebuilding;
        true
    }
}
