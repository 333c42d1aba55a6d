//! The polling loop.
//!
//! One lookup is in flight at a time. The wait before the next poll starts
//! when the previous lookup returns, so slow lookups shift later polls instead
//! of piling up. Cancellation is observed before each poll and during the
//! wait; a lookup already in flight is allowed to finish.

use std::time::Duration;

use chrono::{DateTime, Utc};
use pt_core::{
    Identifier, PresenceResolver, Reconstruction, ResolveError, SessionTracker, SnapshotLog,
    Transition, format_elapsed, normalize,
};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::sink::SnapshotSink;

/// Default tracking window (48 hours).
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(48 * 60 * 60);
/// Default wait between polls (5 minutes).
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(300);
/// Default upper bound on a single lookup.
pub const DEFAULT_RESOLVE_TIMEOUT: Duration = Duration::from_secs(30);

/// Stand-in deadline for windows too large to add to the clock.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// Timing parameters for a tracking run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackerConfig {
    /// How long to keep polling.
    pub window: Duration,
    /// Wait after each lookup returns.
    pub poll_interval: Duration,
    /// A lookup running longer than this counts as a transient failure.
    pub resolve_timeout: Duration,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            window: DEFAULT_WINDOW,
            poll_interval: DEFAULT_POLL_INTERVAL,
            resolve_timeout: DEFAULT_RESOLVE_TIMEOUT,
        }
    }
}

/// Why the loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Deadline,
    Cancelled,
}

/// Per-run poll counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollStats {
    pub attempts: usize,
    pub recorded: usize,
    pub not_found: usize,
    pub transient: usize,
    pub not_a_user: usize,
    pub persist_failures: usize,
}

impl PollStats {
    /// Polls that produced no snapshot.
    pub const fn skipped(&self) -> usize {
        self.attempts - self.recorded
    }
}

/// Result of a finished tracking run.
#[derive(Debug, Clone)]
pub struct TrackingOutcome {
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub stop: StopReason,
    pub stats: PollStats,
    /// Sessions over the whole log, including snapshots it held before the run.
    /// A session left open by those snapshots ends at the last of them.
    pub reconstruction: Reconstruction,
    /// Span from the first to the last snapshot the log held before the run.
    pub prior_span: chrono::Duration,
}

impl TrackingOutcome {
    /// Observed time the reconstruction covers: the span of the earlier
    /// snapshots plus this run's window. The gap between the two is excluded.
    pub fn observed_window(&self, window: chrono::Duration) -> chrono::Duration {
        self.prior_span + window
    }
}

/// Wall-clock timestamps derived from the runtime's monotonic clock, so
/// snapshot times never go backwards within a run.
#[derive(Debug, Clone, Copy)]
struct Clock {
    origin: Instant,
    wall_origin: DateTime<Utc>,
}

impl Clock {
    fn start() -> Self {
        Self {
            origin: Instant::now(),
            wall_origin: Utc::now(),
        }
    }

    fn now(&self) -> DateTime<Utc> {
        let elapsed = chrono::Duration::from_std(self.origin.elapsed())
            .unwrap_or_else(|_| chrono::Duration::zero());
        self.wall_origin + elapsed
    }
}

/// Samples one identity's presence for a bounded window.
#[derive(Debug)]
pub struct Tracker<R> {
    resolver: R,
    config: TrackerConfig,
}

impl<R: PresenceResolver> Tracker<R> {
    pub const fn new(resolver: R, config: TrackerConfig) -> Self {
        Self { resolver, config }
    }

    pub const fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Polls until the window elapses or `cancel` fires.
    ///
    /// Snapshots are appended to `log` and the full log is handed to `sink`
    /// after every successful poll. Snapshots already in `log` seed the session
    /// reconstruction.
    pub async fn run<S: SnapshotSink>(
        &self,
        identifier: &Identifier,
        log: &mut SnapshotLog,
        sink: &mut S,
        cancel: &CancellationToken,
    ) -> TrackingOutcome {
        let clock = Clock::start();
        let deadline = clock
            .origin
            .checked_add(self.config.window)
            .unwrap_or_else(|| clock.origin + FAR_FUTURE);

        let mut sessions = SessionTracker::new();
        for snapshot in log.iter() {
            sessions.observe(snapshot);
        }
        if let Some(session) = sessions.seal() {
            tracing::info!(
                start = %session.start,
                end = %session.end,
                "closed session left open by the previous run"
            );
        }
        let prior_span = match (log.iter().next(), log.last()) {
            (Some(first), Some(last)) => last.timestamp - first.timestamp,
            _ => chrono::Duration::zero(),
        };
        let mut stats = PollStats::default();

        tracing::info!(
            %identifier,
            window_secs = self.config.window.as_secs(),
            interval_secs = self.config.poll_interval.as_secs(),
            resumed = log.len(),
            "tracking started"
        );

        let stop = loop {
            if cancel.is_cancelled() {
                break StopReason::Cancelled;
            }
            if Instant::now() >= deadline {
                break StopReason::Deadline;
            }

            stats.attempts += 1;
            self.poll(identifier, &clock, log, sink, &mut sessions, &mut stats)
                .await;

            let wake = Instant::now()
                .checked_add(self.config.poll_interval)
                .map_or(deadline, |wake| wake.min(deadline));
            tokio::select! {
                () = tokio::time::sleep_until(wake) => {}
                () = cancel.cancelled() => break StopReason::Cancelled,
            }
        };

        let reconstruction = sessions.finish();
        tracing::info!(
            ?stop,
            attempts = stats.attempts,
            recorded = stats.recorded,
            skipped = stats.skipped(),
            sessions = reconstruction.sessions.len(),
            "tracking finished"
        );

        TrackingOutcome {
            started_at: clock.wall_origin,
            ended_at: clock.now(),
            stop,
            stats,
            reconstruction,
            prior_span,
        }
    }

    async fn poll<S: SnapshotSink>(
        &self,
        identifier: &Identifier,
        clock: &Clock,
        log: &mut SnapshotLog,
        sink: &mut S,
        sessions: &mut SessionTracker,
        stats: &mut PollStats,
    ) {
        let timeout = self.config.resolve_timeout;
        let result = tokio::time::timeout(timeout, self.resolver.resolve(identifier))
            .await
            .unwrap_or_else(|_| {
                Err(ResolveError::Transient(format!(
                    "lookup timed out after {}s",
                    timeout.as_secs()
                )))
            });

        let record = match result {
            Ok(record) => record,
            Err(err) => {
                match err {
                    ResolveError::NotFound(_) => stats.not_found += 1,
                    ResolveError::Transient(_) => stats.transient += 1,
                }
                tracing::warn!(%identifier, error = %err, "lookup failed, skipping poll");
                return;
            }
        };

        let snapshot = match normalize(&record, clock.now()) {
            Ok(snapshot) => snapshot,
            Err(err) => {
                stats.not_a_user += 1;
                tracing::warn!(%identifier, error = %err, "lookup result not trackable, skipping poll");
                return;
            }
        };

        if let Err(err) = log.push(snapshot) {
            tracing::error!(error = %err, "dropping snapshot");
            return;
        }
        stats.recorded += 1;

        if let Some(latest) = log.last() {
            tracing::debug!(
                timestamp = %latest.timestamp,
                status = %latest.status_kind(),
                online = latest.online(),
                "snapshot recorded"
            );
            match sessions.observe(latest) {
                Some(Transition::Opened { start }) => {
                    tracing::info!(%start, "online session started");
                }
                Some(Transition::Closed(session)) => {
                    tracing::info!(
                        start = %session.start,
                        end = %session.end,
                        duration = %format_elapsed(session.duration()),
                        "online session ended"
                    );
                }
                None => {}
            }
        }

        if let Err(err) = sink.persist(log.as_slice()) {
            stats.persist_failures += 1;
            tracing::error!(error = %err, "failed to persist snapshot log");
        }
    }
}
