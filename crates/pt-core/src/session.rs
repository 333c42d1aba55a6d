//! Online session reconstruction.
//!
//! # Algorithm
//!
//! Snapshots are scanned in timestamp order while tracking an optional open
//! session start:
//!
//! 1. An online snapshot with no open session opens one at the snapshot's
//!    timestamp. The normalizer's `online_since` estimate is not used; session
//!    boundaries follow sampling granularity.
//! 2. An offline snapshot closes the open session at its timestamp.
//! 3. A session still open after the last snapshot ends at that snapshot's
//!    timestamp, never past the last observation.
//!
//! [`SessionTracker`] runs the same scan incrementally; [`reconstruct`] is the
//! batch form. Both produce identical results for the same sequence.

use chrono::{DateTime, Duration, Utc};

use crate::snapshot::Snapshot;

/// A maximal run of consecutive online snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OnlineSession {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl OnlineSession {
    pub fn duration(&self) -> Duration {
        self.end - self.start
    }
}

/// Sessions derived from a snapshot sequence plus their summed duration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconstruction {
    pub sessions: Vec<OnlineSession>,
    pub total_online: Duration,
}

impl Default for Reconstruction {
    fn default() -> Self {
        Self {
            sessions: Vec::new(),
            total_online: Duration::zero(),
        }
    }
}

/// A session boundary crossed by the latest observed snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Opened { start: DateTime<Utc> },
    Closed(OnlineSession),
}

/// Incremental session reconstruction state.
#[derive(Debug, Clone, Default)]
pub struct SessionTracker {
    open_start: Option<DateTime<Utc>>,
    last_timestamp: Option<DateTime<Utc>>,
    closed: Vec<OnlineSession>,
}

impl SessionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds the next snapshot; snapshots must arrive in timestamp order.
    pub fn observe(&mut self, snapshot: &Snapshot) -> Option<Transition> {
        let at = snapshot.timestamp;
        self.last_timestamp = Some(at);

        match (snapshot.online(), self.open_start) {
            (true, None) => {
                self.open_start = Some(at);
                Some(Transition::Opened { start: at })
            }
            (false, Some(start)) => {
                let session = OnlineSession { start, end: at };
                self.closed.push(session);
                self.open_start = None;
                Some(Transition::Closed(session))
            }
            _ => None,
        }
    }

    /// Start of the currently open session, if any.
    pub const fn open_start(&self) -> Option<DateTime<Utc>> {
        self.open_start
    }

    /// Closed sessions plus the open one, ended at the last observation.
    pub fn current(&self) -> Reconstruction {
        let mut sessions = self.closed.clone();
        if let (Some(start), Some(end)) = (self.open_start, self.last_timestamp) {
            sessions.push(OnlineSession { start, end });
        }
        let total_online = sessions
            .iter()
            .fold(Duration::zero(), |acc, s| acc + s.duration());
        Reconstruction {
            sessions,
            total_online,
        }
    }

    /// Ends the open session at the last observation, as if an offline
    /// reading had arrived there. Used when observation stops and later
    /// resumes, so the unobserved gap is never counted as online.
    pub fn seal(&mut self) -> Option<OnlineSession> {
        let start = self.open_start.take()?;
        let end = self.last_timestamp.unwrap_or(start);
        let session = OnlineSession { start, end };
        self.closed.push(session);
        Some(session)
    }

    pub fn finish(self) -> Reconstruction {
        self.current()
    }
}

/// Reconstructs online sessions from a timestamp-ordered snapshot sequence.
pub fn reconstruct(snapshots: &[Snapshot]) -> Reconstruction {
    let mut tracker = SessionTracker::new();
    for snapshot in snapshots {
        tracker.observe(snapshot);
    }
    tracker.finish()
}

/// Share of the tracking window spent online, in percent.
///
/// Not clamped: a result above 100 means the sessions exceed the window.
#[allow(clippy::cast_precision_loss)]
pub fn percent_online(total_online: Duration, window: Duration) -> f64 {
    let window_ms = window.num_milliseconds();
    if window_ms <= 0 {
        return 0.0;
    }
    total_online.num_milliseconds() as f64 / window_ms as f64 * 100.0
}
