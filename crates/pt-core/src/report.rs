//! End-of-run report assembly.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::duration::seconds;
use crate::session::{Reconstruction, percent_online};
use crate::snapshot::Snapshot;

/// One online session in the report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportSession {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub duration_seconds: f64,
}

/// Persisted summary of a tracking run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub tracking_period: String,
    pub total_data_points: usize,
    pub online_sessions_count: usize,
    pub total_online_time_seconds: f64,
    pub window_seconds: i64,
    pub percent_online: f64,
    pub online_sessions: Vec<ReportSession>,
}

/// Label for a tracking window: `48_hours` for whole hours, else `N_seconds`.
pub fn tracking_period_label(window: Duration) -> String {
    let secs = window.num_seconds();
    if secs > 0 && secs % 3_600 == 0 {
        format!("{}_hours", secs / 3_600)
    } else {
        format!("{secs}_seconds")
    }
}

/// Builds the report value. Pure; persisting it is the caller's job.
pub fn assemble(
    snapshots: &[Snapshot],
    reconstruction: &Reconstruction,
    window: Duration,
) -> Report {
    let online_sessions = reconstruction
        .sessions
        .iter()
        .map(|session| ReportSession {
            start: session.start,
            end: session.end,
            duration_seconds: seconds(session.duration()),
        })
        .collect::<Vec<_>>();

    Report {
        tracking_period: tracking_period_label(window),
        total_data_points: snapshots.len(),
        online_sessions_count: online_sessions.len(),
        total_online_time_seconds: seconds(reconstruction.total_online),
        window_seconds: window.num_seconds(),
        percent_online: percent_online(reconstruction.total_online, window),
        online_sessions,
    }
}
