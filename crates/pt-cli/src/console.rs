//! Per-poll console output.

use std::io::Write;

use chrono::SecondsFormat;
use pt_core::{Presence, Snapshot, format_elapsed};
use pt_sampler::{SinkError, SnapshotSink};

/// Renders one reading as the multi-line block printed after each poll.
pub fn format_reading(snapshot: &Snapshot) -> String {
    let mut out = format!(
        "[{}]\nUser: {}\n",
        snapshot
            .timestamp
            .to_rfc3339_opts(SecondsFormat::Secs, true),
        snapshot.identity.display_name()
    );

    match &snapshot.presence {
        Presence::Online { .. } => {
            out.push_str("Status: Online\n");
            let online_for = snapshot
                .online_for()
                .map_or_else(|| "Unknown".to_string(), format_elapsed);
            out.push_str(&format!("Online for: {online_for}\n"));
        }
        Presence::LastSeenExact { at } => {
            out.push_str(&format!("Status: {}\n", snapshot.status_kind().label()));
            out.push_str(&format!(
                "Last seen: {}\n",
                at.format("%Y-%m-%d %H:%M:%S UTC")
            ));
            if let Some(ago) = snapshot.last_seen_ago() {
                out.push_str(&format!("Last seen ago: {}\n", format_elapsed(ago)));
            }
        }
        Presence::Unknown { tag } => {
            out.push_str(&format!("Status: Unknown ({tag})\n"));
        }
        other => {
            let kind = other.kind();
            out.push_str(&format!("Status: {}\n", kind.label()));
            if let Some(hint) = kind.last_seen_hint() {
                out.push_str(&format!("Last seen: {hint}\n"));
            }
        }
    }

    out
}

/// Prints the newest reading before handing the log to the inner sink.
#[derive(Debug)]
pub struct ConsoleSink<S, W> {
    inner: S,
    writer: W,
}

impl<S: SnapshotSink, W: Write> ConsoleSink<S, W> {
    pub const fn new(inner: S, writer: W) -> Self {
        Self { inner, writer }
    }

    pub fn into_inner(self) -> (S, W) {
        (self.inner, self.writer)
    }
}

impl<S: SnapshotSink, W: Write> SnapshotSink for ConsoleSink<S, W> {
    fn persist(&mut self, snapshots: &[Snapshot]) -> Result<(), SinkError> {
        if let Some(latest) = snapshots.last() {
            // Console output is best effort; a closed stdout must not stop tracking.
            if let Err(e) = writeln!(self.writer, "{}", format_reading(latest)) {
                tracing::debug!(error = %e, "failed to print reading");
            }
        }
        self.inner.persist(snapshots)
    }
}
