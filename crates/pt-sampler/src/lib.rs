//! Sampling loop for the presence tracker.
//!
//! Drives periodic lookups through a [`pt_core::PresenceResolver`], appends
//! normalized snapshots to a [`pt_core::SnapshotLog`], persists the log through
//! a [`SnapshotSink`] after every successful poll, and keeps an incremental
//! session reconstruction up to date.

mod sink;
mod tracker;

pub use sink::{JsonFileSink, SinkError, SnapshotSink, read_snapshot_log, write_json_atomic};
pub use tracker::{PollStats, StopReason, Tracker, TrackerConfig, TrackingOutcome};
