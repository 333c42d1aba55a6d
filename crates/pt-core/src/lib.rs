//! Core domain logic for the presence tracker.
//!
//! This crate contains the fundamental types and logic for:
//! - Normalization: turning raw presence records into canonical snapshots
//! - Session reconstruction: deriving online intervals from a snapshot sequence
//! - Reporting: assembling the end-of-run summary

pub mod duration;
pub mod report;
pub mod resolve;
pub mod session;
pub mod snapshot;
pub mod status;
pub mod types;

pub use duration::{format_elapsed, seconds};
pub use report::{Report, ReportSession, assemble, tracking_period_label};
pub use resolve::{PresenceResolver, ResolveError};
pub use session::{
    OnlineSession, Reconstruction, SessionTracker, Transition, percent_online, reconstruct,
};
pub use snapshot::{
    Identity, LogError, NormalizeError, Presence, Snapshot, SnapshotError, SnapshotLog, normalize,
};
pub use status::{EntityKind, RawPresenceRecord, RawStatus, StatusKind, UnknownStatusKind};
pub use types::{Identifier, ValidationError};
