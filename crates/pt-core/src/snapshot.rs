//! Canonical presence snapshots and the normalizer that produces them.
//!
//! A [`Snapshot`] holds a single [`Presence`] value, so the online branch
//! (optional `online_since`) and the offline branch (a last-seen kind) can never
//! be populated at the same time. The flat `online` / `statusKind` pair of the
//! persisted log is derived from it on serialization and checked again when a
//! log is read back.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::duration::format_elapsed;
use crate::status::{EntityKind, RawPresenceRecord, RawStatus, StatusKind};

/// Identity fields copied from the resolved record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Identity {
    pub user_id: Option<i64>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub username: Option<String>,
}

impl Identity {
    /// `"First Last"`, falling back to the username, then `"Unknown"`.
    pub fn display_name(&self) -> String {
        let full = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        if !full.is_empty() {
            return full;
        }
        self.username
            .as_deref()
            .map_or_else(|| "Unknown".to_string(), |u| format!("@{u}"))
    }
}

/// Normalized presence state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Presence {
    /// Online; `since` is the estimated start when the service sent an expiry marker.
    Online { since: Option<DateTime<Utc>> },
    LastSeenExact { at: DateTime<Utc> },
    LastSeenRecently,
    LastSeenWithinWeek,
    LastSeenWithinMonth,
    LongTimeAgo,
    /// Unrecognized service status, keeping its original name.
    Unknown { tag: String },
}

impl Presence {
    pub const fn is_online(&self) -> bool {
        matches!(self, Self::Online { .. })
    }

    pub const fn kind(&self) -> StatusKind {
        match self {
            Self::Online { .. } => StatusKind::Online,
            Self::LastSeenExact { .. } => StatusKind::LastSeenExact,
            Self::LastSeenRecently => StatusKind::LastSeenRecently,
            Self::LastSeenWithinWeek => StatusKind::LastSeenWithinWeek,
            Self::LastSeenWithinMonth => StatusKind::LastSeenWithinMonth,
            Self::LongTimeAgo => StatusKind::LongTimeAgo,
            Self::Unknown { .. } => StatusKind::Unknown,
        }
    }

    pub const fn last_seen_at(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::LastSeenExact { at } => Some(*at),
            _ => None,
        }
    }

    pub const fn online_since(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Online { since } => *since,
            _ => None,
        }
    }
}

/// One normalized, timestamped presence reading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "SnapshotRecord", into = "SnapshotRecord")]
pub struct Snapshot {
    /// When the poll completed.
    pub timestamp: DateTime<Utc>,
    pub identity: Identity,
    pub presence: Presence,
}

impl Snapshot {
    pub const fn online(&self) -> bool {
        self.presence.is_online()
    }

    pub const fn status_kind(&self) -> StatusKind {
        self.presence.kind()
    }

    /// Time since the exact last-seen instant.
    pub fn last_seen_ago(&self) -> Option<Duration> {
        self.presence.last_seen_at().map(|at| self.timestamp - at)
    }

    /// Time since the estimated online start.
    pub fn online_for(&self) -> Option<Duration> {
        self.presence.online_since().map(|since| self.timestamp - since)
    }
}

/// Errors from normalizing a raw record.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NormalizeError {
    /// The lookup resolved to something without presence semantics.
    #[error("resolved entity is a {kind}, not a user")]
    NotAUser { kind: EntityKind },
}

/// Maps a raw record onto a canonical snapshot taken at `now`.
///
/// For an online record the start time is back-computed by treating the gap
/// between `now` and the expiry marker as time already spent online, i.e.
/// `now - (expires - now)`. This is only an estimate: an expiry marker says
/// when the online status lapses, not when it began. An expiry already in the
/// past yields a start after `now`; it is kept as is rather than clamped.
pub fn normalize(
    record: &RawPresenceRecord,
    now: DateTime<Utc>,
) -> Result<Snapshot, NormalizeError> {
    if record.entity != EntityKind::User {
        return Err(NormalizeError::NotAUser {
            kind: record.entity,
        });
    }

    let presence = match &record.status {
        RawStatus::NoStatus => Presence::LongTimeAgo,
        RawStatus::ExactLastSeen(at) => Presence::LastSeenExact { at: *at },
        RawStatus::OnlineExpiry(expires) => {
            Presence::Online {
                since: Some(now - (*expires - now)),
            }
        }
        RawStatus::Recently => Presence::LastSeenRecently,
        RawStatus::LastWeek => Presence::LastSeenWithinWeek,
        RawStatus::LastMonth => Presence::LastSeenWithinMonth,
        RawStatus::Other(tag) => {
            tracing::debug!(tag = %tag, "unrecognized presence status");
            Presence::Unknown { tag: tag.clone() }
        }
    };

    Ok(Snapshot {
        timestamp: now,
        identity: Identity {
            user_id: record.user_id,
            first_name: record.first_name.clone(),
            last_name: record.last_name.clone(),
            username: record.username.clone(),
        },
        presence,
    })
}

/// Errors from reading a persisted snapshot that breaks the presence invariants.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SnapshotError {
    #[error("status kind {kind} requires online={expected}")]
    OnlineMismatch { kind: StatusKind, expected: bool },
    #[error("field {field} is not allowed for status kind {kind}")]
    UnexpectedField {
        field: &'static str,
        kind: StatusKind,
    },
    #[error("field {field} is required for status kind {kind}")]
    MissingField {
        field: &'static str,
        kind: StatusKind,
    },
}

/// Flat on-disk shape of a snapshot.
///
/// Identity fields are always written (as `null` when absent); status-specific
/// fields are omitted unless the status kind carries them. The `*Ago` / `*For`
/// strings are derived for readers and ignored when parsing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SnapshotRecord {
    timestamp: DateTime<Utc>,
    #[serde(default)]
    user_id: Option<i64>,
    #[serde(default)]
    first_name: Option<String>,
    #[serde(default)]
    last_name: Option<String>,
    #[serde(default)]
    username: Option<String>,
    online: bool,
    status_kind: StatusKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    last_seen_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    last_seen_ago: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    online_since: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    online_for: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    unknown_status: Option<String>,
}

impl From<Snapshot> for SnapshotRecord {
    fn from(snapshot: Snapshot) -> Self {
        let last_seen_ago = snapshot.last_seen_ago().map(format_elapsed);
        let online_for = snapshot.online_for().map(format_elapsed);
        let online = snapshot.online();
        let status_kind = snapshot.status_kind();
        let last_seen_at = snapshot.presence.last_seen_at();
        let online_since = snapshot.presence.online_since();
        let unknown_status = match snapshot.presence {
            Presence::Unknown { tag } => Some(tag),
            _ => None,
        };

        Self {
            timestamp: snapshot.timestamp,
            user_id: snapshot.identity.user_id,
            first_name: snapshot.identity.first_name,
            last_name: snapshot.identity.last_name,
            username: snapshot.identity.username,
            online,
            status_kind,
            last_seen_at,
            last_seen_ago,
            online_since,
            online_for,
            unknown_status,
        }
    }
}

impl TryFrom<SnapshotRecord> for Snapshot {
    type Error = SnapshotError;

    fn try_from(record: SnapshotRecord) -> Result<Self, Self::Error> {
        let kind = record.status_kind;
        let expected_online = kind == StatusKind::Online;
        if record.online != expected_online {
            return Err(SnapshotError::OnlineMismatch {
                kind,
                expected: expected_online,
            });
        }
        if kind != StatusKind::LastSeenExact && record.last_seen_at.is_some() {
            return Err(SnapshotError::UnexpectedField {
                field: "lastSeenAt",
                kind,
            });
        }
        if kind != StatusKind::Online && record.online_since.is_some() {
            return Err(SnapshotError::UnexpectedField {
                field: "onlineSince",
                kind,
            });
        }
        if kind != StatusKind::Unknown && record.unknown_status.is_some() {
            return Err(SnapshotError::UnexpectedField {
                field: "unknownStatus",
                kind,
            });
        }

        let presence = match kind {
            StatusKind::Online => Presence::Online {
                since: record.online_since,
            },
            StatusKind::LastSeenExact => Presence::LastSeenExact {
                at: record.last_seen_at.ok_or(SnapshotError::MissingField {
                    field: "lastSeenAt",
                    kind,
                })?,
            },
            StatusKind::LastSeenRecently => Presence::LastSeenRecently,
            StatusKind::LastSeenWithinWeek => Presence::LastSeenWithinWeek,
            StatusKind::LastSeenWithinMonth => Presence::LastSeenWithinMonth,
            StatusKind::LongTimeAgo => Presence::LongTimeAgo,
            StatusKind::Unknown => Presence::Unknown {
                tag: record.unknown_status.ok_or(SnapshotError::MissingField {
                    field: "unknownStatus",
                    kind,
                })?,
            },
        };

        Ok(Self {
            timestamp: record.timestamp,
            identity: Identity {
                user_id: record.user_id,
                first_name: record.first_name,
                last_name: record.last_name,
                username: record.username,
            },
            presence,
        })
    }
}

/// Errors from appending to a [`SnapshotLog`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LogError {
    #[error("snapshot at {next} is older than the last recorded snapshot at {previous}")]
    OutOfOrder {
        previous: DateTime<Utc>,
        next: DateTime<Utc>,
    },
}

/// Append-only, timestamp-ordered sequence of snapshots for one tracked identity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SnapshotLog {
    snapshots: Vec<Snapshot>,
}

impl SnapshotLog {
    pub const fn new() -> Self {
        Self {
            snapshots: Vec::new(),
        }
    }

    /// Builds a log from previously persisted snapshots, checking their order.
    pub fn from_snapshots(snapshots: Vec<Snapshot>) -> Result<Self, LogError> {
        let mut log = Self::new();
        for snapshot in snapshots {
            log.push(snapshot)?;
        }
        Ok(log)
    }

    /// Appends a snapshot. Equal timestamps are accepted, older ones are not.
    pub fn push(&mut self, snapshot: Snapshot) -> Result<(), LogError> {
        if let Some(last) = self.snapshots.last() {
            if snapshot.timestamp < last.timestamp {
                return Err(LogError::OutOfOrder {
                    previous: last.timestamp,
                    next: snapshot.timestamp,
                });
            }
        }
        self.snapshots.push(snapshot);
        Ok(())
    }

    pub fn as_slice(&self) -> &[Snapshot] {
        &self.snapshots
    }

    pub fn last(&self) -> Option<&Snapshot> {
        self.snapshots.last()
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Snapshot> {
        self.snapshots.iter()
    }

    pub fn into_inner(self) -> Vec<Snapshot> {
        self.snapshots
    }
}

impl<'a> IntoIterator for &'a SnapshotLog {
    type Item = &'a Snapshot;
    type IntoIter = std::slice::Iter<'a, Snapshot>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
