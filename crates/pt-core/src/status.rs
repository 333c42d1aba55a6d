//! Raw presence records and the canonical status kinds they map to.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What kind of entity a lookup resolved to.
///
/// Only [`EntityKind::User`] carries presence semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    #[default]
    User,
    Bot,
    Channel,
    Group,
}

impl EntityKind {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Bot => "bot",
            Self::Channel => "channel",
            Self::Group => "group",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status indicator as reported by the presence service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawStatus {
    /// No status at all (hidden or never seen).
    NoStatus,
    /// Offline, last seen at an exact instant.
    ExactLastSeen(DateTime<Utc>),
    /// Currently online; the marker expires at the given instant.
    OnlineExpiry(DateTime<Utc>),
    Recently,
    LastWeek,
    LastMonth,
    /// Any status shape this crate does not know, by its service-side name.
    Other(String),
}

/// One lookup result for the tracked identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawPresenceRecord {
    pub entity: EntityKind,
    pub user_id: Option<i64>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub username: Option<String>,
    pub status: RawStatus,
}

impl RawPresenceRecord {
    /// Creates a user record with no identity fields set.
    pub const fn user(status: RawStatus) -> Self {
        Self {
            entity: EntityKind::User,
            user_id: None,
            first_name: None,
            last_name: None,
            username: None,
            status,
        }
    }
}

/// Canonical status classification of a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusKind {
    Online,
    LastSeenExact,
    LastSeenRecently,
    LastSeenWithinWeek,
    LastSeenWithinMonth,
    LongTimeAgo,
    Unknown,
}

impl StatusKind {
    pub const ALL: [Self; 7] = [
        Self::Online,
        Self::LastSeenExact,
        Self::LastSeenRecently,
        Self::LastSeenWithinWeek,
        Self::LastSeenWithinMonth,
        Self::LongTimeAgo,
        Self::Unknown,
    ];

    /// Returns the string representation used in the snapshot log.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Online => "online",
            Self::LastSeenExact => "last_seen_exact",
            Self::LastSeenRecently => "last_seen_recently",
            Self::LastSeenWithinWeek => "last_seen_within_week",
            Self::LastSeenWithinMonth => "last_seen_within_month",
            Self::LongTimeAgo => "long_time_ago",
            Self::Unknown => "unknown",
        }
    }

    /// Human-readable label for console output.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Online => "Online",
            Self::LastSeenExact => "Last seen",
            Self::LastSeenRecently => "Last seen recently",
            Self::LastSeenWithinWeek => "Last seen within a week",
            Self::LastSeenWithinMonth => "Last seen within a month",
            Self::LongTimeAgo => "Long time ago",
            Self::Unknown => "Unknown",
        }
    }

    /// Coarse "last seen" description for kinds without an exact instant.
    #[must_use]
    pub const fn last_seen_hint(&self) -> Option<&'static str> {
        match self {
            Self::LastSeenRecently => Some("Within a day"),
            Self::LastSeenWithinWeek => Some("Within a week"),
            Self::LastSeenWithinMonth => Some("Within a month"),
            Self::LongTimeAgo | Self::Unknown => Some("Unknown"),
            Self::Online | Self::LastSeenExact => None,
        }
    }
}

impl fmt::Display for StatusKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StatusKind {
    type Err = UnknownStatusKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| UnknownStatusKind(s.to_string()))
    }
}

/// Error type for unknown status kind strings.
#[derive(Debug, Clone)]
pub struct UnknownStatusKind(String);

impl fmt::Display for UnknownStatusKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown status kind: {}", self.0)
    }
}

impl std::error::Error for UnknownStatusKind {}
