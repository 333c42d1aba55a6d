//! JSON shapes returned by the presence service.

use chrono::{DateTime, Utc};
use pt_core::{EntityKind, RawPresenceRecord, RawStatus};
use serde::Deserialize;

/// Entity returned by `GET /v1/users/resolve`.
#[derive(Debug, Deserialize)]
pub(crate) struct WireEntity {
    #[serde(default)]
    kind: EntityKind,
    id: Option<i64>,
    first_name: Option<String>,
    last_name: Option<String>,
    username: Option<String>,
    status: Option<WireStatus>,
}

/// Status object; which timestamp is present depends on `type`.
#[derive(Debug, Deserialize)]
pub(crate) struct WireStatus {
    #[serde(rename = "type")]
    kind: String,
    was_online: Option<DateTime<Utc>>,
    expires: Option<DateTime<Utc>>,
}

impl From<WireStatus> for RawStatus {
    fn from(status: WireStatus) -> Self {
        match (status.kind.as_str(), status.was_online, status.expires) {
            ("empty", _, _) => Self::NoStatus,
            ("offline", Some(at), _) => Self::ExactLastSeen(at),
            ("online", _, Some(expires)) => Self::OnlineExpiry(expires),
            ("recently", _, _) => Self::Recently,
            ("last_week", _, _) => Self::LastWeek,
            ("last_month", _, _) => Self::LastMonth,
            _ => Self::Other(status.kind),
        }
    }
}

impl From<WireEntity> for RawPresenceRecord {
    fn from(entity: WireEntity) -> Self {
        Self {
            entity: entity.kind,
            user_id: entity.id,
            first_name: entity.first_name,
            last_name: entity.last_name,
            username: entity.username,
            status: entity.status.map_or(RawStatus::NoStatus, RawStatus::from),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn parse(json: &str) -> RawPresenceRecord {
        serde_json::from_str::<WireEntity>(json).unwrap().into()
    }

    #[test]
    fn missing_status_is_no_status() {
        let record = parse(r#"{"id":7,"first_name":"Ada"}"#);
        assert_eq!(record.status, RawStatus::NoStatus);
        assert_eq!(record.entity, EntityKind::User);
        assert_eq!(record.user_id, Some(7));
        assert_eq!(record.first_name.as_deref(), Some("Ada"));
    }

    #[test]
    fn offline_with_timestamp_is_exact() {
        let record = parse(
            r#"{"id":7,"status":{"type":"offline","was_online":"2025-03-01T10:30:00Z"}}"#,
        );
        assert_eq!(
            record.status,
            RawStatus::ExactLastSeen(Utc.with_ymd_and_hms(2025, 3, 1, 10, 30, 0).unwrap())
        );
    }

    #[test]
    fn online_with_expiry() {
        let record = parse(r#"{"status":{"type":"online","expires":"2025-03-01T12:04:00Z"}}"#);
        assert_eq!(
            record.status,
            RawStatus::OnlineExpiry(Utc.with_ymd_and_hms(2025, 3, 1, 12, 4, 0).unwrap())
        );
    }

    #[test]
    fn coarse_buckets() {
        assert_eq!(parse(r#"{"status":{"type":"recently"}}"#).status, RawStatus::Recently);
        assert_eq!(parse(r#"{"status":{"type":"last_week"}}"#).status, RawStatus::LastWeek);
        assert_eq!(parse(r#"{"status":{"type":"last_month"}}"#).status, RawStatus::LastMonth);
        assert_eq!(parse(r#"{"status":{"type":"empty"}}"#).status, RawStatus::NoStatus);
    }

    #[test]
    fn unknown_type_keeps_name() {
        let record = parse(r#"{"status":{"type":"hidden"}}"#);
        assert_eq!(record.status, RawStatus::Other("hidden".to_string()));
    }

    #[test]
    fn online_without_expiry_is_other() {
        let record = parse(r#"{"status":{"type":"online"}}"#);
        assert_eq!(record.status, RawStatus::Other("online".to_string()));
    }

    #[test]
    fn entity_kind_is_carried() {
        let record = parse(r#"{"kind":"channel","id":99}"#);
        assert_eq!(record.entity, EntityKind::Channel);
    }
}
