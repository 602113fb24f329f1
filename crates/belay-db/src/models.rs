//! Database row types. These map directly to SQLite rows and views.
//! Distinct from belay-types API models to keep the DB layer independent.

use chrono::{DateTime, NaiveDateTime, Utc};
use tracing::warn;

/// Not `Debug`: the password hash must not end up in logs.
pub struct UserRow {
    pub id: i64,
    pub name: String,
    pub password_hash: String,
}

pub struct ChannelRow {
    pub id: i64,
    pub name: String,
}

/// One row of `v_messages`.
pub struct MessageRow {
    pub id: i64,
    pub channel_id: i64,
    pub user_id: i64,
    pub user_name: String,
    pub body: String,
    pub sent_time: DateTime<Utc>,
}

/// One row of `v_replies`.
pub struct ReplyRow {
    pub id: i64,
    pub user_name: String,
    pub body: String,
    pub sent_time: DateTime<Utc>,
}

/// SQLite stores `sent_time` as "YYYY-MM-DD HH:MM:SS.SSS" without timezone.
/// Parse as naive UTC.
pub(crate) fn parse_sent_time(raw: &str) -> DateTime<Utc> {
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f")
        .map(|ndt| ndt.and_utc())
        .unwrap_or_else(|e| {
            warn!("Corrupt sent_time '{}': {}", raw, e);
            DateTime::default()
        })
}
