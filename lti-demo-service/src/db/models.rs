//! Database model structs.

use chrono::{DateTime, NaiveDateTime, Utc};
use rusqlite::Row;
use serde::{Deserialize, Serialize};

/// Course content bound to a platform's resource link
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    /// Stable identity of the record
    pub id: String,
    pub platform: String,
    pub resource_id: String,
    pub content: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Resource {
    pub(crate) const COLUMNS: &'static str =
        "id, platform, resource_id, content, created_at, updated_at";

    pub(crate) fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            platform: row.get(1)?,
            resource_id: row.get(2)?,
            content: row.get(3)?,
            created_at: parse_sqlite_datetime(&row.get::<_, String>(4)?),
            updated_at: parse_sqlite_datetime(&row.get::<_, String>(5)?),
        })
    }

    pub fn is_empty(&self) -> bool {
        self.content.as_deref().is_none_or(str::is_empty)
    }
}

/// Parse SQLite's `datetime('now')` format, accepting RFC 3339 as well
pub(crate) fn parse_sqlite_datetime(s: &str) -> DateTime<Utc> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .map(|dt| dt.and_utc())
        .or_else(|_| DateTime::parse_from_rfc3339(s).map(|dt| dt.with_timezone(&Utc)))
        .unwrap_or_else(|_| Utc::now())
}
