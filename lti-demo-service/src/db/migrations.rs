//! Database schema migrations.

use rusqlite::Connection;

use crate::error::{DatabaseError, ServiceResult};

/// Run all database migrations.
///
/// Called during database initialization to bring the schema up to date.
pub(super) fn run_migrations(conn: &Connection) -> ServiceResult<()> {
    conn.execute_batch(
        r#"
        -- Course resources bound to (platform, resource link id)
        CREATE TABLE IF NOT EXISTS resources (
            id TEXT PRIMARY KEY,
            platform TEXT NOT NULL,
            resource_id TEXT NOT NULL,
            content TEXT,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at TEXT NOT NULL DEFAULT (datetime('now')),
            UNIQUE(platform, resource_id)
        );

        CREATE INDEX IF NOT EXISTS idx_resources_platform ON resources(platform);
    "#,
    )
    .map_err(|e| DatabaseError::Migration {
        message: e.to_string(),
    })?;

    Ok(())
}
