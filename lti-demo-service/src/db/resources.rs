//! Course resource storage operations.

use rusqlite::{OptionalExtension, params};
use tracing::info;
use uuid::Uuid;

use super::Database;
use super::models::Resource;
use crate::error::{DatabaseError, ServiceResult};

impl Database {
    /// Get the resource bound to `(platform, resource_id)`.
    ///
    /// With `create_if_absent` a missing record is created first, so repeated
    /// calls for the same pair always yield the same record id.
    pub fn get_resource(
        &self,
        platform: &str,
        resource_id: &str,
        create_if_absent: bool,
    ) -> ServiceResult<Option<Resource>> {
        let conn = self.conn.lock().unwrap();

        if create_if_absent {
            let inserted = conn
                .execute(
                    "INSERT OR IGNORE INTO resources (id, platform, resource_id) VALUES (?1, ?2, ?3)",
                    params![Uuid::new_v4().to_string(), platform, resource_id],
                )
                .map_err(DatabaseError::Query)?;
            if inserted > 0 {
                info!(platform = %platform, resource_id = %resource_id, "Created resource");
            }
        }

        let resource = conn
            .query_row(
                &format!(
                    "SELECT {} FROM resources WHERE platform = ?1 AND resource_id = ?2",
                    Resource::COLUMNS
                ),
                params![platform, resource_id],
                Resource::from_row,
            )
            .optional()
            .map_err(DatabaseError::Query)?;

        Ok(resource)
    }

    /// Get a resource by its record id
    pub fn get_resource_by_id(&self, id: &str) -> ServiceResult<Option<Resource>> {
        let conn = self.conn.lock().unwrap();

        let resource = conn
            .query_row(
                &format!("SELECT {} FROM resources WHERE id = ?1", Resource::COLUMNS),
                params![id],
                Resource::from_row,
            )
            .optional()
            .map_err(DatabaseError::Query)?;

        Ok(resource)
    }

    /// Replace a resource's content; `None` clears it.
    /// Returns the updated record, or `None` if no such resource exists.
    pub fn set_resource_content(
        &self,
        id: &str,
        content: Option<&str>,
    ) -> ServiceResult<Option<Resource>> {
        let updated = {
            let conn = self.conn.lock().unwrap();
            conn.execute(
                "UPDATE resources SET content = ?1, updated_at = datetime('now') WHERE id = ?2",
                params![content, id],
            )
            .map_err(DatabaseError::Query)?
        };

        if updated == 0 {
            return Ok(None);
        }
        self.get_resource_by_id(id)
    }
}
