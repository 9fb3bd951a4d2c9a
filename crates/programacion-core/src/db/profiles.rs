//! Profile and role definition storage.

use rusqlite::{params, OptionalExtension};

use super::{Database, DbResult};
use crate::backend::UserPermissions;
use crate::permissions::PermissionMatrix;

impl Database {
    /// Create or replace a role definition.
    pub fn upsert_role(&self, role: &str, permissions: &PermissionMatrix) -> DbResult<()> {
        let json = serde_json::to_string(permissions)?;
        self.conn.execute(
            r#"
            INSERT INTO role_definitions (role, permissions) VALUES (?1, ?2)
            ON CONFLICT(role) DO UPDATE SET permissions = excluded.permissions
            "#,
            params![role, json],
        )?;
        Ok(())
    }

    /// Assign a role to a user. Unknown roles get an empty definition.
    pub fn upsert_profile(&self, user_id: &str, role: &str) -> DbResult<()> {
        self.conn.execute(
            "INSERT OR IGNORE INTO role_definitions (role) VALUES (?1)",
            params![role],
        )?;
        self.conn.execute(
            r#"
            INSERT INTO perfiles (id, role) VALUES (?1, ?2)
            ON CONFLICT(id) DO UPDATE SET role = excluded.role
            "#,
            params![user_id, role],
        )?;
        Ok(())
    }

    pub fn get_profile(&self, user_id: &str) -> DbResult<Option<UserPermissions>> {
        let row: Option<(String, Option<String>)> = self
            .conn
            .query_row(
                r#"
                SELECT p.role, r.permissions
                FROM perfiles p
                LEFT JOIN role_definitions r ON r.role = p.role
                WHERE p.id = ?1
                "#,
                params![user_id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        let Some((role, permissions)) = row else {
            return Ok(None);
        };
        let permissions = match permissions {
            Some(json) => serde_json::from_str(&json)?,
            None => PermissionMatrix::new(),
        };
        Ok(Some(UserPermissions {
            role: Some(role),
            permissions,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permissions::{AreaGrant, ViewMode, AREA_LAB};

    #[test]
    fn test_profile_round_trip() {
        let db = Database::open_in_memory().unwrap();
        let matrix = PermissionMatrix::new().with_area(
            AREA_LAB,
            AreaGrant {
                read: true,
                write: false,
                delete: false,
            },
        );
        db.upsert_role("laboratorio_lector", &matrix).unwrap();
        db.upsert_profile("u1", "laboratorio_lector").unwrap();

        let profile = db.get_profile("u1").unwrap().unwrap();
        assert_eq!(profile.role.as_deref(), Some("laboratorio_lector"));
        assert!(profile.permissions.can_read(ViewMode::Lab));
        assert!(!profile.permissions.can_write(ViewMode::Lab));
    }

    #[test]
    fn test_unknown_role_has_empty_matrix() {
        let db = Database::open_in_memory().unwrap();
        db.upsert_profile("u2", "practicante").unwrap();
        let profile = db.get_profile("u2").unwrap().unwrap();
        assert!(profile.permissions.is_empty());
        assert!(db.get_profile("missing").unwrap().is_none());
    }
}
