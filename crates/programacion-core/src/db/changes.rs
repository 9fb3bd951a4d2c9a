//! Change log draining.

use serde_json::{Map, Value};

use super::{Database, DbResult};
use crate::realtime::{ChangeEvent, ChangeNotification};

impl Database {
    /// Take every logged change, oldest first, as change notifications.
    pub fn drain_changes(&self) -> DbResult<Vec<ChangeNotification>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT seq, table_name, event_type, new_row, old_row, committed_at
            FROM change_log
            ORDER BY seq
            "#,
        )?;

        let raw = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, Option<String>>(3)?,
                    row.get::<_, Option<String>>(4)?,
                    row.get::<_, String>(5)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut notifications = Vec::with_capacity(raw.len());
        let mut last_seq = None;
        for (seq, table, event, new_row, old_row, committed_at) in raw {
            let event: ChangeEvent = serde_json::from_value(Value::String(event))?;
            let mut notification = ChangeNotification::new(table, event)
                .with_new(parse_image(new_row.as_deref())?)
                .with_old(parse_image(old_row.as_deref())?);
            notification.commit_timestamp = Some(committed_at);
            notifications.push(notification);
            last_seq = Some(seq);
        }

        if let Some(seq) = last_seq {
            self.conn
                .execute("DELETE FROM change_log WHERE seq <= ?1", [seq])?;
        }
        Ok(notifications)
    }
}

fn parse_image(raw: Option<&str>) -> DbResult<Map<String, Value>> {
    match raw {
        Some(json) => Ok(serde_json::from_str(json)?),
        None => Ok(Map::new()),
    }
}
