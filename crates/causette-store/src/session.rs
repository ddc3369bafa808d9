//! Cached sign-in session.
//!
//! The current user's id, email and display name are written after every
//! successful sign-in, read on startup to restore the session without a
//! provider round-trip, and cleared on sign-out.

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};
use serde::{Deserialize, Serialize};

use crate::database::Database;
use crate::error::Result;

/// The locally cached view of a signed-in user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CachedSession {
    pub user_id: String,
    pub email: String,
    pub display_name: Option<String>,
    pub signed_in_at: DateTime<Utc>,
}

impl Database {
    /// Persist the session, replacing any previous one.
    pub fn save_session(&self, session: &CachedSession) -> Result<()> {
        self.conn().execute(
            "INSERT OR REPLACE INTO session (id, user_id, email, display_name, signed_in_at)
             VALUES (1, ?1, ?2, ?3, ?4)",
            params![
                session.user_id,
                session.email,
                session.display_name,
                session.signed_in_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Load the cached session, if one is present.
    pub fn load_session(&self) -> Result<Option<CachedSession>> {
        let row = self
            .conn()
            .query_row(
                "SELECT user_id, email, display_name, signed_in_at FROM session WHERE id = 1",
                [],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, Option<String>>(2)?,
                        row.get::<_, String>(3)?,
                    ))
                },
            )
            .optional()?;

        let Some((user_id, email, display_name, signed_in_str)) = row else {
            return Ok(None);
        };

        let signed_in_at = DateTime::parse_from_rfc3339(&signed_in_str)?.with_timezone(&Utc);

        Ok(Some(CachedSession {
            user_id,
            email,
            display_name,
            signed_in_at,
        }))
    }

    /// Forget the cached session. Idempotent.
    pub fn clear_session(&self) -> Result<()> {
        self.conn().execute("DELETE FROM session WHERE id = 1", [])?;
        Ok(())
    }
}
