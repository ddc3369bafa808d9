//! Local app settings, stored as a single JSON row.

use rusqlite::params;
use serde::{Deserialize, Serialize};

use crate::database::Database;
use crate::error::Result;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AppSettings {
    pub notifications_enabled: bool,
    pub enter_to_send: bool,
    pub theme: String,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            notifications_enabled: true,
            enter_to_send: true,
            theme: "light".into(),
        }
    }
}

impl Database {
    /// Load the settings blob, falling back to defaults when absent.
    pub fn get_settings(&self) -> Result<AppSettings> {
        let result: std::result::Result<String, _> =
            self.conn()
                .query_row("SELECT json FROM app_settings WHERE id = 1", [], |row| {
                    row.get(0)
                });

        match result {
            Ok(json) => Ok(serde_json::from_str(&json)?),
            Err(_) => Ok(AppSettings::default()),
        }
    }

    /// Replace the stored settings blob.
    pub fn update_settings(&self, settings: &AppSettings) -> Result<()> {
        let json = serde_json::to_string(settings)?;
        self.conn().execute(
            "INSERT OR REPLACE INTO app_settings (id, json) VALUES (1, ?1)",
            params![json],
        )?;
        tracing::info!("settings updated");
        Ok(())
    }
}
