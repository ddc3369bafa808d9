//! Profile settings and user search glue.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;

use causette_backend::BackendError;
use causette_shared::{UserId, UserRecord};

use crate::client::ChatClient;
use crate::error::Result;

/// Changes from the settings screen. Absent fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    pub notifications_enabled: Option<bool>,
    pub privacy_enabled: Option<bool>,
    pub google_linked: Option<bool>,
    pub facebook_linked: Option<bool>,
}

impl ChatClient {
    /// Account settings for the profile screen. An absent document is not
    /// an error here.
    pub async fn profile(&self, user: &UserId) -> Result<Option<UserRecord>> {
        match self.store().user(user).await {
            Ok(record) => Ok(Some(record)),
            Err(BackendError::NotFound) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Merge profile changes into the user document, stamping
    /// `updated_at`. Creates the document if it does not exist yet.
    pub async fn update_profile(&self, user: &UserId, changes: ProfileUpdate) -> Result<UserRecord> {
        let mut record = match self.store().user(user).await {
            Ok(record) => record,
            Err(BackendError::NotFound) => UserRecord::new(
                user.clone(),
                changes.email.clone().unwrap_or_default(),
                user.as_str(),
            ),
            Err(e) => return Err(e.into()),
        };

        if let Some(v) = changes.first_name {
            record.first_name = Some(v);
        }
        if let Some(v) = changes.last_name {
            record.last_name = Some(v);
        }
        if let Some(v) = changes.email {
            record.email = v;
        }
        if let Some(v) = changes.phone {
            record.phone = Some(v);
        }
        if let Some(v) = changes.bio {
            record.bio = Some(v);
        }
        if let Some(v) = changes.avatar_url {
            record.avatar_url = Some(v);
        }
        if let Some(v) = changes.notifications_enabled {
            record.notifications_enabled = v;
        }
        if let Some(v) = changes.privacy_enabled {
            record.privacy_enabled = v;
        }
        if let Some(v) = changes.google_linked {
            record.google_linked = v;
        }
        if let Some(v) = changes.facebook_linked {
            record.facebook_linked = v;
        }
        record.updated_at = Some(Utc::now());

        self.store().upsert_user(&record).await?;
        info!(user = %user, "profile updated");
        Ok(record)
    }

    /// Delete the account document and forget the local session.
    pub async fn delete_account(&self, user: &UserId) -> Result<()> {
        self.store().delete_user(user).await?;
        self.cache().clear_session()?;
        info!(user = %user, "account deleted");
        Ok(())
    }

    /// Prefix search over user first names, evaluated store-side as a
    /// half-open string range. An empty query lists all users.
    pub async fn search_users(&self, query: &str) -> Result<Vec<UserRecord>> {
        Ok(self.store().search_users(query.trim()).await?)
    }
}
