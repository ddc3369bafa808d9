//! Sign-in / sign-up glue over the identity provider seam.
//!
//! Every successful sign-in is mirrored into the local session cache so the
//! next launch can restore the user without a provider round-trip; sign-out
//! clears it.

use chrono::Utc;
use tracing::info;

use causette_backend::{AuthUser, BackendError, SocialProvider};
use causette_shared::{UserId, UserRecord};
use causette_store::CachedSession;

use crate::client::ChatClient;
use crate::error::{ClientError, Result};

impl ChatClient {
    /// Create an account, its `users` document and the cached session.
    ///
    /// The document's display name falls back to the email local part when
    /// none is given.
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        display_name: Option<&str>,
    ) -> Result<AuthUser> {
        let user = self.auth().register(email, password, display_name).await?;
        let name = display_name
            .map(str::to_string)
            .or_else(|| user.display_name.clone())
            .unwrap_or_else(|| email_local_part(email).to_string());
        self.store()
            .upsert_user(&UserRecord::new(user.id.clone(), email, name))
            .await?;
        self.remember(&user)?;
        info!(user = %user.id, "account registered");
        Ok(user)
    }

    /// Credential sign-in.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<AuthUser> {
        let user = self.auth().sign_in(email, password).await?;
        self.remember(&user)?;
        info!(user = %user.id, "signed in");
        Ok(user)
    }

    /// Federated sign-in. A first-time social user has no `users` document
    /// yet; one is created on the spot.
    pub async fn sign_in_with(&self, provider: SocialProvider) -> Result<AuthUser> {
        let user = self.auth().sign_in_with(provider).await?;
        match self.store().user(&user.id).await {
            Ok(_) => {}
            Err(BackendError::NotFound) => {
                let name = user
                    .display_name
                    .clone()
                    .unwrap_or_else(|| email_local_part(&user.email).to_string());
                self.store()
                    .upsert_user(&UserRecord::new(user.id.clone(), user.email.clone(), name))
                    .await?;
            }
            Err(e) => return Err(e.into()),
        }
        self.remember(&user)?;
        info!(user = %user.id, %provider, "signed in via social provider");
        Ok(user)
    }

    /// End the provider session and forget the cached one.
    pub async fn sign_out(&self) -> Result<()> {
        self.auth().sign_out().await?;
        self.cache().clear_session()?;
        info!("signed out");
        Ok(())
    }

    /// The locally cached session from a previous launch, if any.
    pub fn restore_session(&self) -> Result<Option<CachedSession>> {
        Ok(self.cache().load_session()?)
    }

    /// The signed-in user id: the live provider session when present,
    /// otherwise the local cache.
    pub async fn current_user(&self) -> Result<UserId> {
        if let Some(user) = self.auth().current_session().await? {
            return Ok(user.id);
        }
        match self.cache().load_session()? {
            Some(cached) => Ok(UserId::new(cached.user_id)),
            None => Err(ClientError::NoSession),
        }
    }

    fn remember(&self, user: &AuthUser) -> Result<()> {
        self.cache().save_session(&CachedSession {
            user_id: user.id.as_str().to_string(),
            email: user.email.clone(),
            display_name: user.display_name.clone(),
            signed_in_at: Utc::now(),
        })?;
        Ok(())
    }
}

fn email_local_part(email: &str) -> &str {
    email.split('@').next().unwrap_or(email)
}
