//! Identity provider seam.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use causette_shared::UserId;

use crate::error::Result;

/// The opaque user record returned by the identity provider.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AuthUser {
    pub id: UserId,
    pub email: String,
    pub display_name: Option<String>,
}

/// Federated sign-in providers the client offers.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum SocialProvider {
    Google,
    Facebook,
}

impl std::fmt::Display for SocialProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Google => write!(f, "google"),
            Self::Facebook => write!(f, "facebook"),
        }
    }
}

/// Operations consumed from the external identity provider.
///
/// The provider owns credentials, tokens and the server-side session; the
/// client only ever sees [`AuthUser`].
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Create an account. Fails with `Invalid` if the email is taken.
    async fn register(
        &self,
        email: &str,
        password: &str,
        display_name: Option<&str>,
    ) -> Result<AuthUser>;

    /// Credential sign-in. Fails with `Unauthorized` on a mismatch.
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthUser>;

    /// Federated sign-in through a social provider.
    async fn sign_in_with(&self, provider: SocialProvider) -> Result<AuthUser>;

    /// End the provider-side session. Idempotent.
    async fn sign_out(&self) -> Result<()>;

    /// The currently signed-in user, if any.
    async fn current_session(&self) -> Result<Option<AuthUser>>;
}
