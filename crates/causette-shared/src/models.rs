//! Domain documents exchanged with the backend document store.
//!
//! Every struct derives `Serialize` and `Deserialize` with camelCase field
//! names so it maps one-to-one onto the stored document shape.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{ConversationId, UserId};

// ---------------------------------------------------------------------------
// User
// ---------------------------------------------------------------------------

/// A document in the `users` collection.
///
/// Created at registration with the identity fields; the profile fields are
/// filled in from the settings screen and merged on update.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    /// Opaque id assigned by the identity provider.
    pub id: UserId,
    pub email: String,
    pub display_name: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    pub notifications_enabled: bool,
    pub privacy_enabled: bool,
    pub google_linked: bool,
    pub facebook_linked: bool,
    pub created_at: DateTime<Utc>,
    /// Stamped on every profile update, absent until the first one.
    pub updated_at: Option<DateTime<Utc>>,
}

impl UserRecord {
    /// Fresh record as created at registration time.
    pub fn new(id: UserId, email: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id,
            email: email.into(),
            display_name: display_name.into(),
            first_name: None,
            last_name: None,
            phone: None,
            bio: None,
            avatar_url: None,
            notifications_enabled: true,
            privacy_enabled: false,
            google_linked: false,
            facebook_linked: false,
            created_at: Utc::now(),
            updated_at: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Conversation
// ---------------------------------------------------------------------------

/// A document in the `conversations` collection.
///
/// Created lazily on the first send between a pair of users, its preview
/// fields updated on every subsequent send, never deleted by the client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub id: ConversationId,
    pub participants: Vec<UserId>,
    /// Display name for group conversations; two-party conversations are
    /// labelled from the participant list instead.
    pub name: Option<String>,
    pub last_message: Option<String>,
    pub last_message_at: Option<DateTime<Utc>>,
}

impl Conversation {
    /// Two-party conversation under the canonical derived identity.
    pub fn direct(a: &UserId, b: &UserId) -> Self {
        let id = ConversationId::between(a, b);
        let mut participants = vec![a.clone(), b.clone()];
        participants.sort();
        Self {
            id,
            participants,
            name: None,
            last_message: None,
            last_message_at: None,
        }
    }

    /// Named group conversation under a fresh identity.
    pub fn group(name: impl Into<String>, participants: Vec<UserId>) -> Self {
        Self {
            id: ConversationId::group(),
            participants,
            name: Some(name.into()),
            last_message: None,
            last_message_at: None,
        }
    }

    pub fn involves(&self, user: &UserId) -> bool {
        self.participants.contains(user)
    }
}

// ---------------------------------------------------------------------------
// Message
// ---------------------------------------------------------------------------

/// A persisted document in the `messages` collection.
///
/// The id is assigned by the backend; client-side optimistic entries carry a
/// pending id until this shape is observed through the subscription.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub conversation_id: ConversationId,
    pub sender_id: UserId,
    pub text: String,
    /// Ordering key, seconds resolution.
    pub created_at: DateTime<Utc>,
    pub read: bool,
}

/// Payload for persisting a new message. The backend assigns id and
/// creation timestamp.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MessageDraft {
    pub conversation_id: ConversationId,
    pub sender_id: UserId,
    pub text: String,
}
