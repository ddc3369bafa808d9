use serde::{Deserialize, Serialize};
use uuid::Uuid;

// User identity = opaque id assigned by the identity provider
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct UserId(pub String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Canonical key naming a conversation.
///
/// For a two-party conversation the key is the lexicographically sorted,
/// underscore-joined pair of participant ids, so the same two users always
/// resolve to the same conversation no matter who initiates:
/// `between(a, b) == between(b, a)`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct ConversationId(String);

impl ConversationId {
    /// Derive the identity of the conversation between two users.
    ///
    /// Pure and commutative. Both ids must be non-empty.
    pub fn between(a: &UserId, b: &UserId) -> Self {
        let (first, second) = if a.as_str() <= b.as_str() {
            (a, b)
        } else {
            (b, a)
        };
        Self(format!("{}_{}", first.as_str(), second.as_str()))
    }

    /// Fresh identity for a group conversation.
    pub fn group() -> Self {
        Self(format!("group_{}", Uuid::new_v4()))
    }

    /// Wrap a key received from the backend verbatim.
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The other participant of a two-party conversation.
    ///
    /// Works by stripping `user` from either end of the key, so ids that
    /// themselves contain underscores are handled. Returns `None` when
    /// `user` is not a participant, including for group keys.
    pub fn peer_of(&self, user: &UserId) -> Option<UserId> {
        if let Some(rest) = self.0.strip_prefix(&format!("{}_", user.as_str())) {
            return Some(UserId::new(rest));
        }
        if let Some(rest) = self.0.strip_suffix(&format!("_{}", user.as_str())) {
            return Some(UserId::new(rest));
        }
        None
    }
}

impl std::fmt::Display for ConversationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Message identity.
///
/// A message starts life client-side under a locally generated pending id
/// and is reassigned the server id once the persisted copy is observed.
/// Keeping the two states as distinct variants makes reconciliation a
/// type-level match instead of an id-prefix convention.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase", tag = "state", content = "id")]
pub enum MessageId {
    /// Locally synthesized, persistence not yet confirmed.
    Pending(Uuid),
    /// Assigned by the backend on persistence.
    Confirmed(String),
}

impl MessageId {
    pub fn pending() -> Self {
        Self::Pending(Uuid::new_v4())
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending(_))
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending(local) => write!(f, "pending:{local}"),
            Self::Confirmed(id) => write!(f, "{id}"),
        }
    }
}
