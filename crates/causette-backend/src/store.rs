//! Document store seam.
//!
//! Collections consumed: `users/{id}`, `conversations/{id}` and `messages`
//! filtered by conversation and ordered by creation time. The store is
//! external; this trait is the full surface the client binds to.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use causette_shared::{Conversation, ConversationId, Message, MessageDraft, UserId, UserRecord};

use crate::error::Result;
use crate::subscription::MessageSubscription;

#[async_trait]
pub trait DocumentStore: Send + Sync {
    // ------------------------------------------------------------------
    // Users
    // ------------------------------------------------------------------

    /// Fetch a user document by id. Fails with `NotFound` if absent.
    async fn user(&self, id: &UserId) -> Result<UserRecord>;

    /// Create-or-merge a user document.
    async fn upsert_user(&self, user: &UserRecord) -> Result<()>;

    /// Delete a user document by id. Deleting an absent document is a no-op.
    async fn delete_user(&self, id: &UserId) -> Result<()>;

    /// Users whose first name starts with `prefix`, expressed as the
    /// half-open range `[prefix, prefix + '\u{f8ff}')` on the backend query
    /// interface. An empty prefix lists every user.
    async fn search_users(&self, prefix: &str) -> Result<Vec<UserRecord>>;

    // ------------------------------------------------------------------
    // Conversations
    // ------------------------------------------------------------------

    /// Fetch a conversation document by id. Fails with `NotFound` if the
    /// conversation was never created.
    async fn conversation(&self, id: &ConversationId) -> Result<Conversation>;

    /// Conversations whose participant set contains `user`. The filter runs
    /// store-side; ordering is left to the caller.
    async fn conversations_for(&self, user: &UserId) -> Result<Vec<Conversation>>;

    /// Create-or-merge a conversation document.
    async fn upsert_conversation(&self, conversation: &Conversation) -> Result<()>;

    /// Update only the last-message preview fields of an existing
    /// conversation. Fails with `NotFound` if the document is absent.
    async fn touch_conversation(
        &self,
        id: &ConversationId,
        preview: &str,
        at: DateTime<Utc>,
    ) -> Result<()>;

    // ------------------------------------------------------------------
    // Messages
    // ------------------------------------------------------------------

    /// Message history for a conversation, ascending by creation time.
    ///
    /// With `before` set, only messages strictly older than the bound are
    /// returned (the newest `limit` of them); otherwise the newest `limit`
    /// messages overall. Fails with `NotFound` if the conversation was
    /// never created; an existing conversation with no messages yields an
    /// empty, valid result.
    async fn messages(
        &self,
        conversation: &ConversationId,
        before: Option<DateTime<Utc>>,
        limit: usize,
    ) -> Result<Vec<Message>>;

    /// Persist a message. The store assigns the id and creation timestamp
    /// and returns the stored document.
    async fn insert_message(&self, draft: MessageDraft) -> Result<Message>;

    /// Mark every message in the conversation not sent by `reader` as read.
    /// Returns the number of documents updated.
    async fn mark_read(&self, conversation: &ConversationId, reader: &UserId) -> Result<usize>;

    /// Subscribe to the conversation's message set. Each time the stored
    /// set changes the subscription delivers the full current sequence,
    /// re-sorted ascending; the current sequence is also delivered once on
    /// registration. Subscribing to a conversation that does not exist yet
    /// is valid and starts from the empty sequence.
    async fn subscribe_messages(&self, conversation: &ConversationId)
        -> Result<MessageSubscription>;
}
