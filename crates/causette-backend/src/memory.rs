//! In-process implementations of the backend seams.
//!
//! [`MemoryBackend`] and [`MemoryAuth`] back the test suite and local
//! development. Snapshot fan-out follows the external store's contract:
//! every mutation of a conversation's message set pushes the full re-sorted
//! sequence to each live subscriber.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::debug;
use uuid::Uuid;

use causette_shared::constants::PREFIX_RANGE_SENTINEL;
use causette_shared::{Conversation, ConversationId, Message, MessageDraft, UserId, UserRecord};

use crate::auth::{AuthProvider, AuthUser, SocialProvider};
use crate::error::{BackendError, Result};
use crate::store::DocumentStore;
use crate::subscription::MessageSubscription;

// ---------------------------------------------------------------------------
// Document store
// ---------------------------------------------------------------------------

struct Watcher {
    id: u64,
    tx: mpsc::UnboundedSender<Vec<Message>>,
}

#[derive(Default)]
struct State {
    users: BTreeMap<UserId, UserRecord>,
    conversations: HashMap<ConversationId, Conversation>,
    messages: HashMap<ConversationId, Vec<Message>>,
    watchers: HashMap<ConversationId, Vec<Watcher>>,
    next_watcher: u64,
}

impl State {
    fn snapshot(&self, conversation: &ConversationId) -> Vec<Message> {
        let mut messages = self
            .messages
            .get(conversation)
            .cloned()
            .unwrap_or_default();
        messages.sort_by_key(|m| m.created_at.timestamp());
        messages
    }

    fn notify(&mut self, conversation: &ConversationId) {
        let snapshot = self.snapshot(conversation);
        if let Some(watchers) = self.watchers.get_mut(conversation) {
            watchers.retain(|w| w.tx.send(snapshot.clone()).is_ok());
        }
    }
}

/// In-memory document store with push-based message subscriptions.
#[derive(Default, Clone)]
pub struct MemoryBackend {
    state: Arc<Mutex<State>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for MemoryBackend {
    async fn user(&self, id: &UserId) -> Result<UserRecord> {
        self.state
            .lock()
            .users
            .get(id)
            .cloned()
            .ok_or(BackendError::NotFound)
    }

    async fn upsert_user(&self, user: &UserRecord) -> Result<()> {
        self.state
            .lock()
            .users
            .insert(user.id.clone(), user.clone());
        Ok(())
    }

    async fn delete_user(&self, id: &UserId) -> Result<()> {
        self.state.lock().users.remove(id);
        Ok(())
    }

    async fn search_users(&self, prefix: &str) -> Result<Vec<UserRecord>> {
        let upper = format!("{prefix}{PREFIX_RANGE_SENTINEL}");
        let state = self.state.lock();
        let results = state
            .users
            .values()
            .filter(|u| {
                if prefix.is_empty() {
                    return true;
                }
                // Half-open range [prefix, prefix + sentinel), the same
                // approximation of "starts with" the remote query runs.
                match &u.first_name {
                    Some(name) => name.as_str() >= prefix && name.as_str() < upper.as_str(),
                    None => false,
                }
            })
            .cloned()
            .collect();
        Ok(results)
    }

    async fn conversation(&self, id: &ConversationId) -> Result<Conversation> {
        self.state
            .lock()
            .conversations
            .get(id)
            .cloned()
            .ok_or(BackendError::NotFound)
    }

    async fn conversations_for(&self, user: &UserId) -> Result<Vec<Conversation>> {
        let state = self.state.lock();
        Ok(state
            .conversations
            .values()
            .filter(|c| c.involves(user))
            .cloned()
            .collect())
    }

    async fn upsert_conversation(&self, conversation: &Conversation) -> Result<()> {
        self.state
            .lock()
            .conversations
            .insert(conversation.id.clone(), conversation.clone());
        Ok(())
    }

    async fn touch_conversation(
        &self,
        id: &ConversationId,
        preview: &str,
        at: DateTime<Utc>,
    ) -> Result<()> {
        let mut state = self.state.lock();
        let conversation = state
            .conversations
            .get_mut(id)
            .ok_or(BackendError::NotFound)?;
        conversation.last_message = Some(preview.to_string());
        conversation.last_message_at = Some(at);
        Ok(())
    }

    async fn messages(
        &self,
        conversation: &ConversationId,
        before: Option<DateTime<Utc>>,
        limit: usize,
    ) -> Result<Vec<Message>> {
        let state = self.state.lock();
        // "Never created" covers the recoverable send inconsistency: a
        // conversation is considered created once either its document or any
        // of its messages exists.
        if !state.conversations.contains_key(conversation)
            && !state.messages.contains_key(conversation)
        {
            return Err(BackendError::NotFound);
        }

        let mut messages = state.snapshot(conversation);
        if let Some(bound) = before {
            messages.retain(|m| m.created_at < bound);
        }
        if messages.len() > limit {
            messages.drain(..messages.len() - limit);
        }
        Ok(messages)
    }

    async fn insert_message(&self, draft: MessageDraft) -> Result<Message> {
        let message = Message {
            id: Uuid::new_v4().to_string(),
            conversation_id: draft.conversation_id.clone(),
            sender_id: draft.sender_id,
            text: draft.text,
            created_at: Utc::now(),
            read: false,
        };

        let mut state = self.state.lock();
        state
            .messages
            .entry(draft.conversation_id.clone())
            .or_default()
            .push(message.clone());
        state.notify(&draft.conversation_id);
        Ok(message)
    }

    async fn mark_read(&self, conversation: &ConversationId, reader: &UserId) -> Result<usize> {
        let mut state = self.state.lock();
        let mut updated = 0;
        if let Some(messages) = state.messages.get_mut(conversation) {
            for message in messages.iter_mut() {
                if &message.sender_id != reader && !message.read {
                    message.read = true;
                    updated += 1;
                }
            }
        }
        if updated > 0 {
            state.notify(conversation);
        }
        Ok(updated)
    }

    async fn subscribe_messages(
        &self,
        conversation: &ConversationId,
    ) -> Result<MessageSubscription> {
        let (tx, rx) = mpsc::unbounded_channel();

        let watcher_id = {
            let mut state = self.state.lock();
            let id = state.next_watcher;
            state.next_watcher += 1;

            // Initial delivery of the current sequence.
            let snapshot = state.snapshot(conversation);
            let _ = tx.send(snapshot);

            state
                .watchers
                .entry(conversation.clone())
                .or_default()
                .push(Watcher { id, tx });
            id
        };

        let state = Arc::clone(&self.state);
        let key = conversation.clone();
        let detach = move || {
            let mut state = state.lock();
            if let Some(watchers) = state.watchers.get_mut(&key) {
                watchers.retain(|w| w.id != watcher_id);
            }
            debug!(conversation = %key, watcher = watcher_id, "subscription detached");
        };

        Ok(MessageSubscription::new(rx, detach))
    }
}

// ---------------------------------------------------------------------------
// Identity provider
// ---------------------------------------------------------------------------

struct Account {
    password: String,
    user: AuthUser,
}

#[derive(Default)]
struct AuthState {
    accounts: HashMap<String, Account>,
    social: HashMap<SocialProvider, AuthUser>,
    current: Option<AuthUser>,
}

/// In-memory identity provider.
#[derive(Default, Clone)]
pub struct MemoryAuth {
    state: Arc<Mutex<AuthState>>,
}

impl MemoryAuth {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-link the account a social provider resolves to.
    pub fn link_social(&self, provider: SocialProvider, user: AuthUser) {
        self.state.lock().social.insert(provider, user);
    }
}

#[async_trait]
impl AuthProvider for MemoryAuth {
    async fn register(
        &self,
        email: &str,
        password: &str,
        display_name: Option<&str>,
    ) -> Result<AuthUser> {
        let mut state = self.state.lock();
        if state.accounts.contains_key(email) {
            return Err(BackendError::Invalid(format!(
                "email already registered: {email}"
            )));
        }

        let user = AuthUser {
            id: UserId::new(Uuid::new_v4().to_string()),
            email: email.to_string(),
            display_name: display_name.map(str::to_string),
        };
        state.accounts.insert(
            email.to_string(),
            Account {
                password: password.to_string(),
                user: user.clone(),
            },
        );
        // Registration signs the new account in, like the remote provider.
        state.current = Some(user.clone());
        Ok(user)
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthUser> {
        let mut state = self.state.lock();
        match state.accounts.get(email) {
            Some(account) if account.password == password => {
                let user = account.user.clone();
                state.current = Some(user.clone());
                Ok(user)
            }
            _ => Err(BackendError::Unauthorized(
                "invalid email or password".into(),
            )),
        }
    }

    async fn sign_in_with(&self, provider: SocialProvider) -> Result<AuthUser> {
        let mut state = self.state.lock();
        match state.social.get(&provider).cloned() {
            Some(user) => {
                state.current = Some(user.clone());
                Ok(user)
            }
            None => Err(BackendError::Unauthorized(format!(
                "no {provider} account linked"
            ))),
        }
    }

    async fn sign_out(&self) -> Result<()> {
        self.state.lock().current = None;
        Ok(())
    }

    async fn current_session(&self) -> Result<Option<AuthUser>> {
        Ok(self.state.lock().current.clone())
    }
}
