//! In-memory message sequence for the open conversation.
//!
//! The store merges four inputs into one rendered sequence: the initial
//! history fetch, full-sequence snapshots pushed by the realtime
//! subscription, optimistic local sends, and backward pagination results.
//! Invariant: the sequence is sorted non-decreasing by creation timestamp
//! (seconds resolution, ties stable in insertion order) at every
//! observation point, with at most one visible entry per logical send.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use causette_shared::constants::RECONCILE_WINDOW_SECS;
use causette_shared::{ConversationId, Message, MessageId, UserId};

/// Delivery status of a rendered message.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum Delivery {
    /// Optimistic local entry, persistence not yet confirmed.
    Pending,
    /// Observed from the store, authoritative.
    Sent,
    /// The persist call failed; the entry is kept for retry display.
    Failed,
}

/// A message as rendered in the chat window.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: MessageId,
    pub conversation_id: ConversationId,
    pub sender_id: UserId,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub delivery: Delivery,
    pub read: bool,
}

impl ChatMessage {
    /// Optimistic entry for a send that has not reached the store yet.
    pub fn pending(
        conversation_id: ConversationId,
        sender_id: UserId,
        text: impl Into<String>,
    ) -> Self {
        Self {
            id: MessageId::pending(),
            conversation_id,
            sender_id,
            text: text.into(),
            created_at: Utc::now(),
            delivery: Delivery::Pending,
            read: false,
        }
    }

    /// Authoritative entry for a persisted message.
    pub fn confirmed(message: Message) -> Self {
        Self {
            id: MessageId::Confirmed(message.id),
            conversation_id: message.conversation_id,
            sender_id: message.sender_id,
            text: message.text,
            created_at: message.created_at,
            delivery: Delivery::Sent,
            read: message.read,
        }
    }

    /// The local id of an optimistic entry.
    pub fn local_id(&self) -> Option<Uuid> {
        match self.id {
            MessageId::Pending(id) => Some(id),
            MessageId::Confirmed(_) => None,
        }
    }

    /// Whether `persisted` is the store's echo of this optimistic entry.
    ///
    /// The local entry has no server id yet, so the key is (sender, text,
    /// timestamp proximity); the window absorbs clock skew between the
    /// local stamp and the server-assigned one.
    fn reconciles_with(&self, persisted: &Message) -> bool {
        self.sender_id == persisted.sender_id
            && self.text == persisted.text
            && (persisted.created_at - self.created_at)
                .num_seconds()
                .abs()
                <= RECONCILE_WINDOW_SECS
    }
}

/// Load lifecycle of the open conversation.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum LoadState {
    Empty,
    Loading,
    Ready,
}

#[derive(Debug)]
pub struct MessageStore {
    state: LoadState,
    messages: Vec<ChatMessage>,
    fetching_older: bool,
}

impl MessageStore {
    pub fn new() -> Self {
        Self {
            state: LoadState::Empty,
            messages: Vec::new(),
            fetching_older: false,
        }
    }

    pub fn state(&self) -> LoadState {
        self.state
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn is_fetching_older(&self) -> bool {
        self.fetching_older
    }

    /// Drop everything and return to `Empty`.
    pub fn clear(&mut self) {
        self.state = LoadState::Empty;
        self.messages.clear();
        self.fetching_older = false;
    }

    /// Enter `Loading` for a freshly selected conversation.
    pub fn begin_load(&mut self) {
        self.clear();
        self.state = LoadState::Loading;
    }

    /// Install the fetched history and enter `Ready`.
    pub fn finish_load(&mut self, history: Vec<Message>) {
        self.messages = history.into_iter().map(ChatMessage::confirmed).collect();
        self.resort();
        self.fetching_older = false;
        self.state = LoadState::Ready;
    }

    /// Insert an optimistic entry immediately, no network wait.
    pub fn append_optimistic(&mut self, message: ChatMessage) {
        self.messages.push(message);
        self.resort();
        self.state = LoadState::Ready;
    }

    /// Tag an optimistic entry as failed, keeping it visible.
    pub fn mark_failed(&mut self, local_id: Uuid) -> bool {
        for message in self.messages.iter_mut() {
            if message.local_id() == Some(local_id) {
                message.delivery = Delivery::Failed;
                return true;
            }
        }
        false
    }

    /// Merge a full-sequence snapshot from the subscription.
    ///
    /// Confirmed entries are replaced wholesale. Local (pending or failed)
    /// entries are reconciled against the snapshot: each one that finds a
    /// persisted echo disappears in favour of it, each persisted entry
    /// absorbs at most one local, and locals without an echo are carried
    /// over. Safe to call with the same snapshot any number of times and
    /// in any interleaving with optimistic appends.
    pub fn apply_snapshot(&mut self, snapshot: Vec<Message>) {
        let mut absorbed = vec![false; snapshot.len()];
        let locals: Vec<ChatMessage> = self
            .messages
            .drain(..)
            .filter(|m| m.id.is_pending())
            .filter(|local| {
                let echo = snapshot
                    .iter()
                    .enumerate()
                    .find(|(i, persisted)| !absorbed[*i] && local.reconciles_with(persisted));
                match echo {
                    Some((i, _)) => {
                        absorbed[i] = true;
                        false
                    }
                    None => true,
                }
            })
            .collect();

        self.messages = snapshot.into_iter().map(ChatMessage::confirmed).collect();
        self.messages.extend(locals);
        self.resort();
        self.state = LoadState::Ready;
    }

    /// Claim the pagination slot. Returns `false` while a fetch is already
    /// in flight (or before the initial load finished), so rapid triggers
    /// collapse into a single request.
    pub fn begin_older(&mut self) -> bool {
        if self.fetching_older || self.state != LoadState::Ready {
            return false;
        }
        self.fetching_older = true;
        true
    }

    /// Merge a page of strictly-older messages at the head and release the
    /// pagination slot. Entries already present are skipped.
    pub fn finish_older(&mut self, older: Vec<Message>) {
        self.fetching_older = false;
        let known: HashSet<String> = self
            .messages
            .iter()
            .filter_map(|m| match &m.id {
                MessageId::Confirmed(id) => Some(id.clone()),
                MessageId::Pending(_) => None,
            })
            .collect();
        for message in older {
            if !known.contains(&message.id) {
                self.messages.push(ChatMessage::confirmed(message));
            }
        }
        self.resort();
    }

    /// Release the pagination slot without merging anything.
    pub fn abort_older(&mut self) {
        self.fetching_older = false;
    }

    /// Timestamp of the oldest confirmed entry, the exclusive bound for the
    /// next pagination fetch.
    pub fn oldest_confirmed_at(&self) -> Option<DateTime<Utc>> {
        self.messages
            .iter()
            .find(|m| !m.id.is_pending())
            .map(|m| m.created_at)
    }

    fn resort(&mut self) {
        // Seconds resolution; the stable sort keeps insertion order on ties.
        self.messages.sort_by_key(|m| m.created_at.timestamp());
    }
}

impl Default for MessageStore {
    fn default() -> Self {
        Self::new()
    }
}
