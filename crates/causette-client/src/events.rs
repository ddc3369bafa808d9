//! Typed event channel from the session to the presentation layer.
//!
//! All updates flow through one channel so the cancel-before-replace rule
//! has a single enforcement point: once a subscription is cancelled,
//! nothing can write into the rendered state on its behalf.

use serde::Serialize;
use tokio::sync::mpsc;
use uuid::Uuid;

use causette_shared::ConversationId;

use crate::message_store::ChatMessage;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase", tag = "type")]
pub enum ChatEvent {
    /// The rendered sequence for a conversation changed.
    MessagesUpdated {
        conversation_id: ConversationId,
        messages: Vec<ChatMessage>,
    },
    /// The active conversation changed. `None` is the placeholder state
    /// shown before any conversation exists.
    ConversationOpened {
        conversation_id: Option<ConversationId>,
    },
    /// Persisting an optimistic send failed; the entry is kept as failed.
    SendFailed {
        conversation_id: ConversationId,
        local_id: Uuid,
    },
    /// A backward pagination fetch started or finished.
    OlderMessages {
        conversation_id: ConversationId,
        in_flight: bool,
    },
}

pub type EventSender = mpsc::UnboundedSender<ChatEvent>;
pub type EventReceiver = mpsc::UnboundedReceiver<ChatEvent>;

/// Send an event, logging instead of failing when the receiver is gone.
pub fn emit(tx: &EventSender, event: ChatEvent) {
    if tx.send(event).is_err() {
        tracing::debug!("event receiver dropped, update not delivered");
    }
}
