//! Conversation-list projection for the sidebar.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use causette_shared::{Conversation, ConversationId, UserId};

use crate::client::ChatClient;
use crate::error::Result;

/// One sidebar row: what to show and where it leads.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ConversationSummary {
    pub id: ConversationId,
    pub label: String,
    pub preview: Option<String>,
    pub last_message_at: Option<DateTime<Utc>>,
}

/// Project the raw conversation collection into the list for one user:
/// only conversations they participate in, newest activity first with
/// never-used conversations last, labelled with the group name when set,
/// else the joined other-participant ids.
pub fn conversation_summaries(
    user: &UserId,
    conversations: &[Conversation],
) -> Vec<ConversationSummary> {
    let mut summaries: Vec<ConversationSummary> = conversations
        .iter()
        .filter(|c| c.involves(user))
        .map(|c| ConversationSummary {
            id: c.id.clone(),
            label: label_for(user, c),
            preview: c.last_message.clone(),
            last_message_at: c.last_message_at,
        })
        .collect();
    // Descending by timestamp; None (no messages yet) sorts below any Some.
    summaries.sort_by_key(|s| std::cmp::Reverse(s.last_message_at.map(|t| t.timestamp())));
    summaries
}

fn label_for(user: &UserId, conversation: &Conversation) -> String {
    if let Some(name) = &conversation.name {
        return name.clone();
    }
    let others: Vec<&str> = conversation
        .participants
        .iter()
        .filter(|p| *p != user)
        .map(|p| p.as_str())
        .collect();
    if others.is_empty() {
        return "Unknown Chat".to_string();
    }
    others.join(", ")
}

impl ChatClient {
    /// Sidebar listing for `user`. The participant filter runs store-side;
    /// ordering and labelling happen here.
    pub async fn conversations(&self, user: &UserId) -> Result<Vec<ConversationSummary>> {
        let conversations = self.store().conversations_for(user).await?;
        Ok(conversation_summaries(user, &conversations))
    }

    /// Create a named group conversation. The creator is always included in
    /// the participant set.
    pub async fn create_group(
        &self,
        name: &str,
        creator: &UserId,
        members: &[UserId],
    ) -> Result<Conversation> {
        let mut participants = members.to_vec();
        if !participants.contains(creator) {
            participants.push(creator.clone());
        }
        participants.sort();
        let conversation = Conversation::group(name, participants);
        self.store().upsert_conversation(&conversation).await?;
        info!(conversation = %conversation.id, name, "group created");
        Ok(conversation)
    }
}
