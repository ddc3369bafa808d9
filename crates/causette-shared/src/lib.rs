//! # causette-shared
//!
//! Identifier types, domain documents and constants shared by every crate
//! in the Causette workspace.

pub mod constants;
pub mod models;
pub mod types;

pub use models::{Conversation, Message, MessageDraft, UserRecord};
pub use types::{ConversationId, MessageId, UserId};
