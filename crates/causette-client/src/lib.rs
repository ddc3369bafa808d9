//! # causette-client
//!
//! Client core for the Causette chat application: the in-memory message
//! sequence for the open conversation, the session orchestrator binding it
//! to the backend realtime channel, the conversation-list projection, and
//! command glue for auth, profiles and search.

pub mod auth;
pub mod client;
pub mod conversations;
pub mod events;
pub mod message_store;
pub mod session;
pub mod users;

mod error;

pub use client::ChatClient;
pub use conversations::{conversation_summaries, ConversationSummary};
pub use error::ClientError;
pub use events::{ChatEvent, EventReceiver, EventSender};
pub use message_store::{ChatMessage, Delivery, LoadState, MessageStore};
pub use session::ChatSession;
pub use users::ProfileUpdate;

use tracing_subscriber::{fmt, EnvFilter};

/// Initialise the process-wide tracing subscriber. Later calls are no-ops.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("causette_client=debug,causette_backend=debug,causette_store=info,warn")
    });

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .try_init()
        .ok();
}
