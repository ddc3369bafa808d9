//! Client facade owning the backend handles and the local cache.

use std::sync::Arc;

use causette_backend::{AuthProvider, DocumentStore};
use causette_shared::UserId;
use causette_store::Database;

use crate::events::EventReceiver;
use crate::session::ChatSession;

/// Everything the UI layer needs, bound together once at startup.
///
/// The backend seams arrive as trait objects so the client never depends on
/// a concrete provider; the cache is the local SQLite database.
pub struct ChatClient {
    auth: Arc<dyn AuthProvider>,
    store: Arc<dyn DocumentStore>,
    cache: Database,
}

impl ChatClient {
    pub fn new(auth: Arc<dyn AuthProvider>, store: Arc<dyn DocumentStore>, cache: Database) -> Self {
        Self { auth, store, cache }
    }

    /// Open a chat session for `user`. The session owns its own event
    /// channel; the caller consumes the receiver.
    pub fn open_session(&self, user: UserId) -> (ChatSession, EventReceiver) {
        ChatSession::new(Arc::clone(&self.store), user)
    }

    pub(crate) fn auth(&self) -> &dyn AuthProvider {
        self.auth.as_ref()
    }

    pub(crate) fn store(&self) -> &dyn DocumentStore {
        self.store.as_ref()
    }

    pub(crate) fn cache(&self) -> &Database {
        &self.cache
    }
}
