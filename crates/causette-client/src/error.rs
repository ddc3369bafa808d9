use thiserror::Error;

use causette_backend::BackendError;
use causette_store::CacheError;

/// Errors surfaced by client operations.
///
/// None of these are fatal: the session stays open and usable for other
/// conversations after any of them.
#[derive(Error, Debug)]
pub enum ClientError {
    /// Failure at one of the backend seams.
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    /// Failure in the local cache.
    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    /// An operation that needs a signed-in user found none.
    #[error("No signed-in session")]
    NoSession,
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ClientError>;
