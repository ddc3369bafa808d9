use thiserror::Error;

/// Errors produced by the backend seams.
#[derive(Error, Debug)]
pub enum BackendError {
    /// Explicit lookup of a document that does not exist. Listing and
    /// filtering never produce this; an empty result set is valid.
    #[error("Record not found")]
    NotFound,

    /// The identity provider rejected the credentials or session.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Network or service failure. The session stays usable; the operation
    /// may be retried.
    #[error("Transient backend failure: {0}")]
    Transient(String),

    /// A request the backend cannot represent or accept.
    #[error("Invalid request: {0}")]
    Invalid(String),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, BackendError>;
