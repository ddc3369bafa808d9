//! # causette-store
//!
//! Local cache for the Causette client, backed by SQLite.
//!
//! The backend service owns all chat data; this crate only persists what
//! must survive a restart on this machine: the signed-in session (so the
//! app can restore it on startup) and the local app settings blob.

pub mod database;
pub mod migrations;
pub mod session;
pub mod settings;

mod error;

pub use database::Database;
pub use error::CacheError;
pub use session::CachedSession;
pub use settings::AppSettings;
