//!
//! The data store seam.
//!
//! The gateway owns no storage logic. It only needs to know that the store is
//! reachable: once at startup, before the listener is bound, and on every health
//! check. Route groups that talk to the store get their own handle from the
//! embedding code.
//!
//! [`PgDataStore`] is the production implementation (feature `postgres`); tests
//! use in-memory fakes.
//!

#[cfg(feature = "postgres")]
mod postgres;
#[cfg(feature = "postgres")]
pub use postgres::PgDataStore;

use {crate::Result, async_trait::async_trait, serde::Serialize};

/// Connectivity reported by the health endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseState {
    Connected,
    Unreachable,
}

#[async_trait]
pub trait DataStore: Send + Sync {
    /// Establishes the first connection. Called exactly once, before the server binds.
    /// An error aborts startup.
    async fn connect(&self) -> Result<()>;

    /// Cheap round-trip used by the health endpoint.
    async fn ping(&self) -> Result<()>;

    /// Short name used in log lines.
    fn name(&self) -> &str {
        "datastore"
    }

    async fn state(&self) -> DatabaseState {
        match self.ping().await {
            Ok(()) => DatabaseState::Connected,
            Err(err) => {
                tracing::warn!(store = self.name(), error = %err, "Data store ping failed");
                DatabaseState::Unreachable
            }
        }
    }
}
