//! The `DocumentStore` facade exposed to the host app.
//!
//! Operations are split by concern: documents in `collections`, files in `media` and user
//! accounts in `accounts`. Every call resolves the active connection at call time, so a store
//! created before initialization starts working once a connection is installed.

use std::sync::Arc;

use mongodb::Database;

use crate::connection::{self, Connection};
use crate::error::StoreResult;

/// Facade over the process-wide connection.
#[derive(Debug, Default, uniffi::Object)]
pub struct DocumentStore;

#[uniffi::export]
impl DocumentStore {
    /// Creates a store handle. Cheap; all handles share the process-wide connection.
    #[uniffi::constructor]
    #[must_use]
    #[allow(clippy::missing_const_for_fn)] // constructors are not const across the FFI
    pub fn new() -> Self {
        Self
    }
}

impl DocumentStore {
    #[allow(clippy::unused_self)] // keeps call sites reading as store operations
    pub(crate) fn connection(&self) -> StoreResult<Arc<Connection>> {
        connection::current()
    }

    pub(crate) fn database(&self) -> StoreResult<Database> {
        Ok(self.connection()?.database().clone())
    }
}
