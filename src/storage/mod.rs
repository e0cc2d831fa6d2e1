//! Persistence for subscribers and contact messages.
//!
//! Handlers only see the [`Store`] trait. Two backends implement it:
//! an embedded SQLite database and a hosted realtime database reached
//! over its REST API.

mod firebase;
mod sqlite;

pub use firebase::FirebaseStore;
pub use sqlite::SqliteStore;

use crate::configuration::StorageSettings;
use crate::domain::{NewMessage, NewSubscriber};
use crate::models::{Message, Subscriber};
use crate::utils::error_chain_fmt;
use async_trait::async_trait;
use std::sync::Arc;

#[async_trait]
pub trait Store: Send + Sync {
    /// Inserts a subscriber, failing with [`StoreError::Conflict`] if the
    /// email is already stored. The check and the write are a single
    /// atomic operation on the backend.
    async fn insert_subscriber(&self, subscriber: &NewSubscriber)
    -> Result<Subscriber, StoreError>;

    /// Appends a contact message.
    async fn insert_message(&self, message: &NewMessage) -> Result<Message, StoreError>;

    /// All subscribers, most recent first.
    async fn list_subscribers(&self) -> Result<Vec<Subscriber>, StoreError>;

    /// All messages, most recent first.
    async fn list_messages(&self) -> Result<Vec<Message>, StoreError>;

    /// Releases the backend's resources. Called once at shutdown.
    async fn close(&self);
}

#[derive(thiserror::Error)]
pub enum StoreError {
    #[error("A record with the same unique key already exists.")]
    Conflict,
    #[error(transparent)]
    UnexpectedError(#[from] anyhow::Error),
}

impl std::fmt::Debug for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

/// Builds the backend selected in configuration, ready to serve requests.
pub async fn build_store(settings: StorageSettings) -> Result<Arc<dyn Store>, anyhow::Error> {
    let store: Arc<dyn Store> = match settings {
        StorageSettings::Sqlite {
            database_path,
            create_if_missing,
        } => Arc::new(SqliteStore::connect(&database_path, create_if_missing).await?),
        StorageSettings::Firebase {
            base_url,
            auth_token,
            timeout_milliseconds,
        } => Arc::new(FirebaseStore::new(
            base_url,
            auth_token,
            std::time::Duration::from_millis(timeout_milliseconds),
        )?),
    };

    Ok(store)
}
