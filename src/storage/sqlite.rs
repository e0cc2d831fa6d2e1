use crate::domain::{NewMessage, NewSubscriber};
use crate::models::{Message, Subscriber};
use crate::storage::{Store, StoreError};
use anyhow::Context;
use async_trait::async_trait;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use std::time::Duration;
use uuid::Uuid;

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Opens the database file and brings its schema up to date.
    pub async fn connect(
        database_path: &str,
        create_if_missing: bool,
    ) -> Result<Self, anyhow::Error> {
        let options = SqliteConnectOptions::new()
            .filename(database_path)
            .create_if_missing(create_if_missing)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));
        let pool = SqlitePoolOptions::new()
            .connect_with(options)
            .await
            .with_context(|| format!("Failed to open SQLite database at {}.", database_path))?;
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .context("Failed to migrate the database.")?;

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl Store for SqliteStore {
    #[tracing::instrument(name = "Saving new subscriber in the database", skip_all)]
    async fn insert_subscriber(
        &self,
        subscriber: &NewSubscriber,
    ) -> Result<Subscriber, StoreError> {
        let row = sqlx::query(
            r#"
              INSERT INTO subscribers (id, email)
              VALUES (?, ?)
              RETURNING id, email, subscribed_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(subscriber.email.as_ref())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_error) if db_error.is_unique_violation() => {
                StoreError::Conflict
            }
            e => StoreError::UnexpectedError(
                anyhow::Error::new(e).context("Failed to insert new subscriber."),
            ),
        })?;

        Subscriber::try_from(row)
            .context("Failed to decode stored subscriber.")
            .map_err(StoreError::from)
    }

    #[tracing::instrument(name = "Saving new message in the database", skip_all)]
    async fn insert_message(&self, message: &NewMessage) -> Result<Message, StoreError> {
        let row = sqlx::query(
            r#"
              INSERT INTO messages (id, name, email, message)
              VALUES (?, ?, ?, ?)
              RETURNING id, name, email, message, sent_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(message.name.as_ref())
        .bind(message.email.as_ref())
        .bind(message.message.as_ref())
        .fetch_one(&self.pool)
        .await
        .context("Failed to insert new message.")?;

        Ok(Message::try_from(row).context("Failed to decode stored message.")?)
    }

    #[tracing::instrument(name = "Listing subscribers", skip_all)]
    async fn list_subscribers(&self) -> Result<Vec<Subscriber>, StoreError> {
        let subscribers = sqlx::query(
            r#"
              SELECT id, email, subscribed_at
              FROM subscribers
              ORDER BY subscribed_at DESC, rowid DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to query subscribers.")?
        .into_iter()
        .map(Subscriber::try_from)
        .collect::<Result<Vec<_>, _>>()
        .context("Failed to decode subscribers.")?;

        Ok(subscribers)
    }

    #[tracing::instrument(name = "Listing messages", skip_all)]
    async fn list_messages(&self) -> Result<Vec<Message>, StoreError> {
        let messages = sqlx::query(
            r#"
              SELECT id, name, email, message, sent_at
              FROM messages
              ORDER BY sent_at DESC, rowid DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to query messages.")?
        .into_iter()
        .map(Message::try_from)
        .collect::<Result<Vec<_>, _>>()
        .context("Failed to decode messages.")?;

        Ok(messages)
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}
