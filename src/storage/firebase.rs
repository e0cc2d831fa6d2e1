use crate::domain::{NewMessage, NewSubscriber};
use crate::models::{Message, Subscriber};
use crate::storage::{Store, StoreError};
use anyhow::{Context, anyhow};
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use uuid::Uuid;

// ETag the realtime database reports for a location holding no data.
const EMPTY_LOCATION_ETAG: &str = "null_etag";

/// Hosted realtime database reached over its REST API.
///
/// Subscribers live under `subscribers/<base64url(email)>`, which makes
/// the email the record key. Creation is a conditional `PUT` that only
/// succeeds while the location is empty, so two concurrent subscriptions
/// with the same email cannot both land.
pub struct FirebaseStore {
    http_client: Client,
    base_url: String,
    auth_token: Secret<String>,
}

#[derive(Deserialize)]
struct StoredSubscriber {
    id: Uuid,
    email: String,
    subscribed_at: i64,
}

#[derive(Deserialize)]
struct StoredMessage {
    id: Uuid,
    name: String,
    email: String,
    message: String,
    sent_at: i64,
}

impl TryFrom<StoredSubscriber> for Subscriber {
    type Error = anyhow::Error;

    fn try_from(stored: StoredSubscriber) -> Result<Self, Self::Error> {
        Ok(Self {
            id: stored.id,
            email: stored.email,
            subscribed_at: from_server_timestamp(stored.subscribed_at)?,
        })
    }
}

impl TryFrom<StoredMessage> for Message {
    type Error = anyhow::Error;

    fn try_from(stored: StoredMessage) -> Result<Self, Self::Error> {
        Ok(Self {
            id: stored.id,
            name: stored.name,
            email: stored.email,
            message: stored.message,
            sent_at: from_server_timestamp(stored.sent_at)?,
        })
    }
}

fn from_server_timestamp(milliseconds: i64) -> Result<DateTime<Utc>, anyhow::Error> {
    DateTime::from_timestamp_millis(milliseconds)
        .ok_or_else(|| anyhow!("{} is not a valid server timestamp.", milliseconds))
}

fn server_timestamp() -> serde_json::Value {
    serde_json::json!({ ".sv": "timestamp" })
}

impl FirebaseStore {
    pub fn new(
        base_url: String,
        auth_token: Secret<String>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let http_client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            http_client,
            base_url,
            auth_token,
        })
    }

    fn location(&self, path: &str) -> String {
        format!("{}/{}.json", self.base_url.trim_end_matches('/'), path)
    }

    async fn get_collection<T>(&self, path: &str) -> Result<Vec<T>, anyhow::Error>
    where
        T: for<'de> Deserialize<'de>,
    {
        let records: Option<HashMap<String, T>> = self
            .http_client
            .get(self.location(path))
            .query(&[("auth", self.auth_token.expose_secret())])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(records.map(|r| r.into_values().collect()).unwrap_or_default())
    }
}

#[async_trait]
impl Store for FirebaseStore {
    #[tracing::instrument(name = "Saving new subscriber in the realtime database", skip_all)]
    async fn insert_subscriber(
        &self,
        subscriber: &NewSubscriber,
    ) -> Result<Subscriber, StoreError> {
        let key = URL_SAFE_NO_PAD.encode(subscriber.email.as_ref());
        let response = self
            .http_client
            .put(self.location(&format!("subscribers/{}", key)))
            .query(&[("auth", self.auth_token.expose_secret())])
            .header("if-match", EMPTY_LOCATION_ETAG)
            .json(&serde_json::json!({
                "id": Uuid::new_v4(),
                "email": subscriber.email.as_ref(),
                "subscribed_at": server_timestamp(),
            }))
            .send()
            .await
            .context("Failed to reach the realtime database.")?;

        if response.status() == StatusCode::PRECONDITION_FAILED {
            return Err(StoreError::Conflict);
        }

        let stored: StoredSubscriber = response
            .error_for_status()
            .context("Failed to insert new subscriber.")?
            .json()
            .await
            .context("Failed to decode stored subscriber.")?;

        Ok(Subscriber::try_from(stored)?)
    }

    #[tracing::instrument(name = "Saving new message in the realtime database", skip_all)]
    async fn insert_message(&self, message: &NewMessage) -> Result<Message, StoreError> {
        let id = Uuid::new_v4();
        let stored: StoredMessage = self
            .http_client
            .put(self.location(&format!("messages/{}", id)))
            .query(&[("auth", self.auth_token.expose_secret())])
            .json(&serde_json::json!({
                "id": id,
                "name": message.name.as_ref(),
                "email": message.email.as_ref(),
                "message": message.message.as_ref(),
                "sent_at": server_timestamp(),
            }))
            .send()
            .await
            .context("Failed to reach the realtime database.")?
            .error_for_status()
            .context("Failed to insert new message.")?
            .json()
            .await
            .context("Failed to decode stored message.")?;

        Ok(Message::try_from(stored)?)
    }

    #[tracing::instrument(name = "Listing subscribers from the realtime database", skip_all)]
    async fn list_subscribers(&self) -> Result<Vec<Subscriber>, StoreError> {
        let mut subscribers = self
            .get_collection::<StoredSubscriber>("subscribers")
            .await
            .context("Failed to query subscribers.")?
            .into_iter()
            .map(Subscriber::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        subscribers.sort_by(|a, b| b.subscribed_at.cmp(&a.subscribed_at));

        Ok(subscribers)
    }

    #[tracing::instrument(name = "Listing messages from the realtime database", skip_all)]
    async fn list_messages(&self) -> Result<Vec<Message>, StoreError> {
        let mut messages = self
            .get_collection::<StoredMessage>("messages")
            .await
            .context("Failed to query messages.")?
            .into_iter()
            .map(Message::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        messages.sort_by(|a, b| b.sent_at.cmp(&a.sent_at));

        Ok(messages)
    }

    async fn close(&self) {
        tracing::info!("Realtime database store holds no persistent connections.");
    }
}
