use crate::domain::EmailAddress;
use crate::email_client::EmailClient;
use crate::rate_limit::SlidingWindowLimiter;
use secrecy::{ExposeSecret, Secret};
use serde_aux::field_attributes::deserialize_number_from_string;
use std::time::Duration;

#[derive(serde::Deserialize, Clone, Debug)]
pub struct Settings {
    pub application: ApplicationSettings,
    pub storage: StorageSettings,
    pub email_client: EmailClientSettings,
    pub feed: FeedSettings,
    pub rate_limit: RateLimitSettings,
}

#[derive(serde::Deserialize, Clone, Debug)]
pub struct ApplicationSettings {
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub port: u16,
    pub host: String,
    pub admin_api_key: Secret<String>,
}

#[derive(serde::Deserialize, Clone, Debug)]
#[serde(tag = "backend", rename_all = "snake_case")]
pub enum StorageSettings {
    Sqlite {
        database_path: String,
        create_if_missing: bool,
    },
    Firebase {
        base_url: String,
        auth_token: Secret<String>,
        #[serde(deserialize_with = "deserialize_number_from_string")]
        timeout_milliseconds: u64,
    },
}

#[derive(serde::Deserialize, Clone, Debug)]
pub struct EmailClientSettings {
    pub base_url: String,
    pub sender_email: EmailAddress,
    pub admin_email: EmailAddress,
    pub authorization_token: Secret<String>,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub timeout_milliseconds: u64,
}

impl EmailClientSettings {
    pub fn client(self) -> Result<EmailClient, reqwest::Error> {
        let timeout = self.timeout();
        EmailClient::new(
            self.base_url,
            self.sender_email,
            self.authorization_token,
            timeout,
        )
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_milliseconds)
    }
}

#[derive(serde::Deserialize, Clone, Debug)]
pub struct FeedSettings {
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub cache_ttl_milliseconds: u64,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub cache_max_capacity: u64,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub timeout_milliseconds: u64,
}

impl FeedSettings {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_millis(self.cache_ttl_milliseconds)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_milliseconds)
    }
}

#[derive(serde::Deserialize, Clone, Debug)]
pub struct RateLimitSettings {
    pub subscribe: RateLimitRule,
    pub contact: RateLimitRule,
}

#[derive(serde::Deserialize, Clone, Debug)]
pub struct RateLimitRule {
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub max_requests: usize,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub window_seconds: u64,
}

impl RateLimitRule {
    pub fn limiter(&self) -> SlidingWindowLimiter {
        SlidingWindowLimiter::new(self.max_requests, Duration::from_secs(self.window_seconds))
    }
}

impl Settings {
    /// Secrets have no usable default: an empty value is as fatal as a missing one.
    pub fn validate(self) -> Result<Self, String> {
        let mut missing = vec![];

        if self.application.admin_api_key.expose_secret().trim().is_empty() {
            missing.push("application.admin_api_key");
        }
        if self
            .email_client
            .authorization_token
            .expose_secret()
            .trim()
            .is_empty()
        {
            missing.push("email_client.authorization_token");
        }
        if let StorageSettings::Firebase { auth_token, .. } = &self.storage {
            if auth_token.expose_secret().trim().is_empty() {
                missing.push("storage.auth_token");
            }
        }

        if missing.is_empty() {
            Ok(self)
        } else {
            Err(format!(
                "Missing required configuration values: {}.",
                missing.join(", ")
            ))
        }
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.application.host, self.application.port)
    }
}

pub fn get_configuration() -> Result<Settings, config::ConfigError> {
    let base_path = std::env::current_dir().map_err(|e| {
        config::ConfigError::Message(format!("Failed to determine the current directory: {}", e))
    })?;
    let configuration_directory = base_path.join("configuration");

    // Detect the running environment.
    // Default to `local` if unspecified.
    let environment: Environment = std::env::var("APP_ENVIRONMENT")
        .unwrap_or_else(|_| "local".into())
        .try_into()
        .map_err(config::ConfigError::Message)?;
    let environment_filename = format!("{}.yaml", environment.as_str());
    let builder = config::Config::builder()
        .add_source(config::File::from(
            configuration_directory.join("base.yaml"),
        ))
        .add_source(config::File::from(
            configuration_directory.join(environment_filename),
        ))
        // Add in settings from environment variables (with a prefix of APP and '__' as separator)
        // E.g. `APP_APPLICATION__PORT=5001 would set `Settings.application.port`
        .add_source(
            config::Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__"),
        );

    load(builder)
}

/// Deserializes the layered sources and rejects unusable values.
fn load(
    builder: config::ConfigBuilder<config::builder::DefaultState>,
) -> Result<Settings, config::ConfigError> {
    builder
        .build()?
        .try_deserialize::<Settings>()?
        .validate()
        .map_err(config::ConfigError::Message)
}

/// The possible runtime environment for our application.
#[derive(Debug)]
pub enum Environment {
    Local,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Local => "local",
            Environment::Production => "production",
        }
    }
}

impl TryFrom<String> for Environment {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.to_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "production" => Ok(Self::Production),
            other => Err(format!(
                "{} is not a supported environment. Use either `local` or `production`.",
                other
            )),
        }
    }
}
