mod middleware;

pub use middleware::{AdminApiKey, reject_unauthorized_admins};

use actix_web::http::header::{AUTHORIZATION, HeaderMap};
use anyhow::Context;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use secrecy::{ExposeSecret, Secret};

pub const ADMIN_USERNAME: &str = "admin";

#[derive(Debug)]
pub struct Credentials {
    pub username: String,
    pub password: Secret<String>,
}

#[derive(thiserror::Error, Debug)]
pub enum AuthError {
    #[error("Invalid username or password.")]
    InvalidCredentials,
    #[error("{0}")]
    MalformedCredentials(#[from] anyhow::Error),
}

/// Extracts `username:password` from an `Authorization: Basic` header.
pub fn basic_authentication(headers: &HeaderMap) -> Result<Credentials, anyhow::Error> {
    let header_value = headers
        .get(AUTHORIZATION)
        .context("The 'Authorization' header was missing.")?
        .to_str()
        .context("The 'Authorization' header was not a valid UTF8 string.")?;
    let base64encoded_segment = header_value
        .strip_prefix("Basic ")
        .context("The authorization scheme was not 'Basic'.")?;
    let decoded_bytes = STANDARD
        .decode(base64encoded_segment.trim())
        .context("Failed to base64-decode 'Basic' credentials.")?;
    let decoded_credentials = String::from_utf8(decoded_bytes)
        .context("The decoded credential string is not valid UTF8.")?;

    // Passwords may contain ':', usernames may not.
    let (username, password) = decoded_credentials
        .split_once(':')
        .context("A password must be provided in 'Basic' auth.")?;

    Ok(Credentials {
        username: username.to_string(),
        password: Secret::new(password.to_string()),
    })
}

pub fn validate_credentials(
    credentials: &Credentials,
    admin_api_key: &Secret<String>,
) -> Result<(), AuthError> {
    let username_matches = credentials.username == ADMIN_USERNAME;
    let password_matches = constant_time_eq(
        credentials.password.expose_secret().as_bytes(),
        admin_api_key.expose_secret().as_bytes(),
    );

    if username_matches && password_matches {
        Ok(())
    } else {
        Err(AuthError::InvalidCredentials)
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
