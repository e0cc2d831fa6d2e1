pub mod authentication;
pub mod configuration;
pub mod domain;
pub mod email_client;
pub mod feed;
pub mod models;
pub mod notifications;
pub mod rate_limit;
pub mod routes;
pub mod startup;
pub mod storage;
pub mod telemetry;
pub mod utils;
