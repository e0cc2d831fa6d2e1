pub mod admin;
pub mod contact;
pub mod fetch_feed;
pub mod health_check;
pub mod subscribe;
