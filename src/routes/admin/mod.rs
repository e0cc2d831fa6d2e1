//! Read endpoints for the site owner, behind HTTP basic auth.

pub mod messages;
pub mod subscribers;
