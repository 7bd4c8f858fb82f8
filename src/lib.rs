//! SendGrid relay — resolves a provider key from Secret Manager per request
//! and forwards a plain-text email to SendGrid.

pub mod adapters;
pub mod config;
pub mod error;
pub mod mail;
pub mod pipeline;
pub mod request;
pub mod secrets;
