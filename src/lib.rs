//! mailhook: webhook-driven Gmail ingestion via domain-wide delegation
//!
//! Cloud Pub/Sub pushes a notification when a watched mailbox receives new
//! mail; the service mints a delegated access token for the impersonated
//! user, queries the mailbox history since the notified marker, and fetches
//! every newly added message.
//!
//! - [`config`]: environment-driven configuration
//! - [`errors`]: typed failure taxonomy with retryable/terminal split
//! - [`types`]: Pub/Sub envelope and Gmail wire types
//! - [`gmail_api`]: delegated auth, token caching, and the REST client
//! - [`ingestion`]: notification decode and incremental-history fetch pipeline
//! - [`server`]: axum webhook endpoint (204 ack / 500 redeliver contract)
//! - [`cli`]: serve and watch-registration subcommands

pub mod cli;
pub mod config;
pub mod errors;
pub mod gmail_api;
pub mod ingestion;
pub mod server;
pub mod types;
