//! Gmail API module split into logical submodules
//!
//! - auth: service-account delegation and per-user token caching
//! - client: authenticated REST calls (history, messages, watch)

pub mod auth;
pub mod client;

pub use auth::{CachedToken, CredentialStore, DelegatedTokenSource, TokenCache};
pub use client::{GmailClient, MailApi};
