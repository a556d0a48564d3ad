use async_trait::async_trait;
use serde::de::DeserializeOwned;

use crate::config::Config;
use crate::errors::{IngestError, IngestResult};
use crate::gmail_api::auth::{CredentialStore, DelegatedTokenSource, TokenCache};
use crate::types::{HistoryResponse, Message, WatchRequest, WatchResponse};

// Operations the ingestion pipeline needs from the mail provider. Split out
// as a trait so pipeline tests can substitute a scripted implementation.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MailApi: Send + Sync {
    /// Ids of messages added since `start_history_id`, in the order the
    /// provider reports them. An empty window is `Ok(vec![])`, not an error.
    async fn list_history(&self, user: &str, start_history_id: u64) -> IngestResult<Vec<String>>;

    /// Full message resource for a single id.
    async fn get_message(&self, user: &str, message_id: &str) -> IngestResult<Message>;
}

/// Authenticated Gmail REST client.
///
/// One instance owns the connection pool and the per-user token cache and is
/// shared across all concurrent webhook invocations. Dropping it releases
/// both together.
pub struct GmailClient<S = CredentialStore> {
    http: reqwest::Client,
    base_url: String,
    tokens: TokenCache<S>,
}

impl GmailClient<CredentialStore> {
    /// The usual construction path: service-account key from config.
    pub async fn connect(config: &Config) -> IngestResult<Self> {
        let store =
            CredentialStore::from_file(&config.service_account_file, &config.scope).await?;
        Self::with_token_source(config, store)
    }
}

impl<S: DelegatedTokenSource> GmailClient<S> {
    /// Build a client over an explicit token source. Tests substitute a
    /// scripted source here.
    pub fn with_token_source(config: &Config, source: S) -> IngestResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            tokens: TokenCache::new(source),
        })
    }

    /// Register a push watch on the user's mailbox, routing notifications to
    /// the given Pub/Sub topic.
    pub async fn register_watch(
        &self,
        user: &str,
        topic: &str,
        labels: &[String],
    ) -> IngestResult<WatchResponse> {
        let url = format!("{}/users/me/watch", self.base_url);
        let body = WatchRequest {
            label_ids: labels.to_vec(),
            topic_name: topic.to_string(),
        };

        let token = self.tokens.ensure_token(user).await?;
        let response = self
            .http
            .post(&url)
            .bearer_auth(&token)
            .json(&body)
            .send()
            .await?;
        Self::decode_response(response).await
    }

    // Authenticated GET returning the decoded JSON body. Every request gets
    // its token through the cache, so refreshes only happen when needed.
    async fn get_json<T: DeserializeOwned>(&self, user: &str, url: &str) -> IngestResult<T> {
        let token = self.tokens.ensure_token(user).await?;
        let response = self.http.get(url).bearer_auth(&token).send().await?;
        Self::decode_response(response).await
    }

    async fn decode_response<T: DeserializeOwned>(response: reqwest::Response) -> IngestResult<T> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(IngestError::Http { status, body });
        }
        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl<S: DelegatedTokenSource> MailApi for GmailClient<S> {
    async fn list_history(&self, user: &str, start_history_id: u64) -> IngestResult<Vec<String>> {
        let mut message_ids = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut url = format!(
                "{}/users/me/history?startHistoryId={}&historyTypes=messageAdded",
                self.base_url, start_history_id
            );
            if let Some(token) = &page_token {
                url.push_str(&format!("&pageToken={}", token));
            }

            let response: HistoryResponse = self.get_json(user, &url).await?;

            // A missing history list is a legitimately empty window
            for record in response.history.unwrap_or_default() {
                for added in record.messages_added.unwrap_or_default() {
                    if let Some(id) = added.message.id {
                        message_ids.push(id);
                    }
                }
            }

            match response.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        Ok(message_ids)
    }

    async fn get_message(&self, user: &str, message_id: &str) -> IngestResult<Message> {
        let url = format!(
            "{}/users/me/messages/{}?format=full",
            self.base_url, message_id
        );
        self.get_json(user, &url).await
    }
}
