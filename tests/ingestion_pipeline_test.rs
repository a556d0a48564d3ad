use std::sync::Arc;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use tokio::sync::RwLock;

use mailhook::errors::{IngestError, IngestResult};
use mailhook::gmail_api::MailApi;
use mailhook::ingestion::{process_notification, process_webhook};
use mailhook::types::{
    Header, HistoryNotification, Message, MessagePart, PushEnvelope, PushMessage,
};

// Mock mail API with scripted results and call tracking
struct ScriptedMailApi {
    // None -> list_history fails with a 500
    history_ids: Option<Vec<String>>,
    // get_message fails for this id
    failing_message_id: Option<String>,
    list_calls: Arc<RwLock<u32>>,
    fetched_ids: Arc<RwLock<Vec<String>>>,
}

impl ScriptedMailApi {
    fn with_history(ids: &[&str]) -> Self {
        Self {
            history_ids: Some(ids.iter().map(|id| id.to_string()).collect()),
            failing_message_id: None,
            list_calls: Arc::new(RwLock::new(0)),
            fetched_ids: Arc::new(RwLock::new(Vec::new())),
        }
    }

    fn with_failing_history() -> Self {
        Self {
            history_ids: None,
            failing_message_id: None,
            list_calls: Arc::new(RwLock::new(0)),
            fetched_ids: Arc::new(RwLock::new(Vec::new())),
        }
    }

    fn failing_on(mut self, message_id: &str) -> Self {
        self.failing_message_id = Some(message_id.to_string());
        self
    }

    async fn list_call_count(&self) -> u32 {
        *self.list_calls.read().await
    }

    async fn fetched(&self) -> Vec<String> {
        self.fetched_ids.read().await.clone()
    }
}

fn server_error() -> IngestError {
    IngestError::Http {
        status: reqwest::StatusCode::INTERNAL_SERVER_ERROR,
        body: "upstream failure".to_string(),
    }
}

fn message_with_subject(id: &str, subject: &str) -> Message {
    Message {
        id: Some(id.to_string()),
        snippet: None,
        payload: Some(MessagePart {
            mime_type: None,
            headers: Some(vec![Header {
                name: Some("Subject".to_string()),
                value: Some(subject.to_string()),
            }]),
            body: None,
            parts: None,
        }),
        thread_id: None,
        label_ids: None,
    }
}

#[async_trait]
impl MailApi for ScriptedMailApi {
    async fn list_history(&self, _user: &str, _start_history_id: u64) -> IngestResult<Vec<String>> {
        *self.list_calls.write().await += 1;
        match &self.history_ids {
            Some(ids) => Ok(ids.clone()),
            None => Err(server_error()),
        }
    }

    async fn get_message(&self, _user: &str, message_id: &str) -> IngestResult<Message> {
        self.fetched_ids.write().await.push(message_id.to_string());
        if self.failing_message_id.as_deref() == Some(message_id) {
            return Err(server_error());
        }
        Ok(message_with_subject(
            message_id,
            &format!("Subject for {}", message_id),
        ))
    }
}

fn notification(user: &str, marker: u64) -> HistoryNotification {
    HistoryNotification {
        email_address: user.to_string(),
        history_id: marker,
    }
}

#[tokio::test]
async fn test_empty_history_returns_empty_list_without_fetches() {
    let api = ScriptedMailApi::with_history(&[]);

    let messages = process_notification(&api, &notification("u@x.com", 42))
        .await
        .unwrap();

    // Success, not failure: nothing to fetch is a valid outcome
    assert!(messages.is_empty());
    assert_eq!(api.list_call_count().await, 1);
    assert!(api.fetched().await.is_empty());
}

#[tokio::test]
async fn test_messages_are_fetched_and_returned_in_provider_order() {
    let api = ScriptedMailApi::with_history(&["m1", "m2"]);

    let messages = process_notification(&api, &notification("u@x.com", 42))
        .await
        .unwrap();

    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].id, Some("m1".to_string()));
    assert_eq!(messages[1].id, Some("m2".to_string()));
    assert_eq!(api.fetched().await, vec!["m1".to_string(), "m2".to_string()]);
}

#[tokio::test]
async fn test_failed_fetch_aborts_batch_with_no_partial_result() {
    let api = ScriptedMailApi::with_history(&["m1", "m2"]).failing_on("m2");

    let result = process_notification(&api, &notification("u@x.com", 42)).await;

    // m1 was fetched before the failure but is discarded with the batch
    let err = result.unwrap_err();
    match err {
        IngestError::Http { status, .. } => {
            assert_eq!(status, reqwest::StatusCode::INTERNAL_SERVER_ERROR)
        }
        other => panic!("expected http error, got {:?}", other),
    }
    assert_eq!(api.fetched().await, vec!["m1".to_string(), "m2".to_string()]);
}

#[tokio::test]
async fn test_history_failure_propagates_before_any_fetch() {
    let api = ScriptedMailApi::with_failing_history();

    let result = process_notification(&api, &notification("u@x.com", 42)).await;

    assert!(result.is_err());
    assert!(api.fetched().await.is_empty());
}

#[tokio::test]
async fn test_process_webhook_decodes_and_fetches_end_to_end() {
    let api = ScriptedMailApi::with_history(&["m1", "m2"]);

    let data = STANDARD.encode(
        serde_json::json!({
            "emailAddress": "u@x.com",
            "historyId": 42,
        })
        .to_string(),
    );
    let envelope = PushEnvelope {
        message: PushMessage {
            data,
            message_id: "pubsub-1".to_string(),
            publish_time: "2025-06-10T14:00:00Z".to_string(),
        },
        subscription: "projects/test/subscriptions/gmail-notifications".to_string(),
    };

    let messages = process_webhook(&api, &envelope).await.unwrap();

    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].id, Some("m1".to_string()));
}
