use serde::{Deserialize, Serialize};

// --- Pub/Sub push envelope ---

/// Push-notification request body delivered by Cloud Pub/Sub.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushEnvelope {
    pub message: PushMessage,
    pub subscription: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushMessage {
    /// Base64-encoded JSON notification payload.
    pub data: String,
    #[serde(rename = "messageId")]
    pub message_id: String,
    #[serde(rename = "publishTime")]
    pub publish_time: String,
}

/// Decoded Gmail notification: which mailbox changed and from which point
/// in history to query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryNotification {
    #[serde(rename = "emailAddress")]
    pub email_address: String,
    #[serde(rename = "historyId")]
    pub history_id: u64,
}

// --- Gmail history resources ---

#[derive(Debug, Deserialize)]
pub struct HistoryResponse {
    pub history: Option<Vec<HistoryRecord>>,
    #[serde(rename = "historyId")]
    pub history_id: Option<String>,
    #[serde(rename = "nextPageToken")]
    pub next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct HistoryRecord {
    #[serde(rename = "messagesAdded")]
    pub messages_added: Option<Vec<MessageAdded>>,
}

#[derive(Debug, Deserialize)]
pub struct MessageAdded {
    pub message: MessageRef,
}

#[derive(Debug, Deserialize)]
pub struct MessageRef {
    pub id: Option<String>,
}

// --- Gmail message resources ---

#[derive(Debug, Deserialize, Clone)]
pub struct Message {
    pub id: Option<String>,
    pub snippet: Option<String>,
    pub payload: Option<MessagePart>,
    #[serde(rename = "threadId")]
    pub thread_id: Option<String>,
    #[serde(rename = "labelIds")]
    pub label_ids: Option<Vec<String>>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MessagePart {
    #[serde(rename = "mimeType")]
    pub mime_type: Option<String>,
    pub headers: Option<Vec<Header>>,
    pub body: Option<MessagePartBody>,
    pub parts: Option<Vec<MessagePart>>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Header {
    pub name: Option<String>,
    pub value: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MessagePartBody {
    pub data: Option<String>,
}

// --- Watch registration ---

#[derive(Debug, Serialize)]
pub struct WatchRequest {
    #[serde(rename = "labelIds")]
    pub label_ids: Vec<String>,
    #[serde(rename = "topicName")]
    pub topic_name: String,
}

#[derive(Debug, Deserialize)]
pub struct WatchResponse {
    #[serde(rename = "historyId")]
    pub history_id: String,
    pub expiration: String,
}
