//! Webhook ingestion pipeline
//!
//! Decodes Pub/Sub push notifications and fetches the newly added messages
//! they announce: decode -> list history since the marker -> fetch each
//! added message in provider order. Content parsing and classification
//! happen downstream, not here.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use tracing::{debug, info};

use crate::errors::{IngestError, IngestResult};
use crate::gmail_api::MailApi;
use crate::types::{HistoryNotification, Message, PushEnvelope};

/// Sentinel returned when a message carries no Subject header.
pub const NO_SUBJECT: &str = "[No Subject]";

/// Extract and decode the base64-encoded notification wrapped in the push
/// envelope.
pub fn decode_push_notification(envelope: &PushEnvelope) -> IngestResult<HistoryNotification> {
    let raw = STANDARD.decode(&envelope.message.data).map_err(|e| {
        IngestError::Validation(format!("notification data is not valid base64: {e}"))
    })?;

    serde_json::from_slice(&raw).map_err(|e| {
        IngestError::Validation(format!("notification data is not a history notification: {e}"))
    })
}

/// Fetch every message added since the notification's history marker, in
/// provider order.
///
/// An empty history window is a successful, empty result. A single failed
/// fetch aborts the whole batch; nothing fetched so far is returned.
pub async fn process_notification<A>(
    api: &A,
    notification: &HistoryNotification,
) -> IngestResult<Vec<Message>>
where
    A: MailApi + ?Sized,
{
    let user = notification.email_address.as_str();
    let message_ids = api.list_history(user, notification.history_id).await?;

    if message_ids.is_empty() {
        info!("no new history records for {}", user);
        return Ok(Vec::new());
    }

    let mut messages = Vec::with_capacity(message_ids.len());
    for message_id in &message_ids {
        debug!("fetching new message {}", message_id);
        let message = api.get_message(user, message_id).await?;
        info!("fetched message {}: {}", message_id, extract_subject(&message));
        messages.push(message);
    }

    info!("processed {} new messages for {}", messages.len(), user);
    Ok(messages)
}

/// Entry point for the webhook layer: decode the envelope, then process the
/// notification.
pub async fn process_webhook<A>(api: &A, envelope: &PushEnvelope) -> IngestResult<Vec<Message>>
where
    A: MailApi + ?Sized,
{
    let notification = decode_push_notification(envelope)?;
    info!(
        "processing notification for {} at history {}",
        notification.email_address, notification.history_id
    );
    process_notification(api, &notification).await
}

// Subject header lookup; header names are matched case-insensitively.
pub fn extract_subject(message: &Message) -> String {
    message
        .payload
        .as_ref()
        .and_then(|payload| payload.headers.as_ref())
        .and_then(|headers| {
            headers.iter().find(|h| {
                h.name
                    .as_deref()
                    .map(|name| name.eq_ignore_ascii_case("subject"))
                    .unwrap_or(false)
            })
        })
        .and_then(|h| h.value.clone())
        .unwrap_or_else(|| NO_SUBJECT.to_string())
}
