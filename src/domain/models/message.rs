use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An outbound message as persisted by the message store.
///
/// `sent`, `sent_at` and `delivery_id` move together: a message is sent
/// exactly when both the timestamp and the delivery id are present.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    pub id: i64,
    pub content: String,
    pub recipient: String,
    pub sent: bool,
    pub sent_at: Option<DateTime<Utc>>,
    pub delivery_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// Delivery id left on the record by an earlier attempt, if any.
    pub fn prior_delivery_id(&self) -> Option<&str> {
        self.delivery_id
            .as_deref()
            .filter(|delivery_id| !delivery_id.trim().is_empty())
    }

    pub fn is_consistent(&self) -> bool {
        self.sent == (self.sent_at.is_some() && self.prior_delivery_id().is_some())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewMessage {
    pub content: String,
    pub recipient: String,
}

impl NewMessage {
    pub fn new(content: impl Into<String>, recipient: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            recipient: recipient.into(),
        }
    }
}

/// One page of sent messages together with the total number of sent messages.
#[derive(Debug, Clone)]
pub struct SentMessagesPage {
    pub messages: Vec<Message>,
    pub total: u64,
    pub page: u32,
    pub limit: u32,
}
