use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::{
    domain::models::Message,
    presentation::http::responses::{DeliveryRecordDto, MessageDto},
};

pub fn map_message(message: &Message) -> MessageDto {
    MessageDto {
        id: message.id,
        content: message.content.clone(),
        recipient: message.recipient.clone(),
        sent: message.sent,
        sent_at: message.sent_at.map(|at| at.to_rfc3339()),
        delivery_id: message.delivery_id.clone(),
        created_at: message.created_at.to_rfc3339(),
    }
}

/// Newest deliveries first.
pub fn map_deliveries(records: HashMap<String, DateTime<Utc>>) -> Vec<DeliveryRecordDto> {
    let mut records: Vec<(String, DateTime<Utc>)> = records.into_iter().collect();
    records.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    records
        .into_iter()
        .map(|(delivery_id, sent_at)| DeliveryRecordDto {
            delivery_id,
            sent_at: sent_at.to_rfc3339(),
        })
        .collect()
}
