use poem_openapi::Object;

use crate::presentation::models::{DispatchStateKind, OperationStatusKind};

#[derive(Object)]
pub struct DispatchControlResponseDto {
    pub status: OperationStatusKind,
    pub message: String,
    pub state: DispatchStateKind,
}

#[derive(Object)]
pub struct DispatchStatusDto {
    pub state: DispatchStateKind,
}

#[derive(Object)]
pub struct MessageDto {
    pub id: i64,
    pub content: String,
    pub recipient: String,
    pub sent: bool,
    pub sent_at: Option<String>,
    pub delivery_id: Option<String>,
    pub created_at: String,
}

#[derive(Object)]
pub struct SentMessagesDto {
    pub messages: Vec<MessageDto>,
    pub count: u64,
    pub page: u32,
    pub limit: u32,
}

#[derive(Object)]
pub struct DeliveryRecordDto {
    pub delivery_id: String,
    pub sent_at: String,
}

#[derive(Object)]
pub struct HealthDto {
    pub status: String,
    pub dispatcher: String,
    pub time: String,
}
