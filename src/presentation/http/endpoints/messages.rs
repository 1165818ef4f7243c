use std::sync::Arc;

use poem::http::StatusCode;
use poem_openapi::{
    OpenApi,
    param::{Path, Query},
    payload::Json,
};
use tracing::error;

use crate::{
    domain::errors::DispatcherError,
    presentation::http::{
        endpoints::root::{ApiState, EndpointsTags},
        mappers::{map_deliveries, map_message},
        responses::{DeliveryRecordDto, MessageDto, SentMessagesDto},
    },
};

#[derive(Clone)]
pub struct MessagesEndpoints {
    state: Arc<ApiState>,
}

impl MessagesEndpoints {
    pub fn new(state: Arc<ApiState>) -> Self {
        Self { state }
    }
}

#[OpenApi]
impl MessagesEndpoints {
    /// Sent messages, most recent first. Invalid `page` falls back to 1 and
    /// invalid `limit` (outside 1..=100) falls back to 10.
    #[oai(path = "/messages/sent", method = "get", tag = EndpointsTags::Messages)]
    pub async fn list_sent(
        &self,
        page: Query<Option<String>>,
        limit: Query<Option<String>>,
    ) -> poem::Result<Json<SentMessagesDto>> {
        let result = self
            .state
            .dispatcher
            .list_sent(parse_number(page.0), parse_number(limit.0))
            .await
            .map_err(|err| {
                error!(error = %err, "failed to list sent messages");
                internal_error(err)
            })?;

        Ok(Json(SentMessagesDto {
            messages: result.messages.iter().map(map_message).collect(),
            count: result.total,
            page: result.page,
            limit: result.limit,
        }))
    }

    #[oai(path = "/messages/:id", method = "get", tag = EndpointsTags::Messages)]
    pub async fn get_message(&self, id: Path<i64>) -> poem::Result<Json<MessageDto>> {
        let message = self
            .state
            .dispatcher
            .message(id.0)
            .await
            .map_err(internal_error)?
            .ok_or_else(|| {
                poem::Error::from_string("message not found", StatusCode::NOT_FOUND)
            })?;

        Ok(Json(map_message(&message)))
    }

    /// Delivery ids currently held by the idempotency cache.
    #[oai(path = "/deliveries", method = "get", tag = EndpointsTags::Messages)]
    pub async fn list_deliveries(&self) -> poem::Result<Json<Vec<DeliveryRecordDto>>> {
        let records = self
            .state
            .dispatcher
            .cached_deliveries()
            .await
            .map_err(|err| {
                error!(error = %err, "failed to list cached deliveries");
                internal_error(err)
            })?;

        Ok(Json(map_deliveries(records)))
    }
}

fn parse_number(value: Option<String>) -> Option<i64> {
    value.and_then(|value| value.trim().parse::<i64>().ok())
}

fn internal_error(err: DispatcherError) -> poem::Error {
    poem::Error::from_string(err.to_string(), StatusCode::INTERNAL_SERVER_ERROR)
}
