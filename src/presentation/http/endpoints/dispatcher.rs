use std::sync::Arc;

use poem::http::StatusCode;
use poem_openapi::{OpenApi, payload::Json};
use tracing::error;

use crate::{
    domain::{
        errors::DispatcherError,
        models::{DispatchAction, DispatchState},
    },
    presentation::{
        http::{
            endpoints::root::{ApiState, EndpointsTags},
            requests::DispatchControlRequestDto,
            responses::{DispatchControlResponseDto, DispatchStatusDto},
        },
        models::OperationStatusKind,
    },
};

#[derive(Clone)]
pub struct DispatcherEndpoints {
    state: Arc<ApiState>,
}

impl DispatcherEndpoints {
    pub fn new(state: Arc<ApiState>) -> Self {
        Self { state }
    }
}

#[OpenApi]
impl DispatcherEndpoints {
    /// Starts or stops background dispatch. Both actions are idempotent.
    #[oai(path = "/dispatcher", method = "post", tag = EndpointsTags::Dispatcher)]
    pub async fn control(
        &self,
        request: Json<DispatchControlRequestDto>,
    ) -> poem::Result<Json<DispatchControlResponseDto>> {
        let action = DispatchAction::from_str(&request.action)
            .ok_or_else(|| DispatcherError::InvalidAction(request.action.clone()))
            .map_err(control_error)?;

        self.state
            .dispatcher
            .apply(action)
            .await
            .map_err(|err| {
                error!(action = action.as_str(), error = %err, "failed to control dispatcher");
                control_error(err)
            })?;

        let (message, state) = match action {
            DispatchAction::Start => ("Dispatcher started successfully", DispatchState::Running),
            DispatchAction::Stop => ("Dispatcher stopped successfully", DispatchState::Stopped),
        };

        Ok(Json(DispatchControlResponseDto {
            status: OperationStatusKind::Success,
            message: message.to_string(),
            state: state.into(),
        }))
    }

    #[oai(path = "/dispatcher", method = "get", tag = EndpointsTags::Dispatcher)]
    pub async fn status(&self) -> poem::Result<Json<DispatchStatusDto>> {
        let state = self.state.dispatcher.status().await.map_err(|err| {
            error!(error = %err, "failed to read dispatch status");
            control_error(err)
        })?;

        Ok(Json(DispatchStatusDto {
            state: state.into(),
        }))
    }
}

fn control_error(err: DispatcherError) -> poem::Error {
    if err.is_invalid_input() {
        return poem::Error::from_string(err.to_string(), StatusCode::BAD_REQUEST);
    }
    poem::Error::from_string(err.to_string(), StatusCode::INTERNAL_SERVER_ERROR)
}
