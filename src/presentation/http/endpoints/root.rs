use std::sync::Arc;

use poem::Route;
use poem_openapi::{OpenApiService, Tags};

use crate::{
    application::services::dispatcher::Dispatcher,
    presentation::http::endpoints::{
        dispatcher::DispatcherEndpoints, health::HealthEndpoints, messages::MessagesEndpoints,
    },
};

#[derive(Clone)]
pub struct ApiState {
    pub dispatcher: Arc<Dispatcher>,
}

/// Enum of API sections (tags)
#[derive(Tags)]
pub enum EndpointsTags {
    Health,
    Dispatcher,
    Messages,
}

/// API under `/api`, Swagger UI at `/`.
pub fn build_app(state: Arc<ApiState>, server_url: &str) -> Route {
    let api_service = OpenApiService::new(
        (
            HealthEndpoints::new(state.clone()),
            DispatcherEndpoints::new(state.clone()),
            MessagesEndpoints::new(state),
        ),
        "Message Dispatcher API",
        env!("CARGO_PKG_VERSION"),
    )
    .server(format!("{}/api", server_url));
    let ui = api_service.swagger_ui();

    Route::new().nest("/api", api_service).nest("/", ui)
}
