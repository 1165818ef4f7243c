use std::sync::Arc;

use chrono::Utc;
use poem_openapi::{OpenApi, payload::Json};
use tracing::warn;

use crate::presentation::http::{
    endpoints::root::{ApiState, EndpointsTags},
    responses::HealthDto,
};

#[derive(Clone)]
pub struct HealthEndpoints {
    state: Arc<ApiState>,
}

impl HealthEndpoints {
    pub fn new(state: Arc<ApiState>) -> Self {
        Self { state }
    }
}

#[OpenApi]
impl HealthEndpoints {
    /// Liveness probe. Reports the dispatch state as `unknown` when the
    /// status store cannot be read.
    #[oai(path = "/health", method = "get", tag = EndpointsTags::Health)]
    pub async fn health(&self) -> Json<HealthDto> {
        let dispatcher = match self.state.dispatcher.status().await {
            Ok(state) => state.as_str().to_string(),
            Err(err) => {
                warn!(error = %err, "health check could not read dispatch status");
                "unknown".to_string()
            }
        };

        Json(HealthDto {
            status: "ok".to_string(),
            dispatcher,
            time: Utc::now().to_rfc3339(),
        })
    }
}
