use std::io::Error;
use std::sync::Arc;
use std::time::Duration;

use poem::{Server, listener::TcpListener};
use tokio::main;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use message_dispatcher::{
    application::{
        handlers::message_dispatcher::{DispatchCycleConfig, MessageDispatchHandler},
        services::dispatcher::Dispatcher,
    },
    config::{Config, LogConfig, LogFormat},
    infrastructure::{
        messaging::webhook::HttpWebhookClient,
        repositories::{
            postgres::{self, PostgresMessageRepository},
            redis::{self, RedisDeliveryCacheRepository, RedisDispatchStatusRepository},
        },
    },
    presentation::http::endpoints::root::{ApiState, build_app},
};

const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

#[main]
async fn main() -> Result<(), Error> {
    let config = Config::try_parse().map_err(Error::other)?;

    init_tracing(&config.log);

    let server_url = format!("{}://{}:{}", config.scheme, config.host, config.port);

    let pool = postgres::connect(&config.database.url, config.database.max_connections)
        .await
        .map_err(|err| Error::other(format!("database: {err:#}")))?;
    let redis_conn = redis::connect(&config.redis.url)
        .await
        .map_err(|err| Error::other(format!("redis: {err:#}")))?;

    let messages = PostgresMessageRepository::new(pool);
    let status_repo =
        RedisDispatchStatusRepository::new(redis_conn.clone(), config.redis.status_key.clone());
    let cache = RedisDeliveryCacheRepository::new(redis_conn, config.redis.sent_prefix.clone());
    let client = HttpWebhookClient::new(&config.webhook)
        .map_err(|err| Error::other(format!("webhook client: {err:#}")))?;

    let handler = Arc::new(MessageDispatchHandler::new(
        messages.clone(),
        cache.clone(),
        client,
        DispatchCycleConfig {
            batch_size: config.dispatch.batch_size,
            delivery_timeout: config.webhook.timeout,
            cache_ttl: config.redis.cache_ttl,
        },
    ));
    let dispatcher = Arc::new(Dispatcher::new(
        status_repo,
        messages,
        cache,
        handler,
        config.dispatch.interval,
    ));

    if config.dispatch.resume_on_boot {
        match dispatcher.resume().await {
            Ok(true) => info!("resumed dispatch from persisted state"),
            Ok(false) => info!("dispatch is stopped, waiting for a start request"),
            Err(err) => error!(error = %err, "could not resume dispatch"),
        }
    }

    let app = build_app(
        Arc::new(ApiState {
            dispatcher: dispatcher.clone(),
        }),
        &server_url,
    );

    info!(url = %server_url, "starting server");

    let result = Server::new(TcpListener::bind(format!("{}:{}", config.host, config.port)))
        .run_with_graceful_shutdown(
            app,
            async {
                let _ = tokio::signal::ctrl_c().await;
                info!("shutdown signal received");
            },
            Some(SHUTDOWN_GRACE),
        )
        .await;

    dispatcher.shutdown().await;
    info!("server stopped");

    result
}

fn init_tracing(config: &LogConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.as_str()));

    match config.format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_current_span(false)
            .init(),
        LogFormat::Pretty => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .init(),
    }
}
