//! Multi-store Commerce - order lifecycle and inventory backend

use anyhow::Result;
use multistore_commerce::{
    api::{self, AppState},
    config::Config,
    publisher::EventPublisher,
    repository::PostgresRepository,
    service::CommerceService,
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;
    tracing_subscriber::registry().with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into())).with(tracing_subscriber::fmt::layer()).init();

    let db = PgPoolOptions::new().max_connections(config.database_max_connections).connect(&config.database_url).await?;
    sqlx::migrate!("./migrations").run(&db).await?;

    let nats = match &config.nats_url {
        Some(url) => match async_nats::connect(url.as_str()).await {
            Ok(client) => Some(client),
            Err(e) => {
                tracing::warn!(error = %e, "NATS unavailable, domain events will not be published");
                None
            }
        },
        None => None,
    };

    let commerce = CommerceService::new(Arc::new(PostgresRepository::new(db)), EventPublisher::new(nats));
    let app = api::router(AppState::new(commerce));

    tracing::info!("🚀 Multi-store Commerce listening on 0.0.0.0:{}", config.port);
    axum::serve(tokio::net::TcpListener::bind(("0.0.0.0", config.port)).await?, app).await?;
    Ok(())
}
