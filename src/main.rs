use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::EnvFilter;

use memberbase::auth::jwt::JwtService;
use memberbase::config::AppConfig;
use memberbase::db;
use memberbase::routes::create_router;
use memberbase::s3;
use memberbase::state::AppState;
use memberbase::storage::S3Storage;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .compact()
        .init();

    let config = AppConfig::from_env().context("failed to load configuration")?;
    info!(
        database_url = %config.redacted_database_url(),
        host = %config.server_host,
        port = config.server_port,
        "starting server"
    );

    let pool = db::init_pool_with_size(&config.database_url, config.database_max_pool_size)
        .context("failed to initialize database pool")?;

    let s3_client = s3::build_client(&config).await?;
    let storage = Arc::new(S3Storage::new(s3_client, config.s3_bucket.clone()));
    let jwt = JwtService::from_config(&config)?;

    let addr = format!("{}:{}", config.server_host, config.server_port);
    let state = AppState::new(pool, config, storage, jwt);
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(%addr, "listening");

    axum::serve(listener, app)
        .await
        .context("server exited with an error")?;

    Ok(())
}
