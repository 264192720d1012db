use std::sync::Arc;

use anyhow::Context;
use axum::http::HeaderValue;
use core_lens::{
    DEFAULT_LOG_SETTINGS, HttpFetcher, JobPipeline, PageAnalyzer, check_non_empty_env_vars, get_api_base_url,
    get_auth_config, get_db_pool, get_fetch_config, get_frontend_origin, setup_logging,
};
use data_model_lens::pg_store::PgStore;

use api_lens::routes;
use api_lens::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    setup_logging(DEFAULT_LOG_SETTINGS);

    check_non_empty_env_vars(&["DATABASE_URL", "TOKEN_SECRET"])?;
    let auth_config = get_auth_config()?;
    let fetch_config = get_fetch_config()?;

    let pool = get_db_pool().await?;
    let store = Arc::new(PgStore::new(pool));

    let fetcher = HttpFetcher::new(&fetch_config).context("Failed to build HTTP client")?;
    let pipeline = JobPipeline::new(store.clone(), PageAnalyzer::new(Arc::new(fetcher)));
    let state = AppState::new(Arc::new(pipeline), store, auth_config);

    let cors_origin = get_frontend_origin()
        .map(|origin| {
            HeaderValue::from_str(&origin).with_context(|| format!("Invalid FRONTEND_ORIGIN: {}", origin))
        })
        .transpose()?;
    if let Some(origin) = &cors_origin {
        tracing::info!("CORS enabled for {:?}", origin);
    }

    let app = routes::router(state, cors_origin);

    let addr = get_api_base_url().context("Invalid HOST or PORT")?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to address: {}", addr))?;
    tracing::info!("Listening on {}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}
