use std::{net::SocketAddr, sync::Arc};

use sqlx::postgres::PgPoolOptions;

use crate::{
    config::Config,
    error::{CacheError, Error, HtmlError, QueryError},
    jwt::SessionKeys,
    postgres::PgStore,
    routes::{api, AppState},
};

async fn connect_cache(url: &str) -> Result<redis::aio::MultiplexedConnection, Error> {
    let client = redis::Client::open(url).map_err(CacheError::from)?;
    let connection = client
        .get_multiplexed_tokio_connection()
        .await
        .map_err(CacheError::from)?;

    Ok(connection)
}

/// Connects the stores and serves the API until Ctrl+C.
pub async fn serve(config: Config) -> Result<(), Error> {
    log::info!("Connecting to database...");
    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(&config.database_url)
        .await
        .map_err(QueryError::from)?;

    let keys = SessionKeys::new(config.session_secret.as_bytes(), config.session_hours)?;
    let mut state = AppState::new(Arc::new(PgStore::new(pool)), keys);

    if let Some(url) = config.redis_url.as_deref() {
        match connect_cache(url).await {
            Ok(cache) => {
                log::info!("Recipe cache connected");
                state = state.with_cache(cache);
            }
            Err(e) => log::warn!("Recipe cache unavailable, continuing without it: {e}"),
        }
    }

    let address = SocketAddr::from(([0, 0, 0, 0], config.port));
    let (bound, server) = warp::serve(api(state))
        .try_bind_with_graceful_shutdown(address, shutdown_signal())
        .map_err(|e| {
            log::error!("Failed to bind {address}: {e}");
            HtmlError::InternalServerError.new("Failed to bind server address")
        })?;
    log::info!("Server running on {bound}");

    server.await;
    log::info!("Server shut down");

    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => log::info!("Received Ctrl+C, shutting down"),
        Err(e) => log::error!("Failed to listen for Ctrl+C: {e}"),
    }
}
