mod config;

use tracing::info;

use belay_api::routes::router;
use belay_api::state::AppStateInner;
use belay_api::tokens::TokenIssuer;
use belay_db::Database;

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "belay=debug,tower_http=debug".into()),
        )
        .init();

    let config = Config::from_env()?;

    // Init database
    let db = Database::open(&config.db_path, config.db_timeout)?;

    let tokens = TokenIssuer::new(config.jwt_secret.as_bytes(), config.token_ttl);
    info!("Issuing tokens valid for {} hours", tokens.ttl().num_hours());

    let app = router(AppStateInner::new(db, tokens));

    info!("Belay server listening on {}", config.addr);
    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
