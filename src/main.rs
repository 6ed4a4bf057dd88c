use std::time::Duration;

use chatterbox::{config::Config, db, logging, router, tokens, AppState};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load("config.toml")?;
    logging::init(&config.logging);

    let db_pool = db::connect(&config.database).await?;
    let app_state = AppState::build(&config, db_pool).await.map_err(|e| e.0)?;

    if config.tokens.purge_interval_secs > 0 {
        tokens::spawn_purge(
            app_state.tokens.clone(),
            Duration::from_secs(config.tokens.purge_interval_secs),
        );
    }

    let app = router(app_state, &config).map_err(|e| e.0)?;

    let listener = tokio::net::TcpListener::bind((config.server.host.as_str(), config.server.port)).await?;
    info!(addr = %listener.local_addr()?, "listening");
    axum::serve(listener, app).await?;

    Ok(())
}
