pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod index;
pub mod logging;
pub mod res;
pub mod rooms;
pub mod session;
pub mod tokens;

use axum::{extract::FromRef, http::{HeaderValue, Method, StatusCode}, response::{IntoResponse, Response}, routing::get, Router};
use sqlx::SqlitePool;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tower_sessions::{cookie::{Key, SameSite}, Expiry, MemoryStore, SessionManagerLayer};
use tracing::info;

use crate::{config::{Config, RealtimeConfig}, rooms::Hubs, tokens::TokenStore};

#[derive(Clone, FromRef)]
pub struct AppState {
    pub db_pool: SqlitePool,
    pub tokens: TokenStore,
    pub hubs: Hubs,
    pub realtime: RealtimeConfig,
}

impl AppState {
    /// Load the rooms and start one hub per room.
    pub async fn build(config: &Config, db_pool: SqlitePool) -> AppResult<AppState> {
        let rooms = db::Room::find_all(&db_pool).await?;
        let hubs = Hubs::spawn_for(&rooms);
        info!(rooms = hubs.len(), "room hubs started");

        Ok(AppState {
            tokens: TokenStore::with_ttl(db_pool.clone(), config.tokens.ttl()),
            db_pool,
            hubs,
            realtime: config.realtime,
        })
    }
}

pub fn router(app_state: AppState, config: &Config) -> AppResult<Router> {
    let key = match &config.session.secret {
        Some(secret) => Key::try_from(secret.as_bytes())
            .map_err(|e| anyhow::anyhow!("invalid session secret: {e}"))?,
        None => Key::generate(),
    };

    let session_layer = SessionManagerLayer::new(MemoryStore::default())
        .with_secure(config.session.secure)
        .with_same_site(SameSite::Lax)
        .with_expiry(Expiry::OnInactivity(time::Duration::minutes(config.session.inactivity_minutes)))
        .with_signed(key);

    let app = Router::new()
        .route("/", get(index::index))
        .merge(auth::router())
        .merge(rooms::router())
        .with_state(app_state)
        .layer(session_layer)
        .layer(TraceLayer::new_for_http());

    if config.server.cors_origins.is_empty() {
        return Ok(app);
    }

    let origins = config
        .server
        .cors_origins
        .iter()
        .map(|origin| origin.parse::<HeaderValue>())
        .collect::<Result<Vec<_>, _>>()?;

    Ok(app.layer(
        CorsLayer::new()
            .allow_methods([Method::GET, Method::POST])
            .allow_credentials(true)
            .allow_origin(origins),
    ))
}


pub type AppResult<T> = Result<T, AppError>;
#[derive(Debug)]
pub struct AppError(pub anyhow::Error);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        tracing::error!(error = %self.0, "request failed");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Something went wrong. Please try again.",
        )
            .into_response()
    }
}

impl From<String> for AppError {
    fn from(err: String) -> Self {
        Self(anyhow::Error::msg(err))
    }
}

impl From<&str> for AppError {
    fn from(err: &str) -> Self {
        Self(anyhow::Error::msg(err.to_owned()))
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self(err)
    }
}

macro_rules! apperr_impl {
    ($E:ty) => {
        impl From<$E> for AppError {
            fn from(err: $E) -> Self {
                Self(anyhow::Error::from(err))
            }
        }
    };
}

apperr_impl!(error::StoreError);
apperr_impl!(sqlx::Error);
apperr_impl!(tower_sessions::session::Error);
apperr_impl!(tokio::task::JoinError);
apperr_impl!(axum::http::header::InvalidHeaderValue);
