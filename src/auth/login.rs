use axum::{debug_handler, extract::State, response::{Html, IntoResponse, Redirect, Response}, Form};
use serde::Deserialize;
use sqlx::SqlitePool;
use tower_sessions::Session;
use tracing::info;

use crate::{db::User, include_res, res, rooms, session, AppResult};

use super::{password, validation};

const INVALID_CREDENTIALS: &str = "Invalid credentials";

#[derive(Deserialize)]
pub(crate) struct LoginForm {
    login: String,
    password: String,
}

fn login_form(login: &str, error: &str) -> Response {
    Html(
        include_res!(str, "/pages/login.html")
            .replace("{login}", &res::escape(login))
            .replace("{error}", error),
    )
    .into_response()
}

#[debug_handler]
pub(crate) async fn login_page(session: Session) -> AppResult<Response> {
    if session::current_user_id(&session).await?.is_some() {
        return Ok(Redirect::to(&rooms::room_path(rooms::DEFAULT_ROOM_ID)).into_response());
    }

    Ok(login_form("", ""))
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn login(
    State(db_pool): State<SqlitePool>,
    session: Session,

    Form(LoginForm { login, password }): Form<LoginForm>,
) -> AppResult<Response> {
    if session::current_user_id(&session).await?.is_some() {
        return Ok(Redirect::to(&rooms::room_path(rooms::DEFAULT_ROOM_ID)).into_response());
    }

    if validation::login_error(&login).is_some() || validation::password_error(&password).is_some() {
        return Ok(login_form(&login, INVALID_CREDENTIALS));
    }

    let Some(user) = User::find_by_login(&db_pool, &login).await? else {
        return Ok(login_form(&login, INVALID_CREDENTIALS));
    };

    let hash = user.password.clone();
    if !tokio::task::spawn_blocking(move || password::verify(&password, &hash)).await? {
        return Ok(login_form(&login, INVALID_CREDENTIALS));
    }

    session::sign_in(&session, user.id).await?;
    info!(user_id = user.id, "signed in");

    Ok(Redirect::to(&rooms::room_path(rooms::DEFAULT_ROOM_ID)).into_response())
}
