use axum::{debug_handler, extract::State, response::{Html, IntoResponse, Redirect, Response}, Form};
use serde::Deserialize;
use sqlx::SqlitePool;
use tower_sessions::Session;
use tracing::info;

use crate::{db::User, error::StoreError, include_res, res, rooms, session, AppResult};

use super::{password, validation};

const LOGIN_TAKEN: &str = "Given login is already taken. Please choose another one";
const EMAIL_TAKEN: &str = "Given email is already taken. Please choose another one";

#[derive(Deserialize)]
pub(crate) struct RegistrationForm {
    login: String,
    email: String,
    password: String,
    repeated_password: String,
}

#[derive(Default)]
struct FormErrors {
    login: Option<&'static str>,
    email: Option<&'static str>,
    password: Option<&'static str>,
}

impl FormErrors {
    fn is_empty(&self) -> bool {
        self.login.is_none() && self.email.is_none() && self.password.is_none()
    }
}

async fn form_errors(db_pool: &SqlitePool, form: &RegistrationForm) -> AppResult<FormErrors> {
    let mut errors = FormErrors::default();

    errors.login = validation::login_error(&form.login);
    if errors.login.is_none() && User::login_taken(db_pool, &form.login).await? {
        errors.login = Some(LOGIN_TAKEN);
    }

    errors.email = validation::email_error(&form.email);
    if errors.email.is_none() && User::email_taken(db_pool, &form.email).await? {
        errors.email = Some(EMAIL_TAKEN);
    }

    errors.password = validation::password_error(&form.password);
    if errors.password.is_none() && form.password != form.repeated_password {
        errors.password = Some("Both passwords must be the same");
    }

    Ok(errors)
}

async fn conflict_errors(db_pool: &SqlitePool, form: &RegistrationForm) -> AppResult<FormErrors> {
    let email_taken = User::email_taken(db_pool, &form.email).await?;
    let login_taken = User::login_taken(db_pool, &form.login).await?;

    Ok(FormErrors {
        login: (login_taken || !email_taken).then_some(LOGIN_TAKEN),
        email: email_taken.then_some(EMAIL_TAKEN),
        password: None,
    })
}

fn registration_form(login: &str, email: &str, errors: &FormErrors) -> Response {
    Html(
        include_res!(str, "/pages/register.html")
            .replace("{login}", &res::escape(login))
            .replace("{email}", &res::escape(email))
            .replace("{login_error}", errors.login.unwrap_or_default())
            .replace("{email_error}", errors.email.unwrap_or_default())
            .replace("{password_error}", errors.password.unwrap_or_default()),
    )
    .into_response()
}

#[debug_handler]
pub(crate) async fn register_page(session: Session) -> AppResult<Response> {
    if session::current_user_id(&session).await?.is_some() {
        return Ok(Redirect::to(&rooms::room_path(rooms::DEFAULT_ROOM_ID)).into_response());
    }

    Ok(registration_form("", "", &FormErrors::default()))
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn register(
    State(db_pool): State<SqlitePool>,
    session: Session,

    Form(form): Form<RegistrationForm>,
) -> AppResult<Response> {
    if session::current_user_id(&session).await?.is_some() {
        return Ok(Redirect::to(&rooms::room_path(rooms::DEFAULT_ROOM_ID)).into_response());
    }

    let errors = form_errors(&db_pool, &form).await?;
    if !errors.is_empty() {
        return Ok(registration_form(&form.login, &form.email, &errors));
    }

    let password = form.password.clone();
    let hash = tokio::task::spawn_blocking(move || password::hash(&password)).await??;

    match User::insert(&db_pool, &form.login, &form.email, &hash).await {
        Ok(user_id) => info!(user_id, login = %form.login, "registered"),
        // lost a race with a concurrent registration
        Err(StoreError::Database(e))
            if e.as_database_error().is_some_and(|e| e.is_unique_violation()) =>
        {
            let errors = conflict_errors(&db_pool, &form).await?;
            return Ok(registration_form(&form.login, &form.email, &errors));
        }
        Err(e) => return Err(e.into()),
    }

    Ok(Redirect::to("/login").into_response())
}
