use axum::{debug_handler, extract::State, response::Redirect};
use tower_sessions::Session;
use tracing::info;

use crate::{session, tokens::TokenStore, AppResult};

/// Sign out and invalidate every token the user still holds.
#[debug_handler(state = crate::AppState)]
pub(crate) async fn logout(
    State(tokens): State<TokenStore>,
    session: Session,
) -> AppResult<Redirect> {
    if let Some(user_id) = session::current_user_id(&session).await? {
        tokens.revoke_for_user(user_id).await?;
        info!(user_id, "signed out");
    }

    session::sign_out(&session).await?;
    Ok(Redirect::to("/login"))
}
