use axum::{debug_handler, response::Redirect};
use tower_sessions::Session;

use crate::{rooms, session, AppResult};

#[debug_handler]
pub async fn index(session: Session) -> AppResult<Redirect> {
    if session::current_user_id(&session).await?.is_none() {
        return Ok(Redirect::to("/login"));
    }

    Ok(Redirect::to(&rooms::room_path(rooms::DEFAULT_ROOM_ID)))
}
