//! Cookie-backed login state.
//!
//! Only the HTTP pages look at the session. The websocket path authorises
//! every message with a capability token instead.

use tower_sessions::Session;

use crate::AppResult;

pub const USER_ID: &str = "user_id";

/// The logged-in user, if any.
pub async fn current_user_id(session: &Session) -> AppResult<Option<i64>> {
    Ok(session.get::<i64>(USER_ID).await?)
}

pub async fn sign_in(session: &Session, user_id: i64) -> AppResult<()> {
    session.cycle_id().await?;
    session.insert(USER_ID, user_id).await?;
    Ok(())
}

pub async fn sign_out(session: &Session) -> AppResult<()> {
    session.flush().await?;
    Ok(())
}
