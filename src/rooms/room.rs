use axum::{debug_handler, extract::{Path, State}, response::{Html, IntoResponse, Redirect, Response}};
use sqlx::SqlitePool;
use tower_sessions::Session;

use crate::{db::Room, include_res, res, session, tokens::TokenStore, AppResult};

use super::{DEFAULT_ROOM_ID, room_path, ws_path};

#[debug_handler(state = crate::AppState)]
pub(crate) async fn room(
    State(db_pool): State<SqlitePool>,
    State(tokens): State<TokenStore>,
    session: Session,
    Path(room_id): Path<String>,
) -> AppResult<Response> {
    let Some(user_id) = session::current_user_id(&session).await? else {
        return Ok(Redirect::to("/login").into_response());
    };

    let default_room = Redirect::to(&room_path(DEFAULT_ROOM_ID)).into_response();

    let Ok(room_id) = room_id.parse::<i64>() else {
        return Ok(default_room);
    };

    let Some(room) = Room::find(&db_pool, room_id).await? else {
        if room_id == DEFAULT_ROOM_ID {
            return res::sorry("room");
        }
        return Ok(default_room);
    };

    let mut room_items = String::new();
    for Room { id, name } in Room::find_all(&db_pool).await? {
        room_items += &include_res!(str, "/pages/rooms/room_item.html")
            .replace("{id}", &id.to_string())
            .replace("{name}", &res::escape(&name));
    }

    let token = tokens.mint(room.id, user_id).await?;

    let body = include_res!(str, "/pages/rooms/room.html")
        .replace("{room_id}", &room.id.to_string())
        .replace("{room_name}", &res::escape(&room.name))
        .replace("{ws_path}", &ws_path(room.id))
        .replace("{token}", &token.value)
        .replace("{room_items}", &room_items);

    Ok(Html(body).into_response())
}
