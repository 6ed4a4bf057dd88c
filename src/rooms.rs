mod deny;
mod hub;
mod msg;
mod registry;
mod room;
mod ws;

use axum::{routing::get, Router};

use crate::AppState;

pub use deny::{closing_frame, Exit};
pub use hub::{HubHandle, Hubs, RoomHub};
pub use msg::{Inbound, Outbound};
pub use registry::{ConnectionId, Outbox};

pub const DEFAULT_ROOM_ID: i64 = 1;

pub fn room_path(room_id: i64) -> String {
    format!("/room/{room_id}")
}

pub fn ws_path(room_id: i64) -> String {
    format!("/ws/{room_id}")
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/room/{room_id}", get(room::room))
        .route("/ws/{room_id}", get(ws::room_ws))
}
