//! Helpers shared by the end-to-end tests.

#![allow(dead_code)]

use std::time::Duration;

use axum::{http::StatusCode, Router};
use axum_test::{TestServer, TestWebSocket};
use chatterbox::{
    auth::password,
    config::Config,
    db::{self, Room, User},
    rooms::{Hubs, Outbound},
    router, AppState,
};
use sqlx::SqlitePool;
use tokio::time::timeout;

pub const PASSWORD: &str = "correct horse battery";
pub const WAIT: Duration = Duration::from_secs(3);

pub struct TestApp {
    pub router: Router,
    pub db_pool: SqlitePool,
    pub hubs: Hubs,
}

/// App over an in-memory database with rooms 1 (General) and 2 (Random).
pub async fn test_app() -> TestApp {
    let db_pool = db::connect_in_memory().await.unwrap();
    Room::insert(&db_pool, 2, "Random").await.unwrap();

    let config = Config::default();
    let app_state = AppState::build(&config, db_pool.clone()).await.unwrap();
    let hubs = app_state.hubs.clone();

    TestApp {
        router: router(app_state, &config).unwrap(),
        db_pool,
        hubs,
    }
}

/// A browser: its own cookie jar, real HTTP so websockets work.
pub fn client(app: &TestApp) -> TestServer {
    TestServer::builder()
        .save_cookies()
        .http_transport()
        .build(app.router.clone())
        .unwrap()
}

pub async fn create_user(app: &TestApp, login: &str) -> i64 {
    let hash = password::hash(PASSWORD).unwrap();
    User::insert(&app.db_pool, login, &format!("{login}@example.com"), &hash)
        .await
        .unwrap()
}

pub async fn sign_in(server: &TestServer, login: &str) {
    server
        .post("/login")
        .form(&[("login", login), ("password", PASSWORD)])
        .await
        .assert_status(StatusCode::SEE_OTHER);
}

/// Open the room page and pull the embedded token out of it.
pub async fn room_token(server: &TestServer, room_id: i64) -> String {
    let page = server.get(&format!("/room/{room_id}")).await;
    page.assert_status_ok();
    token_from_page(&page.text())
}

pub fn token_from_page(page: &str) -> String {
    let start = page.find("data-token=\"").expect("no token in page") + "data-token=\"".len();
    let end = start + page[start..].find('"').unwrap();
    page[start..end].to_string()
}

pub async fn connect(server: &TestServer, room_id: i64) -> TestWebSocket {
    server
        .get_websocket(&format!("/ws/{room_id}"))
        .await
        .into_websocket()
        .await
}

/// Block until the room's hub has registered `count` connections.
pub async fn wait_for_members(app: &TestApp, room_id: i64, count: usize) {
    let hub = app.hubs.get(room_id).unwrap();
    timeout(WAIT, async {
        while hub.member_count().await != Some(count) {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("room never reached expected membership");
}

pub async fn say(socket: &mut TestWebSocket, token: &str, content: &str) {
    socket
        .send_text(serde_json::json!({"Token": token, "Content": content}).to_string())
        .await;
}

pub async fn hear(socket: &mut TestWebSocket) -> Outbound {
    timeout(WAIT, socket.receive_json::<Outbound>())
        .await
        .expect("no broadcast received")
}

pub fn from(login: &str, content: &str) -> Outbound {
    Outbound {
        login: login.to_string(),
        content: content.to_string(),
    }
}
