//! Registration and login through the HTTP forms.

mod common;

use axum::http::StatusCode;
use chatterbox::db::User;
use common::*;

fn registration<'a>(login: &'a str, email: &'a str, password: &'a str, repeated: &'a str) -> [(&'a str, &'a str); 4] {
    [
        ("login", login),
        ("email", email),
        ("password", password),
        ("repeated_password", repeated),
    ]
}

#[tokio::test]
async fn test_register_then_login() {
    let app = test_app().await;
    let browser = client(&app);

    browser.get("/register").await.assert_status_ok();

    let response = browser
        .post("/register")
        .form(&registration("alice", "alice@example.com", PASSWORD, PASSWORD))
        .await;
    response.assert_status(StatusCode::SEE_OTHER);
    assert_eq!(response.header("location"), "/login");

    let user = User::find_by_login(&app.db_pool, "alice").await.unwrap().unwrap();
    assert!(user.password.starts_with("$argon2"));
    assert_ne!(user.password, PASSWORD);

    sign_in(&browser, "alice").await;

    let response = browser.get("/").await;
    response.assert_status(StatusCode::SEE_OTHER);
    assert_eq!(response.header("location"), "/room/1");

    let response = browser.get("/login").await;
    response.assert_status(StatusCode::SEE_OTHER);
}

#[tokio::test]
async fn test_register_reports_field_errors() {
    let app = test_app().await;
    create_user(&app, "alice").await;
    let browser = client(&app);

    let response = browser
        .post("/register")
        .form(&registration("alice", "bad", "short", "short"))
        .await;
    response.assert_status_ok();
    let page = response.text();
    assert!(page.contains("Given login is already taken"));
    assert!(page.contains("Email must be at least 7 characters long"));
    assert!(page.contains("Password must be at least 12 characters long"));

    let response = browser
        .post("/register")
        .form(&registration("bob", "bob@example.com", PASSWORD, "something else entirely"))
        .await;
    response.assert_status_ok();
    assert!(response.text().contains("Both passwords must be the same"));

    assert!(User::find_by_login(&app.db_pool, "bob").await.unwrap().is_none());
}

#[tokio::test]
async fn test_login_rejects_bad_credentials() {
    let app = test_app().await;
    create_user(&app, "alice").await;
    let browser = client(&app);

    for (login, password) in [("alice", "wrong password!!"), ("nobody", PASSWORD), ("a", "x")] {
        let response = browser
            .post("/login")
            .form(&[("login", login), ("password", password)])
            .await;
        response.assert_status_ok();
        assert!(response.text().contains("Invalid credentials"));
    }

    let response = browser.get("/").await;
    assert_eq!(response.header("location"), "/login");
}
