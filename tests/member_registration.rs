//! Integration tests for registration, activation and the password grant.

mod common;

use common::TestServer;
use common::server::PASSWORD;
use reqwest::StatusCode;
use serde_json::json;

#[tokio::test]
async fn test_register_then_activate() {
    let server = TestServer::spawn_without_staff(18311)
        .await
        .expect("Failed to spawn test server");
    let client = server.client();

    let reply = client
        .post(
            "/members",
            json!({ "username": "Clem", "email": "clem@example.com", "password": PASSWORD }),
        )
        .await
        .unwrap();
    assert_eq!(reply.status, StatusCode::CREATED);
    assert_eq!(reply.body["username"], "Clem");
    assert_eq!(reply.body["email"], "clem@example.com");
    assert_eq!(reply.body["is_active"], false);
    assert!(reply.body.get("password").is_none());

    let confirmations = server
        .notifications("clem@example.com", "confirmation")
        .unwrap();
    assert_eq!(confirmations.len(), 1);

    // Not active yet.
    let mut member = server.client();
    assert!(member.login("Clem", PASSWORD).await.is_err());

    let token = server.confirmation_token("clem@example.com").unwrap();
    let reply = client
        .post("/members/activation", json!({ "token": token }))
        .await
        .unwrap();
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["is_active"], true);

    member.login("Clem", PASSWORD).await.unwrap();

    // Tokens are single use.
    let reply = client
        .post("/members/activation", json!({ "token": token }))
        .await
        .unwrap();
    assert_eq!(reply.status, StatusCode::NOT_FOUND);

    let reply = client.post_empty("/members/activation").await.unwrap();
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert!(reply.body.get("token").is_some());
}

#[tokio::test]
async fn test_register_with_form_body() {
    let server = TestServer::spawn_without_staff(18312)
        .await
        .expect("Failed to spawn test server");

    let reply = server
        .client()
        .post_form(
            "/members",
            &[
                ("username", "firm staff"),
                ("email", "firm@example.com"),
                ("password", PASSWORD),
            ],
        )
        .await
        .unwrap();
    assert_eq!(reply.status, StatusCode::CREATED);
    assert_eq!(reply.body["username"], "firm staff");
}

#[tokio::test]
async fn test_register_rejections() {
    let server = TestServer::spawn_without_staff(18313)
        .await
        .expect("Failed to spawn test server");
    let client = server.client();

    let reply = client.post_empty("/members").await.unwrap();
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    for field in ["username", "email", "password"] {
        assert!(reply.body.get(field).is_some(), "missing error for {field}");
    }

    let cases = [
        (json!({ "username": "", "email": "a@example.com", "password": PASSWORD }), "username"),
        (json!({ "username": "Clem,Bob", "email": "a@example.com", "password": PASSWORD }), "username"),
        (json!({ "username": " Clem", "email": "a@example.com", "password": PASSWORD }), "username"),
        (json!({ "username": "Clem", "email": "clem@yopmail.com", "password": PASSWORD }), "email"),
        (json!({ "username": "Clem", "email": "not-an-email", "password": PASSWORD }), "email"),
        (json!({ "username": "Clem", "email": "a@example.com" }), "password"),
    ];
    for (body, field) in cases {
        let reply = client.post("/members", body.clone()).await.unwrap();
        assert_eq!(reply.status, StatusCode::BAD_REQUEST, "{body}");
        assert!(reply.body.get(field).is_some(), "{body} -> {}", reply.body);
    }

    let reply = client.post("/members", json!("not an object")).await.unwrap();
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);

    assert!(server.outbox().unwrap().is_empty());
}

#[tokio::test]
async fn test_register_duplicate() {
    let server = TestServer::spawn_without_staff(18314)
        .await
        .expect("Failed to spawn test server");
    server.create_member("Clem").await.unwrap();

    let reply = server
        .client()
        .post(
            "/members",
            json!({ "username": "CLEM", "email": "Clem@Example.com", "password": PASSWORD }),
        )
        .await
        .unwrap();
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert!(reply.body.get("username").is_some());
    assert!(reply.body.get("email").is_some());
}

#[tokio::test]
async fn test_password_grant() {
    let server = TestServer::spawn(18315)
        .await
        .expect("Failed to spawn test server");
    let client = server.client();

    let reply = client
        .post_form(
            "/oauth2/token",
            &[("grant_type", "password"), ("username", "staff"), ("password", "wrong")],
        )
        .await
        .unwrap();
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.body["error"], "invalid_grant");

    let reply = client
        .post_form(
            "/oauth2/token",
            &[("grant_type", "password"), ("username", "staff"), ("password", PASSWORD)],
        )
        .await
        .unwrap();
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["token_type"], "Bearer");
    assert!(reply.body["expires_in"].as_u64().unwrap() > 0);

    let mut stranger = server.client();
    stranger.set_token("forged");
    let reply = stranger.get("/members").await.unwrap();
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
}
