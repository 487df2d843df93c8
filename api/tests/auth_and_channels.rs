mod common;

use axum::http::StatusCode;
use common::{spawn_app, PASSWORD};
use serde_json::json;

#[tokio::test]
async fn test_signup_then_signin() {
    let app = spawn_app().await;
    let token = app.sign_up("trader@example.com").await;

    let (status, me) = app.get("/api/auth/me", &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["data"]["user"]["email"], "trader@example.com");
    assert_eq!(me["data"]["user"]["display_name"], "trader");
    assert!(me["data"]["user"].get("password_hash").is_none());
    // no plan yet
    assert_eq!(me["data"]["channels"].as_array().unwrap().len(), 0);

    let (status, body) = app
        .request(
            "POST",
            "/api/auth/signin",
            None,
            Some(json!({ "email": "TRADER@example.com", "password": PASSWORD })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"]["token"].as_str().unwrap().len() == 64);
}

#[tokio::test]
async fn test_signin_rejects_wrong_password_and_duplicate_signup() {
    let app = spawn_app().await;
    app.sign_up("trader@example.com").await;

    let (status, body) = app
        .request(
            "POST",
            "/api/auth/signin",
            None,
            Some(json!({ "email": "trader@example.com", "password": "nope" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);

    let (status, _) = app
        .request(
            "POST",
            "/api/auth/signup",
            None,
            Some(json!({ "email": "trader@example.com", "password": PASSWORD })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_signout_invalidates_session() {
    let app = spawn_app().await;
    let token = app.sign_up("trader@example.com").await;

    let (status, _) = app.post("/api/auth/signout", &token, json!({})).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app.get("/api/auth/me", &token).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_missing_token_is_unauthorized() {
    let app = spawn_app().await;
    let (status, body) = app.request("GET", "/api/channels", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Missing bearer token");
}

#[tokio::test]
async fn test_plan_gates_channels() {
    let app = spawn_app().await;
    let admin = app.admin().await;
    let user = app.sign_up("trader@example.com").await;

    let (status, _) = app.get("/api/channels/general-chat-2/messages", &user).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (_, users) = app.get("/api/admin/users", &admin).await;
    let user_id = users["data"]
        .as_array()
        .unwrap()
        .iter()
        .find(|u| u["email"] == "trader@example.com")
        .unwrap()["id"]
        .as_i64()
        .unwrap();

    let (status, _) = app
        .request(
            "PUT",
            &format!("/api/admin/users/{}/plan", user_id),
            Some(&admin),
            Some(json!({ "plan": "journal" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    // journal plan: personal journals only
    let (status, _) = app.get("/api/channels/general-chat-2/messages", &user).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, channels) = app.get("/api/channels", &user).await;
    assert_eq!(status, StatusCode::OK);
    let ids: Vec<&str> = channels["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["id"].as_str().unwrap())
        .collect();
    assert!(ids.contains(&"journal"));
    assert!(!ids.contains(&"general-chat-2"));

    app.request(
        "PUT",
        &format!("/api/admin/users/{}/plan", user_id),
        Some(&admin),
        Some(json!({ "plan": "premium" })),
    )
    .await;
    let (status, _) = app.get("/api/channels/general-chat-2/messages", &user).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_admin_routes_reject_members() {
    let app = spawn_app().await;
    let user = app.sign_up("trader@example.com").await;
    let (status, _) = app.get("/api/admin/users", &user).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_messages_and_reactions() {
    let app = spawn_app().await;
    let admin = app.admin().await;

    let (status, created) = app
        .post(
            "/api/channels/fondamentaux/messages",
            &admin,
            json!({ "content": "**Support** at 18000" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let id = created["data"]["id"].as_i64().unwrap();
    assert_eq!(created["data"]["author_type"], "admin");
    assert!(created["data"]["content_html"]
        .as_str()
        .unwrap()
        .contains("<strong>Support</strong>"));
    assert_eq!(app.state.hub.last_seq("channel:fondamentaux").await, 1);

    let uri = format!("/api/messages/{}/reactions", id);
    let (_, first) = app.post(&uri, &admin, json!({ "emoji": "🔥" })).await;
    assert_eq!(first["data"]["reacted"], true);
    assert_eq!(first["data"]["reactions"][0]["count"], 1);
    assert_eq!(first["data"]["reactions"][0]["reacted"], true);

    let (_, second) = app.post(&uri, &admin, json!({ "emoji": "🔥" })).await;
    assert_eq!(second["data"]["reacted"], false);
    assert_eq!(second["data"]["reactions"].as_array().unwrap().len(), 0);

    let (_, tail) = app.get("/api/channels/fondamentaux/messages", &admin).await;
    assert_eq!(tail["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_message_tail_is_oldest_first() {
    let app = spawn_app().await;
    let admin = app.admin().await;
    for text in ["one", "two", "three"] {
        app.post("/api/channels/fondamentaux/messages", &admin, json!({ "content": text }))
            .await;
    }

    let (_, tail) = app.get("/api/channels/fondamentaux/messages?limit=2", &admin).await;
    let contents: Vec<&str> = tail["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["content"].as_str().unwrap())
        .collect();
    assert_eq!(contents, vec!["two", "three"]);
}

#[tokio::test]
async fn test_members_cannot_edit_others_messages() {
    let app = spawn_app().await;
    let admin = app.admin().await;
    let (_, created) = app
        .post("/api/channels/fondamentaux/messages", &admin, json!({ "content": "hello" }))
        .await;
    let id = created["data"]["id"].as_i64().unwrap();

    let user = app.sign_up("trader@example.com").await;
    let (_, users) = app.get("/api/admin/users", &admin).await;
    let user_id = users["data"][1]["id"].as_i64().unwrap();
    app.request(
        "PUT",
        &format!("/api/admin/users/{}/plan", user_id),
        Some(&admin),
        Some(json!({ "plan": "premium" })),
    )
    .await;

    let (status, _) = app
        .request("DELETE", &format!("/api/messages/{}", id), Some(&user), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_chat_token_endpoints() {
    let app = spawn_app().await;

    let (status, body) = app.request("GET", "/get-token", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "error": "userId requis" }));

    let (status, body) = app.request("GET", "/get-token?userId=alice", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["userId"], "alice");
    assert_eq!(body["apiKey"], "test-key");
    assert_eq!(body["token"].as_str().unwrap().split('.').count(), 3);

    let (status, body) = app.request("GET", "/test", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "OK");
    assert_eq!(body["apiKey"], "test-key");
}

#[tokio::test]
async fn test_health_reports_database() {
    let app = spawn_app().await;
    let (status, body) = app.request("GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["database"], "ok");
    assert_eq!(body["push_provider"], "recording");
}
