mod common;

use axum::http::StatusCode;
use chrono::{Datelike, Utc};
use common::spawn_app;
use sea_orm::{ActiveModelTrait, ActiveValue, EntityTrait, IntoActiveModel};
use serde_json::json;
use shared::entity::signals;
use std::time::Duration;

#[tokio::test]
async fn test_create_signal_posts_announcement() {
    let app = spawn_app().await;
    let admin = app.admin().await;

    let (status, body) = app.create_signal(&admin, "general-chat-2", "nas100").await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    let signal = &body["data"]["signal"];
    assert_eq!(signal["symbol"], "NAS100");
    assert_eq!(signal["type"], "BUY");
    assert_eq!(signal["status"], "ACTIVE");
    assert_eq!(signal["risk_reward"], "2.00");

    let message = &body["data"]["message"];
    let content = message["content"].as_str().unwrap();
    assert!(content.starts_with("🚀 **BUY NAS100**"));
    assert!(content.contains("R:R ≈ 2.00"));
    assert_eq!(message["signal_id"], signal["id"]);

    // signal + announcement
    assert_eq!(app.state.hub.last_seq("channel:general-chat-2").await, 2);
}

#[tokio::test]
async fn test_second_active_signal_on_same_setup_conflicts() {
    let app = spawn_app().await;
    let admin = app.admin().await;

    let (status, _) = app.create_signal(&admin, "general-chat-2", "NAS100").await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = app.create_signal(&admin, "general-chat-2", "NAS100").await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["success"], false);

    // another channel is a different setup
    let (status, _) = app.create_signal(&admin, "general-chat-3", "NAS100").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_signals_rejected_outside_signal_channels() {
    let app = spawn_app().await;
    let admin = app.admin().await;
    let (status, _) = app.create_signal(&admin, "fondamentaux", "NAS100").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = app.create_signal(&admin, "nowhere", "NAS100").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_closed_win_lights_up_calendar() {
    let app = spawn_app().await;
    let admin = app.admin().await;

    let (_, created) = app.create_signal(&admin, "general-chat-2", "NAS100").await;
    let id = created["data"]["signal"]["id"].as_i64().unwrap();

    let (status, closed) = app
        .post(
            &format!("/api/signals/{}/close", id),
            &admin,
            json!({ "status": "WIN", "pnl": "+50" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{}", closed);
    assert_eq!(closed["data"]["signal"]["status"], "WIN");
    assert_eq!(closed["data"]["signal"]["pnl"], "50.00");
    let closure = closed["data"]["message"]["content"].as_str().unwrap();
    assert!(closure.contains("Résultat: 🟢 GAGNANT"));
    assert!(closure.contains("P&L: +$50.00"));

    let today = Utc::now().date_naive();
    let month = format!("{:04}-{:02}", today.year(), today.month());
    let (status, calendar) = app
        .get(
            &format!("/api/stats/signals/calendar?channel=general-chat-2&month={}", month),
            &admin,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let cell = &calendar["data"]["cells"][(today.day() - 1) as usize];
    assert_eq!(cell["tone"], "profit");
    assert_eq!(cell["pnl"], 50.0);

    let (_, summary) = app.get("/api/stats/signals/summary?channel=general-chat-2", &admin).await;
    assert_eq!(summary["data"]["wins"], 1);
    assert_eq!(summary["data"]["profit_factor"], "∞");
    assert_eq!(summary["data"]["win_rate"], 100.0);
}

#[tokio::test]
async fn test_close_normalizes_sign_and_only_once() {
    let app = spawn_app().await;
    let admin = app.admin().await;
    let (_, created) = app.create_signal(&admin, "general-chat-4", "EURUSD").await;
    let uri = format!("/api/signals/{}/close", created["data"]["signal"]["id"]);

    let (status, closed) = app
        .post(&uri, &admin, json!({ "status": "LOSS", "pnl": "30", "loss_reason": "contre_sma" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(closed["data"]["signal"]["pnl"], "-30.00");
    assert_eq!(closed["data"]["signal"]["loss_reason"], "contre_sma");

    let (status, _) = app.post(&uri, &admin, json!({ "status": "WIN", "pnl": "10" })).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_close_requires_pnl_for_win() {
    let app = spawn_app().await;
    let admin = app.admin().await;
    let (_, created) = app.create_signal(&admin, "general-chat-2", "NAS100").await;
    let uri = format!("/api/signals/{}/close", created["data"]["signal"]["id"]);

    let (status, _) = app.post(&uri, &admin, json!({ "status": "WIN" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = app.post(&uri, &admin, json!({ "status": "ACTIVE" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, closed) = app.post(&uri, &admin, json!({ "status": "BE" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(closed["data"]["signal"]["pnl"], "0.00");
}

#[tokio::test]
async fn test_history_pages_newest_first() {
    let app = spawn_app().await;
    let admin = app.admin().await;
    for symbol in ["AAA", "BBB", "CCC"] {
        app.create_signal(&admin, "general-chat-3", symbol).await;
    }

    let (_, page) = app.get("/api/channels/general-chat-3/signals?limit=2", &admin).await;
    let symbols: Vec<&str> = page["data"]["signals"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["symbol"].as_str().unwrap())
        .collect();
    assert_eq!(symbols, vec!["CCC", "BBB"]);
    let next = page["data"]["next_before"].as_i64().unwrap();

    let (_, rest) = app
        .get(&format!("/api/channels/general-chat-3/signals?limit=2&before={}", next), &admin)
        .await;
    assert_eq!(rest["data"]["signals"].as_array().unwrap().len(), 1);
    assert_eq!(rest["data"]["signals"][0]["symbol"], "AAA");
    assert!(rest["data"]["next_before"].is_null());

    let (_, active) = app
        .get("/api/channels/general-chat-3/signals?status=win", &admin)
        .await;
    assert_eq!(active["data"]["signals"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_signal_reactions_toggle() {
    let app = spawn_app().await;
    let admin = app.admin().await;
    let (_, created) = app.create_signal(&admin, "general-chat-2", "NAS100").await;
    let id = created["data"]["signal"]["id"].as_i64().unwrap();
    let uri = format!("/api/signals/{}/reactions", id);

    let (_, on) = app.post(&uri, &admin, json!({ "emoji": "🚀" })).await;
    assert_eq!(on["data"]["reacted"], true);
    let (_, fetched) = app.get(&format!("/api/signals/{}", id), &admin).await;
    assert_eq!(fetched["data"]["reactions"][0]["emoji"], "🚀");

    let (_, off) = app.post(&uri, &admin, json!({ "emoji": "🚀" })).await;
    assert_eq!(off["data"]["reacted"], false);
}

#[tokio::test]
async fn test_new_signal_is_pushed_to_registered_devices() {
    let app = spawn_app().await;
    let admin = app.admin().await;
    let (status, _) = app
        .post("/api/push-tokens", &admin, json!({ "token": "device-1", "platform": "android" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    // registering twice keeps one row
    app.post("/api/push-tokens", &admin, json!({ "token": "device-1" })).await;

    app.create_signal(&admin, "general-chat-2", "NAS100").await;

    let mut sent = Vec::new();
    for _ in 0..50 {
        sent = app.push.sent.lock().unwrap().clone();
        if !sent.is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(sent, vec![("device-1".to_string(), "Signal Trade".to_string())]);
}

#[tokio::test]
async fn test_delete_signal() {
    let app = spawn_app().await;
    let admin = app.admin().await;
    let (_, created) = app.create_signal(&admin, "general-chat-2", "NAS100").await;
    let id = created["data"]["signal"]["id"].as_i64().unwrap();

    let (status, _) = app
        .request("DELETE", &format!("/api/signals/{}", id), Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app.get(&format!("/api/signals/{}", id), &admin).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_racing_closes_settle_once() {
    let app = spawn_app().await;
    let admin = app.admin().await;
    let (_, created) = app.create_signal(&admin, "general-chat-2", "NAS100").await;
    let id = created["data"]["signal"]["id"].as_i64().unwrap();
    let uri = format!("/api/signals/{}/close", id);

    let (first, second) = tokio::join!(
        app.post(&uri, &admin, json!({ "status": "WIN", "pnl": "50" })),
        app.post(&uri, &admin, json!({ "status": "LOSS", "pnl": "20" })),
    );
    let mut statuses = vec![first.0.as_u16(), second.0.as_u16()];
    statuses.sort();
    assert_eq!(statuses, vec![200, 409]);

    let (_, tail) = app.get("/api/channels/general-chat-2/messages", &admin).await;
    let closures = tail["data"]
        .as_array()
        .unwrap()
        .iter()
        .filter(|m| m["content"].as_str().unwrap().contains("SIGNAL FERMÉ"))
        .count();
    assert_eq!(closures, 1);
}

#[tokio::test]
async fn test_storage_allows_one_active_signal_per_setup() {
    let app = spawn_app().await;
    let admin = app.admin().await;
    let (_, created) = app.create_signal(&admin, "general-chat-2", "NAS100").await;
    let id = created["data"]["signal"]["id"].as_i64().unwrap() as i32;

    let stored = signals::Entity::find_by_id(id)
        .one(app.state.db.as_ref())
        .await
        .unwrap()
        .unwrap();
    let mut duplicate = stored.into_active_model().reset_all();
    duplicate.id = ActiveValue::NotSet;
    let err = duplicate.insert(app.state.db.as_ref()).await.unwrap_err();
    assert!(api::error::is_unique_violation(&err));

    // a closed setup can be opened again
    let (status, _) = app
        .post(&format!("/api/signals/{}/close", id), &admin, json!({ "status": "BE" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app.create_signal(&admin, "general-chat-2", "NAS100").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_reaction_broadcast_carries_no_caller_flag() {
    let app = spawn_app().await;
    let admin = app.admin().await;
    let reader = app.sign_up("reader@example.com").await;
    let (_, me) = app.get("/api/auth/me", &reader).await;
    let reader_id = me["data"]["user"]["id"].as_i64().unwrap();
    let (status, _) = app
        .request(
            "PUT",
            &format!("/api/admin/users/{}/plan", reader_id),
            Some(&admin),
            Some(json!({ "plan": "premium" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let (_, created) = app.create_signal(&admin, "general-chat-2", "NAS100").await;
    let id = created["data"]["signal"]["id"].as_i64().unwrap();

    let mut feed = app.state.hub.subscribe("channel:general-chat-2", None).await;
    let (_, reacted) = app
        .post(&format!("/api/signals/{}/reactions", id), &admin, json!({ "emoji": "🚀" }))
        .await;
    assert_eq!(reacted["data"]["reactions"][0]["reacted"], true);

    let event = feed.next().await.unwrap();
    assert_eq!(event.kind.as_str(), "reaction_changed");
    assert_eq!(event.payload["reactions"][0], json!({ "emoji": "🚀", "count": 1 }));

    let (status, seen) = app.get(&format!("/api/signals/{}", id), &reader).await;
    assert_eq!(status, StatusCode::OK, "{}", seen);
    assert_eq!(seen["data"]["reactions"][0]["count"], 1);
    assert_eq!(seen["data"]["reactions"][0]["reacted"], false);
}
