mod common;

use axum::http::StatusCode;
use common::spawn_app;
use serde_json::{json, Value};

fn trade(date: &str, status: &str, pnl: &str) -> Value {
    json!({
        "date": date,
        "entry_time": "09:30",
        "symbol": "nas100",
        "type": "BUY",
        "entry": "18000",
        "exit": "18050",
        "pnl": pnl,
        "status": status,
    })
}

#[tokio::test]
async fn test_member_without_journal_plan_is_refused() {
    let app = spawn_app().await;
    let member = app.sign_up("member@example.com").await;
    let (status, _) = app.get("/api/journal/trades", &member).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_default_account_is_created_on_first_use() {
    let app = spawn_app().await;
    let admin = app.admin().await;
    let (status, accounts) = app.get("/api/journal/accounts", &admin).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(accounts["data"].as_array().unwrap().len(), 1);
    assert_eq!(accounts["data"][0]["account_name"], "Compte Principal");
    assert_eq!(accounts["data"][0]["is_default"], true);

    let default_id = accounts["data"][0]["id"].as_i64().unwrap();
    let (status, _) = app
        .request("DELETE", &format!("/api/journal/accounts/{}", default_id), Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_account_names_are_unique_per_user() {
    let app = spawn_app().await;
    let admin = app.admin().await;
    let body = json!({ "account_name": "Prop firm", "initial_balance": 10000 });
    let (status, _) = app.post("/api/journal/accounts", &admin, body.clone()).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app.post("/api/journal/accounts", &admin, body).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_deleting_account_takes_its_trades() {
    let app = spawn_app().await;
    let admin = app.admin().await;
    let (_, account) = app
        .post(
            "/api/journal/accounts",
            &admin,
            json!({ "account_name": "Challenge", "initial_balance": "5000" }),
        )
        .await;
    let account_id = account["data"]["id"].as_i64().unwrap();

    let mut body = trade("2025-06-02", "WIN", "+$120");
    body["account_id"] = json!(account_id);
    let (status, created) = app.post("/api/journal/trades", &admin, body).await;
    assert_eq!(status, StatusCode::OK, "{}", created);
    assert_eq!(created["data"]["symbol"], "NAS100");
    assert_eq!(created["data"]["pnl"], 120.0);
    assert_eq!(created["data"]["account_id"], account_id);

    let (status, deleted) = app
        .request("DELETE", &format!("/api/journal/accounts/{}", account_id), Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(deleted["data"]["deleted_trades"], 1);

    let (_, trades) = app.get("/api/journal/trades", &admin).await;
    assert!(trades["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_trades_are_private() {
    let app = spawn_app().await;
    let admin = app.admin().await;
    let (_, created) = app.post("/api/journal/trades", &admin, trade("2025-06-02", "WIN", "10")).await;
    let id = created["data"]["id"].as_i64().unwrap();

    let (_, other) = app
        .request(
            "POST",
            "/api/auth/signup",
            None,
            Some(json!({ "email": "second@example.com", "password": common::PASSWORD })),
        )
        .await;
    let other_id = other["data"]["user"]["id"].as_i64().unwrap();
    let other_token = other["data"]["token"].as_str().unwrap().to_string();
    app.request(
        "PUT",
        &format!("/api/admin/users/{}/plan", other_id),
        Some(&admin),
        Some(json!({ "plan": "journal" })),
    )
    .await;

    let (status, _) = app.get(&format!("/api/journal/trades/{}", id), &other_token).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, list) = app.get("/api/journal/trades", &other_token).await;
    assert_eq!(status, StatusCode::OK);
    assert!(list["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_invalid_trade_input() {
    let app = spawn_app().await;
    let admin = app.admin().await;
    let (status, _) = app.post("/api/journal/trades", &admin, trade("2025-06-02", "ACTIVE", "0")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let mut body = trade("2025-06-02", "WIN", "5");
    body["entry_time"] = json!("9h30");
    let (status, _) = app.post("/api/journal/trades", &admin, body).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_loss_reason_histogram() {
    let app = spawn_app().await;
    let admin = app.admin().await;

    let mut tagged = trade("2025-06-02", "LOSS", "-40");
    tagged["loss_reasons"] = json!(["contre_sma", "erreur_psychologique"]);
    app.post("/api/journal/trades", &admin, tagged).await;
    let mut again = trade("2025-06-03", "LOSS", "-10");
    again["lossReasons"] = json!(["contre_sma"]);
    app.post("/api/journal/trades", &admin, again).await;
    app.post("/api/journal/trades", &admin, trade("2025-06-04", "LOSS", "-5")).await;
    // reasons on a win are dropped
    let mut win = trade("2025-06-05", "WIN", "80");
    win["loss_reasons"] = json!(["contre_sma"]);
    let (_, win) = app.post("/api/journal/trades", &admin, win).await;
    assert!(win["data"]["loss_reasons"].as_array().unwrap().is_empty());

    let (status, hist) = app
        .get("/api/stats/journal/loss-reasons?month=2025-06", &admin)
        .await;
    assert_eq!(status, StatusCode::OK);
    let buckets = hist["data"].as_array().unwrap();
    assert_eq!(buckets.len(), 3);
    assert_eq!(buckets[0]["reason"], "contre_sma");
    assert_eq!(buckets[0]["count"], 2);
    assert_eq!(buckets[0]["label"], "📈 Contre sma");
    assert!(buckets
        .iter()
        .any(|b| b["reason"] == "unspecified" && b["label"] == "Non renseigné"));

    let (_, catalog) = app.get("/api/journal/loss-reasons", &admin).await;
    assert_eq!(catalog["data"].as_array().unwrap().len(), 7);
}

#[tokio::test]
async fn test_balance_tracks_drawdown() {
    let app = spawn_app().await;
    let admin = app.admin().await;
    let (_, account) = app
        .post(
            "/api/journal/accounts",
            &admin,
            json!({ "account_name": "Funded", "initial_balance": 1000, "minimum_balance": 900 }),
        )
        .await;
    let account_id = account["data"]["id"].as_i64().unwrap();

    for (date, status, pnl) in [
        ("2025-06-02", "WIN", "100"),
        ("2025-06-03", "LOSS", "-250"),
        ("2025-06-04", "WIN", "50"),
    ] {
        let mut body = trade(date, status, pnl);
        body["account_id"] = json!(account_id);
        app.post("/api/journal/trades", &admin, body).await;
    }

    let (status, balance) = app
        .get(&format!("/api/stats/journal/balance?account_id={}", account_id), &admin)
        .await;
    assert_eq!(status, StatusCode::OK, "{}", balance);
    let health = &balance["data"]["health"];
    assert_eq!(health["initial_balance"], 1000.0);
    assert_eq!(health["current_balance"], 900.0);
    assert_eq!(health["peak_balance"], 1100.0);
    assert_eq!(health["max_drawdown"], 250.0);
    assert_eq!(balance["data"]["account"]["account_name"], "Funded");

    let (_, summary) = app
        .get(&format!("/api/stats/journal/summary?account_id={}", account_id), &admin)
        .await;
    assert_eq!(summary["data"]["total_pnl"], -100.0);
    assert_eq!(summary["data"]["wins"], 2);
    assert_eq!(summary["data"]["profit_factor"], "0.60");
}

#[tokio::test]
async fn test_trade_events_reach_journal_topic() {
    let app = spawn_app().await;
    let admin = app.admin().await;
    let (_, me) = app.get("/api/auth/me", &admin).await;
    let user_id = me["data"]["user"]["id"].as_i64().unwrap();
    let topic = format!("journal:{}", user_id);

    let (_, created) = app.post("/api/journal/trades", &admin, trade("2025-06-02", "BE", "0")).await;
    let id = created["data"]["id"].as_i64().unwrap();
    app.request("DELETE", &format!("/api/journal/trades/{}", id), Some(&admin), None)
        .await;

    assert_eq!(app.state.hub.last_seq(&topic).await, 2);
}
