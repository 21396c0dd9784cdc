mod common;

use axum::http::StatusCode;
use rust_decimal::Decimal;
use serde_json::json;

use common::{dec, position_body, register, send};

// ---------------------------------------------------------------------------
// Without a database
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_protected_routes_require_token() {
    let app = common::build_offline_app();

    for uri in ["/api/positions", "/api/dashboard/risk-metrics", "/api/alerts", "/api/auth/me"] {
        let (status, json) = send(&app, "GET", uri, None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{uri}");
        assert_eq!(json["success"], false);
    }
}

#[tokio::test]
async fn test_invalid_token_rejected() {
    let app = common::build_offline_app();

    let (status, _) = send(&app, "GET", "/api/positions", Some("not-a-jwt"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let app = common::build_offline_app();

    let resp = tower::ServiceExt::oneshot(
        app,
        axum::http::Request::builder()
            .uri("/metrics")
            .body(axum::body::Body::empty())
            .unwrap(),
    )
    .await
    .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let body = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(text.contains("positions_opened_total"));
}

// ---------------------------------------------------------------------------
// Against TEST_DATABASE_URL
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_health_check() {
    let Some(db) = common::setup_test_db().await else { return };
    let app = common::build_app(db.pool.clone(), db.config.clone());

    let (status, json) = send(&app, "GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["feed"], "simulated");
}

#[tokio::test]
async fn test_market_data_covers_every_metal() {
    let Some(db) = common::setup_test_db().await else { return };
    let app = common::build_app(db.pool.clone(), db.config.clone());

    let (status, json) = send(&app, "GET", "/api/market/data", None, None).await;
    assert_eq!(status, StatusCode::OK);

    let data = json["data"].as_object().unwrap();
    for metal in ["copper", "aluminum", "zinc", "nickel", "lead", "tin"] {
        let quote = &data[metal];
        assert!(dec(&quote["price"]) > Decimal::ZERO, "{metal}");
        assert!(quote["timestamp"].is_string());
    }

    // First round moves at most 2% from the copper base price
    let copper = dec(&data["copper"]["price"]);
    assert!(copper >= Decimal::from(8330) && copper <= Decimal::from(8670));

    // Within the cache TTL the same snapshot is served
    let (_, again) = send(&app, "GET", "/api/market/data", None, None).await;
    assert_eq!(json["data"], again["data"]);

    let (status, history) = send(&app, "GET", "/api/market/history/copper?days=1", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(history["data"]["ticks"].as_array().unwrap().len(), 1);

    let (status, _) = send(&app, "GET", "/api/market/history/gold", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_register_login_and_me() {
    let Some(db) = common::setup_test_db().await else { return };
    let app = common::build_app(db.pool.clone(), db.config.clone());

    let token = register(&app, "Trader@Example.com", "pro").await;

    let (status, json) = send(&app, "GET", "/api/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["email"], "trader@example.com");
    assert_eq!(json["data"]["subscription_tier"], "pro");
    assert!(json["data"].get("password_hash").is_none());

    // Duplicate email, case-insensitive
    let (status, _) = send(
        &app,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({ "email": "trader@example.com", "password": "another-password", "full_name": "X" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({ "email": "short@example.com", "password": "short", "full_name": "X" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, json) = send(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "email": "trader@example.com", "password": "correct-horse-battery" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(json["data"]["token"].is_string());

    let (status, _) = send(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "email": "trader@example.com", "password": "wrong-password" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_position_lifecycle() {
    let Some(db) = common::setup_test_db().await else { return };
    let app = common::build_app(db.pool.clone(), db.config.clone());
    let token = register(&app, "lifecycle@example.com", "basic").await;

    let (status, json) = send(
        &app,
        "POST",
        "/api/positions",
        Some(&token),
        Some(position_body("copper", "long", 10, 8500)),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{json}");
    let id = json["data"]["id"].as_str().unwrap().to_string();
    assert_eq!(json["data"]["status"], "active");
    assert_eq!(json["data"]["days_to_expiry"], 365);

    // Re-reading within one freshness window gives identical P&L
    let (_, first) = send(&app, "GET", &format!("/api/positions/{id}"), Some(&token), None).await;
    let (_, second) = send(&app, "GET", &format!("/api/positions/{id}"), Some(&token), None).await;
    assert_eq!(dec(&first["data"]["pnl"]), dec(&second["data"]["pnl"]));
    assert_eq!(dec(&first["data"]["current_price"]), dec(&second["data"]["current_price"]));

    // Update levels
    let (status, json) = send(
        &app,
        "PUT",
        &format!("/api/positions/{id}"),
        Some(&token),
        Some(json!({ "target_price": 9000, "stop_loss": 8000, "notes": "hedge Q3 cathode" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(dec(&json["data"]["stop_loss"]), Decimal::from(8000));
    assert_eq!(json["data"]["notes"], "hedge Q3 cathode");

    // Close at an explicit price: 10 × (8700 − 8500)
    let uri = format!("/api/positions/{id}/close");
    let (status, json) = send(&app, "POST", &uri, Some(&token), Some(json!({ "close_price": 8700 }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["status"], "closed");
    assert_eq!(dec(&json["data"]["profit_loss"]), Decimal::from(2000));

    // Only active positions close
    let (status, _) = send(&app, "POST", &uri, Some(&token), Some(json!({ "close_price": 9999 }))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Realized P&L is never recomputed
    let (_, json) = send(&app, "GET", &format!("/api/positions/{id}"), Some(&token), None).await;
    assert_eq!(dec(&json["data"]["pnl"]), Decimal::from(2000));
    assert_eq!(dec(&json["data"]["close_price"]), Decimal::from(8700));

    let (_, json) = send(&app, "GET", "/api/positions?status=closed", Some(&token), None).await;
    assert_eq!(json["data"].as_array().unwrap().len(), 1);
    let (_, json) = send(&app, "GET", "/api/positions?status=active", Some(&token), None).await;
    assert!(json["data"].as_array().unwrap().is_empty());

    let (_, json) = send(&app, "GET", "/api/dashboard/overview", Some(&token), None).await;
    assert_eq!(json["data"]["closed_positions"], 1);
    assert_eq!(dec(&json["data"]["realized_pnl"]), Decimal::from(2000));
    assert_eq!(dec(&json["data"]["win_rate"]), Decimal::from(100));

    let (_, json) = send(&app, "GET", "/api/dashboard/performance?period=7d", Some(&token), None).await;
    assert_eq!(json["data"]["period"], "7d");
    assert_eq!(dec(&json["data"]["total_realized_pnl"]), Decimal::from(2000));

    let (_, json) = send(&app, "GET", "/api/notifications", Some(&token), None).await;
    let kinds: Vec<&str> = json["data"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|n| n["kind"].as_str())
        .collect();
    assert_eq!(kinds, vec!["position_closed"]);
}

#[tokio::test]
async fn test_position_other_user_not_found() {
    let Some(db) = common::setup_test_db().await else { return };
    let app = common::build_app(db.pool.clone(), db.config.clone());
    let owner = register(&app, "owner@example.com", "basic").await;
    let other = register(&app, "other@example.com", "basic").await;

    let (_, json) = send(&app, "POST", "/api/positions", Some(&owner), Some(position_body("zinc", "short", 5, 2500))).await;
    let id = json["data"]["id"].as_str().unwrap().to_string();

    let (status, _) = send(&app, "GET", &format!("/api/positions/{id}"), Some(&other), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(&app, "POST", &format!("/api/positions/{id}/close"), Some(&other), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_create_position_validation() {
    let Some(db) = common::setup_test_db().await else { return };
    let app = common::build_app(db.pool.clone(), db.config.clone());
    let token = register(&app, "validation@example.com", "basic").await;

    // More than 10% away from the market price
    let (status, json) = send(&app, "POST", "/api/positions", Some(&token), Some(position_body("copper", "long", 1, 12_000))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("market price"));

    let (status, _) = send(&app, "POST", "/api/positions", Some(&token), Some(position_body("gold", "long", 1, 2000))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, "POST", "/api/positions", Some(&token), Some(position_body("copper", "sideways", 1, 8500))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, "POST", "/api/positions", Some(&token), Some(position_body("copper", "long", 0, 8500))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let mut body = position_body("copper", "long", 1, 8500);
    body["expiry_date"] = body["contract_date"].clone();
    body["contract_date"] = json!("2100-01-01");
    let (status, _) = send(&app, "POST", "/api/positions", Some(&token), Some(body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, "GET", "/api/positions?status=pending", Some(&token), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_basic_tier_position_limit() {
    let Some(db) = common::setup_test_db().await else { return };
    let app = common::build_app(db.pool.clone(), db.config.clone());
    let token = register(&app, "limit@example.com", "basic").await;

    for _ in 0..5 {
        let (status, json) = send(&app, "POST", "/api/positions", Some(&token), Some(position_body("lead", "long", 1, 2100))).await;
        assert_eq!(status, StatusCode::OK, "{json}");
    }

    let (status, json) = send(&app, "POST", "/api/positions", Some(&token), Some(position_body("lead", "long", 1, 2100))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("position limit"));
}

#[tokio::test]
async fn test_concurrent_creates_respect_tier_limit() {
    let Some(db) = common::setup_test_db().await else { return };
    let app = common::build_app(db.pool.clone(), db.config.clone());
    let token = register(&app, "race@example.com", "basic").await;

    for _ in 0..4 {
        let (status, json) = send(&app, "POST", "/api/positions", Some(&token), Some(position_body("zinc", "long", 1, 2500))).await;
        assert_eq!(status, StatusCode::OK, "{json}");
    }

    // Two creates race for the last basic slot
    let body = position_body("zinc", "long", 1, 2500);
    let (first, second) = tokio::join!(
        send(&app, "POST", "/api/positions", Some(&token), Some(body.clone())),
        send(&app, "POST", "/api/positions", Some(&token), Some(body)),
    );
    let accepted = [first.0, second.0].iter().filter(|s| **s == StatusCode::OK).count();
    assert_eq!(accepted, 1, "{:?} {:?}", first, second);

    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM positions WHERE status = 'active'")
        .fetch_one(&db.pool)
        .await
        .unwrap();
    assert_eq!(count, 5);
}

#[tokio::test]
async fn test_risk_metrics_concentration() {
    let Some(db) = common::setup_test_db().await else { return };
    let app = common::build_app(db.pool.clone(), db.config.clone());
    let token = register(&app, "risk@example.com", "pro").await;

    let (_, json) = send(&app, "GET", "/api/dashboard/risk-metrics", Some(&token), None).await;
    assert_eq!(dec(&json["data"]["total_exposure"]), Decimal::ZERO);
    assert_eq!(dec(&json["data"]["concentration_risk"]), Decimal::ZERO);
    assert_eq!(json["data"]["risk_level"], "low");

    // 10 × 8500 copper: single metal
    send(&app, "POST", "/api/positions", Some(&token), Some(position_body("copper", "long", 10, 8500))).await;
    let (_, json) = send(&app, "GET", "/api/dashboard/risk-metrics", Some(&token), None).await;
    assert_eq!(dec(&json["data"]["concentration_risk"]), Decimal::from(100));
    assert_eq!(dec(&json["data"]["total_exposure"]), Decimal::from(85_000));
    assert_eq!(dec(&json["data"]["value_at_risk"]), Decimal::from(4_250));
    assert_eq!(json["data"]["risk_level"], "high");

    // 34 × 2500 zinc short: equal exposure, concentration 50 is not > 50
    send(&app, "POST", "/api/positions", Some(&token), Some(position_body("zinc", "short", 34, 2500))).await;
    let (_, json) = send(&app, "GET", "/api/dashboard/risk-metrics", Some(&token), None).await;
    assert_eq!(dec(&json["data"]["concentration_risk"]), Decimal::from(50));
    assert_eq!(dec(&json["data"]["long_exposure"]), Decimal::from(85_000));
    assert_eq!(dec(&json["data"]["short_exposure"]), Decimal::from(85_000));
    assert_eq!(json["data"]["risk_level"], "medium");
}

#[tokio::test]
async fn test_overdue_position_expires_on_read() {
    let Some(db) = common::setup_test_db().await else { return };
    let app = common::build_app(db.pool.clone(), db.config.clone());
    let token = register(&app, "expiry@example.com", "basic").await;

    let (_, json) = send(&app, "POST", "/api/positions", Some(&token), Some(position_body("tin", "long", 1, 25_000))).await;
    let id: uuid::Uuid = json["data"]["id"].as_str().unwrap().parse().unwrap();

    let today = chrono::Utc::now().date_naive();
    sqlx::query("UPDATE positions SET contract_date = $2, expiry_date = $3 WHERE id = $1")
        .bind(id)
        .bind(today - chrono::Duration::days(30))
        .bind(today - chrono::Duration::days(1))
        .execute(&db.pool)
        .await
        .unwrap();

    let (_, json) = send(&app, "GET", &format!("/api/positions/{id}"), Some(&token), None).await;
    assert_eq!(json["data"]["status"], "expired");
    assert_eq!(json["data"]["days_to_expiry"], -1);

    let (status, _) = send(&app, "POST", &format!("/api/positions/{id}/close"), Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, json) = send(&app, "GET", "/api/notifications?unread=true", Some(&token), None).await;
    let notes = json["data"].as_array().unwrap();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0]["kind"], "position_expired");

    let note_id = notes[0]["id"].as_str().unwrap();
    let (status, _) = send(&app, "POST", &format!("/api/notifications/{note_id}/read"), Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    let (_, json) = send(&app, "GET", "/api/notifications?unread=true", Some(&token), None).await;
    assert!(json["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_alert_fires_once() {
    let Some(db) = common::setup_test_db().await else { return };
    let mut config = db.config.clone();
    // Every read refreshes the feed
    config.price_cache_ttl_secs = 0;
    let app = common::build_app(db.pool.clone(), config);
    let token = register(&app, "alerts@example.com", "basic").await;

    let (status, json) = send(
        &app,
        "POST",
        "/api/alerts",
        Some(&token),
        Some(json!({ "metal": "nickel", "kind": "price_above", "target_value": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["status"], "active");

    let (status, _) = send(
        &app,
        "POST",
        "/api/alerts",
        Some(&token),
        Some(json!({ "metal": "nickel", "kind": "price_sideways", "target_value": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    send(&app, "GET", "/api/market/data", None, None).await;
    send(&app, "GET", "/api/market/data", None, None).await;

    let (_, json) = send(&app, "GET", "/api/alerts", Some(&token), None).await;
    assert_eq!(json["data"][0]["status"], "triggered");

    let (_, json) = send(&app, "GET", "/api/notifications", Some(&token), None).await;
    let fired = json["data"]
        .as_array()
        .unwrap()
        .iter()
        .filter(|n| n["kind"] == "alert_triggered")
        .count();
    assert_eq!(fired, 1);

    // Triggered alerts can no longer be cancelled
    let alert_id = {
        let (_, json) = send(&app, "GET", "/api/alerts", Some(&token), None).await;
        json["data"][0]["id"].as_str().unwrap().to_string()
    };
    let (status, _) = send(&app, "DELETE", &format!("/api/alerts/{alert_id}"), Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
