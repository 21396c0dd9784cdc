use axum::middleware;
use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::AppState;
use super::auth::require_auth;
use super::handlers;

pub fn create_router(state: AppState) -> Router {
    // Public routes: no authentication
    let public = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/metrics", get(handlers::health::metrics))
        .route("/api/auth/register", post(handlers::auth::register))
        .route("/api/auth/login", post(handlers::auth::login))
        .route("/api/market/data", get(handlers::market::data))
        .route("/api/market/history/:metal", get(handlers::market::history))
        .route("/ws", get(handlers::ws::handler));

    // Protected API routes: require a valid JWT
    let protected = Router::new()
        .route("/api/auth/me", get(handlers::auth::me))
        // Positions
        .route("/api/positions", get(handlers::positions::list).post(handlers::positions::create))
        .route("/api/positions/:id", get(handlers::positions::detail).put(handlers::positions::update))
        .route("/api/positions/:id/close", post(handlers::positions::close))
        // Dashboard
        .route("/api/dashboard/overview", get(handlers::dashboard::overview))
        .route("/api/dashboard/performance", get(handlers::dashboard::performance))
        .route("/api/dashboard/risk-metrics", get(handlers::dashboard::risk_metrics))
        // Alerts
        .route("/api/alerts", get(handlers::alerts::list).post(handlers::alerts::create))
        .route("/api/alerts/:id", delete(handlers::alerts::cancel))
        // Notifications
        .route("/api/notifications", get(handlers::notifications::list))
        .route("/api/notifications/:id/read", post(handlers::notifications::mark_read))
        .layer(middleware::from_fn_with_state(state.clone(), require_auth));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    public
        .merge(protected)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
