pub mod error;
pub mod extractors;
pub mod routes;
pub mod state;

use axum::{
    Router,
    routing::{get, post},
};
use state::AppState;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Subscription routes (authenticated via the host's tokens)
    let subscription_routes = Router::new()
        .route("/", post(routes::push_subscription::store))
        .route("/delete", post(routes::push_subscription::destroy))
        .route("/stats", get(routes::push_subscription::stats))
        .route("/test", post(routes::push_subscription::send_test));

    // Health check
    let health = Router::new().route("/health", get(health_check));

    Router::new()
        .nest("/push-subscriptions", subscription_routes)
        .merge(health)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn health_check() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({ "status": "ok" }))
}
