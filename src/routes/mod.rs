pub mod announcements;
pub mod health;
pub mod metrics;

use axum::{extract::DefaultBodyLimit, routing::get, Router};
use tower_http::trace::TraceLayer;

use crate::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/metrics", get(metrics::metrics_handler))
        .route(
            "/announcements",
            get(announcements::list_announcements).post(announcements::create_announcement),
        )
        .layer(TraceLayer::new_for_http())
        // Announcements carry text and an attachment reference, never file bodies
        .layer(DefaultBodyLimit::max(256 * 1024))
        .with_state(state)
}
