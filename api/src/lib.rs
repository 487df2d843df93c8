pub mod auth;
pub mod chat_token;
pub mod error;
pub mod routes;
pub mod services;
pub mod state;

use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use state::AppState;

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(routes::chat::chat_routes())
        .merge(routes::auth::auth_routes())
        .merge(routes::users::admin_routes())
        .merge(routes::channels::channel_routes())
        .merge(routes::signals::signal_routes())
        .merge(routes::events::event_routes())
        .merge(routes::journal::journal_routes())
        .merge(routes::accounts::account_routes())
        .merge(routes::stats::stats_routes())
        .merge(routes::notifications::notification_routes())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
