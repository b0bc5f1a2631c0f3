pub mod routes;
pub mod state;
pub mod ws;

use axum::{
    http::{HeaderValue, Method},
    routing::{get, post},
    Router,
};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use crate::adapters::http::state::HttpState;
use crate::adapters::http::ws::ws_handler;

pub fn router(state: HttpState) -> Router {
    let cors = cors_layer(state.config.allowed_origins());
    Router::new()
        .route("/api/config", get(routes::get_config))
        .route("/api/health", get(routes::health))
        .route("/api/stats", get(routes::stats))
        .route("/api/model/reload", post(routes::reload_model))
        .route("/ws", get(ws_handler))
        .layer(cors)
        .with_state(state)
}

fn cors_layer(origins: Option<Vec<String>>) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);
    match origins {
        None => layer.allow_origin(Any),
        Some(list) => {
            let values: Vec<HeaderValue> = list.iter().filter_map(|o| o.parse().ok()).collect();
            layer.allow_origin(AllowOrigin::list(values))
        }
    }
}
