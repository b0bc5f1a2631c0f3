use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use tracing::{error, info};

use crate::adapters::http::state::HttpState;
use crate::application::dto::{ErrorResponse, HealthResponse, OkResponse, StatsResponse};

pub async fn get_config(State(st): State<HttpState>) -> impl IntoResponse {
    Json(st.config.describe())
}

pub async fn health(State(st): State<HttpState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".into(),
        model_loaded: st.models.is_loaded(),
        model: st.models.model_name(),
        connections: st.registry.len(),
        tracked_identities: st.identities.len(),
    })
}

pub async fn stats(State(st): State<HttpState>) -> Json<StatsResponse> {
    Json(StatsResponse {
        counters: st.frames.counters_snapshot(),
        tracked_identities: st.identities.len(),
    })
}

pub async fn reload_model(State(st): State<HttpState>) -> impl IntoResponse {
    info!("Recarga de modelo solicitada");
    match st.models.reload().await {
        Ok(_) => Json(OkResponse { ok: true }).into_response(),
        Err(e) => {
            error!("Falló la recarga del modelo: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, Json(ErrorResponse { error: e.to_string() })).into_response()
        }
    }
}
