use axum::{extract::State, Json};

use crate::models::health::HealthStatus;
use crate::shared_state::AppState;

/// GET /api/health
#[utoipa::path(
    get,
    path = "/api/health",
    responses(
        (status = 200, description = "Service is up", body = HealthStatus)
    )
)]
pub async fn get_health(State(state): State<AppState>) -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        calculation_version: state.tables.calculation_version.to_string(),
    })
}
