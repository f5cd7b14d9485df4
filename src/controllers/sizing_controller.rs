use axum::{body::Bytes, extract::State, Json};

use crate::errors::{ApiError, ErrorBody, INVALID_BODY_MESSAGE};
use crate::models::sizing::{SizingEstimate, SizingInput};
use crate::services::sizing_engine;
use crate::shared_state::AppState;

/// POST /api/system-sizing
/// Size, cost and production estimate for a site
///
/// Unknown location, orientation, roof type or shading keys fall back to their
/// defaults; the resolved keys are echoed in `metadata`. With `forceSize` the
/// reported size is exactly that value.
#[utoipa::path(
    post,
    path = "/api/system-sizing",
    request_body = SizingInput,
    responses(
        (status = 200, description = "Sizing estimate", body = SizingEstimate),
        (status = 400, description = "Monthly usage missing or not positive", body = ErrorBody),
        (status = 500, description = "Calculation failed", body = ErrorBody)
    )
)]
pub async fn calculate_system_size(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<SizingEstimate>, ApiError> {
    let input: SizingInput = serde_json::from_slice(&body).map_err(|e| {
        tracing::debug!(error = %e, "unparseable sizing request");
        ApiError::BadRequest(INVALID_BODY_MESSAGE.to_string())
    })?;

    let estimate = sizing_engine::estimate(&input, state.tables)?;
    tracing::info!(
        monthly_usage = estimate.consumption.monthly,
        system_size = estimate.system_size,
        total_cost = estimate.costs.total,
        location = %estimate.metadata.location,
        "system sizing calculated"
    );
    Ok(Json(estimate))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use axum::response::IntoResponse;
    use serde_json::{json, Value};

    use crate::services::catalog_service::CatalogService;

    async fn call(body: &str) -> (StatusCode, Value) {
        let state = AppState::new(CatalogService::offline());
        let resp = calculate_system_size(State(state), Bytes::from(body.to_string()))
            .await
            .into_response();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_reference_request() {
        let body = json!({
            "monthlyUsage": 856,
            "location": "Lahore",
            "roofDirection": "south",
            "roofType": "standard",
            "shading": "minimal"
        });
        let (status, v) = call(&body.to_string()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(v["systemSize"], 8.5);
        assert_eq!(v["recommendedRange"], json!({ "minimum": 6.0, "recommended": 8.5, "maximum": 10.0 }));
        assert_eq!(v["equipment"]["panelOptions"][0], json!({ "power": 450, "count": 19, "roofArea": 34, "totalCost": 855000 }));
        assert_eq!(v["equipment"]["inverter"], json!({ "size": 10, "count": 1, "totalCost": 180000 }));
        assert_eq!(v["costs"]["total"], 1293800);
        assert_eq!(v["costs"]["netMetering"], 50000);
        assert_eq!(v["roof"]["required_area"], 34);
        assert_eq!(v["roof"]["optimal_orientation"], "south");
        assert_eq!(v["consumption"]["peak"]["kWh"], 360);
        assert_eq!(v["consumption"]["peak"]["time"], "6:00 PM - 9:00 PM");
        assert_eq!(v["production"]["byMonth"].as_array().map(Vec::len), Some(12));
        assert_eq!(v["weather"]["temperatureImpact"], 9);
        assert_eq!(v["metadata"]["calculationVersion"], "1.0");
        assert_eq!(v["efficiencyFactors"]["systemEfficiency"], 72);
    }

    #[tokio::test]
    async fn test_response_has_every_top_level_key() {
        let (_, v) = call(r#"{ "monthlyUsage": 300 }"#).await;
        for key in [
            "systemSize", "recommendedRange", "efficiencyFactors", "equipment", "costs", "roof",
            "battery", "production", "consumption", "weather", "metadata",
        ] {
            assert!(v.get(key).is_some(), "missing {key}");
        }
        assert_eq!(v["metadata"]["location"], "Central Pakistan");
    }

    #[tokio::test]
    async fn test_invalid_usage_is_400() {
        for body in [
            r#"{}"#,
            r#"{ "monthlyUsage": 0 }"#,
            r#"{ "monthlyUsage": -120, "location": "Karachi" }"#,
            r#"{ "monthlyUsage": "lots" }"#,
            r#"{ "monthlyUsage": "NaN", "forceSize": 5 }"#,
        ] {
            let (status, v) = call(body).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "body {body}");
            assert_eq!(v, json!({ "error": "Valid monthly usage in kWh is required" }));
        }
    }

    #[tokio::test]
    async fn test_malformed_body_is_400() {
        let (status, v) = call("monthlyUsage=856").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(v["error"], INVALID_BODY_MESSAGE);
    }

    #[tokio::test]
    async fn test_forced_size_is_reported_verbatim() {
        let (status, v) = call(r#"{ "monthlyUsage": 856, "forceSize": 12.25 }"#).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(v["systemSize"], 12.25);
        assert_eq!(v["equipment"]["inverter"]["size"], 15);
    }

    #[tokio::test]
    async fn test_forced_zero_size_is_reported_verbatim() {
        let (status, v) = call(r#"{ "monthlyUsage": 856, "forceSize": 0 }"#).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(v["systemSize"], 0.0);
        assert_eq!(v["costs"]["panels"], 0);
    }
}
