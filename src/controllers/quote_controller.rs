use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::errors::{ApiError, ErrorBody, INVALID_BODY_MESSAGE};
use crate::models::quote::{Quote, QuoteDraft};
use crate::shared_state::QuoteStore;

/// POST /api/quotes
/// Store a finalised quote
///
/// Needs a bill reference plus the system size and total cost the customer
/// accepted.
#[utoipa::path(
    post,
    path = "/api/quotes",
    request_body = QuoteDraft,
    responses(
        (status = 201, description = "Quote stored", body = Quote),
        (status = 400, description = "Malformed body, or missing bill data or quote calculation", body = ErrorBody)
    )
)]
pub async fn create_quote(
    State(quotes): State<QuoteStore>,
    body: Bytes,
) -> Result<(StatusCode, Json<Quote>), ApiError> {
    let draft: QuoteDraft = serde_json::from_slice(&body).map_err(|e| {
        tracing::debug!(error = %e, "unparseable quote request");
        ApiError::BadRequest(INVALID_BODY_MESSAGE.to_string())
    })?;
    let quote = quotes.save(draft)?;
    Ok((StatusCode::CREATED, Json(quote)))
}

/// GET /api/quotes/{id}
#[utoipa::path(
    get,
    path = "/api/quotes/{id}",
    params(
        ("id" = Uuid, Path, description = "Quote ID")
    ),
    responses(
        (status = 200, description = "Stored quote", body = Quote),
        (status = 404, description = "Quote not found", body = ErrorBody)
    )
)]
pub async fn get_quote(
    State(quotes): State<QuoteStore>,
    Path(id): Path<Uuid>,
) -> Result<Json<Quote>, ApiError> {
    quotes
        .get(id)
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("quote {id}")))
}

/// GET /api/bills/{bill_id}/quotes
/// All quotes saved against a bill, oldest first
#[utoipa::path(
    get,
    path = "/api/bills/{bill_id}/quotes",
    params(
        ("bill_id" = String, Path, description = "Bill reference")
    ),
    responses(
        (status = 200, description = "Quotes for the bill", body = Vec<Quote>)
    )
)]
pub async fn list_bill_quotes(
    State(quotes): State<QuoteStore>,
    Path(bill_id): Path<String>,
) -> Json<Vec<Quote>> {
    Json(quotes.for_bill(&bill_id))
}
