use axum::{routing::{get, post}, Router};
use crate::controllers::{
    // Sizing
    sizing_controller::calculate_system_size,
    // Catalog
    catalog_controller::{get_catalog, get_bracket_for_size},
    // Quotes
    quote_controller::{create_quote, get_quote, list_bill_quotes},
    health_controller::get_health,
};
use crate::shared_state::AppState;

/// Build the `/api/*` sub-router.
/// Handlers extract `State<AppState>`, `State<CatalogService>` or
/// `State<QuoteStore>` via `FromRef<AppState>`.
pub fn api_routes(state: AppState) -> Router {
    Router::new()
        .route("/system-sizing",           post(calculate_system_size))
        .route("/catalog",                 get(get_catalog))
        .route("/catalog/bracket",         get(get_bracket_for_size))
        .route("/quotes",                  post(create_quote))
        .route("/quotes/{id}",             get(get_quote))
        .route("/bills/{bill_id}/quotes",  get(list_bill_quotes))
        .route("/health",                  get(get_health))
        .with_state(state)
}
