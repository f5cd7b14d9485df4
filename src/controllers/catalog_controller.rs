use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::errors::{ApiError, ErrorBody};
use crate::models::catalog::{BracketCost, Catalog};
use crate::services::catalog_service::CatalogService;

/// GET /api/catalog
/// Equipment catalog
///
/// Panels, inverters, structure types, bracket costs and variable costs.
/// Categories the remote catalog cannot supply are filled from the built-in
/// defaults; `source` tells which happened.
#[utoipa::path(
    get,
    path = "/api/catalog",
    responses(
        (status = 200, description = "Equipment catalog", body = Catalog)
    )
)]
pub async fn get_catalog(State(catalog): State<CatalogService>) -> Json<Catalog> {
    Json(catalog.fetch_all().await)
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct BracketQuery {
    /// System size in kW
    pub size: f64,
}

/// GET /api/catalog/bracket
/// Bracket cost band for a system size
#[utoipa::path(
    get,
    path = "/api/catalog/bracket",
    params(BracketQuery),
    responses(
        (status = 200, description = "Matching bracket band", body = BracketCost),
        (status = 404, description = "No band covers this size", body = ErrorBody)
    )
)]
pub async fn get_bracket_for_size(
    State(catalog): State<CatalogService>,
    Query(query): Query<BracketQuery>,
) -> Result<Json<BracketCost>, ApiError> {
    catalog
        .bracket_for_size(query.size)
        .await
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("bracket cost for {} kW", query.size)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::catalog::CatalogSource;

    #[tokio::test]
    async fn test_offline_catalog() {
        let Json(catalog) = get_catalog(State(CatalogService::offline())).await;
        assert_eq!(catalog.source, CatalogSource::Builtin);
        assert_eq!(catalog.panels.len(), 3);
    }

    #[tokio::test]
    async fn test_bracket_lookup() {
        let found = get_bracket_for_size(State(CatalogService::offline()), Query(BracketQuery { size: 3.0 })).await;
        assert_eq!(found.map(|Json(b)| b.dc_cable).ok(), Some(300));

        let missing = get_bracket_for_size(State(CatalogService::offline()), Query(BracketQuery { size: 9.0 })).await;
        assert!(matches!(missing, Err(ApiError::NotFound(_))));
    }
}
