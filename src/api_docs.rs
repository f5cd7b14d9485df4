use utoipa::OpenApi;
use crate::controllers::{catalog_controller, health_controller, quote_controller, sizing_controller};
use crate::errors;
use crate::models::{catalog, health, quote, sizing};

#[derive(OpenApi)]
#[openapi(
    paths(
        sizing_controller::calculate_system_size,
        catalog_controller::get_catalog,
        catalog_controller::get_bracket_for_size,
        quote_controller::create_quote,
        quote_controller::get_quote,
        quote_controller::list_bill_quotes,
        health_controller::get_health
    ),
    components(
        schemas(
            sizing::SizingInput,
            sizing::SizingEstimate,
            catalog::Catalog,
            catalog::BracketCost,
            quote::QuoteDraft,
            quote::Quote,
            health::HealthStatus,
            errors::ErrorBody
        )
    ),
    tags(
        (name = "solar-sizing", description = "Residential solar sizing and quoting API")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_lists_every_route() {
        let doc = ApiDoc::openapi();
        for p in [
            "/api/system-sizing",
            "/api/catalog",
            "/api/catalog/bracket",
            "/api/quotes",
            "/api/quotes/{id}",
            "/api/bills/{bill_id}/quotes",
            "/api/health",
        ] {
            assert!(doc.paths.paths.contains_key(p), "missing {p}");
        }
    }
}
