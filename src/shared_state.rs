use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use axum::extract::FromRef;
use chrono::Utc;
use uuid::Uuid;

use crate::errors::ApiError;
use crate::models::quote::{Quote, QuoteDraft};
use crate::services::catalog_service::CatalogService;
use crate::services::reference_tables::ReferenceTables;

pub const MISSING_QUOTE_DATA: &str = "Cannot save quote: Missing bill data or quote calculation";

/// In-memory quote store keyed by quote id.
#[derive(Clone, Debug, Default)]
pub struct QuoteStore {
    quotes: Arc<RwLock<HashMap<Uuid, Quote>>>,
}

impl QuoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn save(&self, draft: QuoteDraft) -> Result<Quote, ApiError> {
        let bill_id = draft
            .bill_id
            .map(|b| b.trim().to_string())
            .filter(|b| !b.is_empty());
        let positive = |v: Option<f64>| v.filter(|x| x.is_finite() && *x > 0.0);
        let (Some(bill_id), Some(system_size), Some(total_cost)) =
            (bill_id, positive(draft.system_size), positive(draft.total_cost))
        else {
            return Err(ApiError::BadRequest(MISSING_QUOTE_DATA.to_string()));
        };

        let quote = Quote {
            id: Uuid::new_v4(),
            bill_id,
            system_size,
            total_cost,
            created_at: Utc::now(),
        };
        let mut map = self
            .quotes
            .write()
            .map_err(|_| ApiError::InternalError("quote store lock poisoned".into()))?;
        map.insert(quote.id, quote.clone());
        tracing::info!(quote_id = %quote.id, bill_id = %quote.bill_id, system_size = quote.system_size, "quote saved");
        Ok(quote)
    }

    pub fn get(&self, id: Uuid) -> Option<Quote> {
        self.quotes.read().ok().and_then(|map| map.get(&id).cloned())
    }

    /// Quotes for one bill, oldest first.
    pub fn for_bill(&self, bill_id: &str) -> Vec<Quote> {
        let mut quotes: Vec<Quote> = match self.quotes.read() {
            Ok(map) => map.values().filter(|q| q.bill_id == bill_id).cloned().collect(),
            Err(_) => Vec::new(),
        };
        quotes.sort_by_key(|q| q.created_at);
        quotes
    }
}

/// Everything handlers need; cloned per request.
#[derive(Clone, Debug)]
pub struct AppState {
    pub tables: &'static ReferenceTables,
    pub catalog: CatalogService,
    pub quotes: QuoteStore,
}

impl AppState {
    pub fn new(catalog: CatalogService) -> Self {
        Self {
            tables: &ReferenceTables::STANDARD,
            catalog,
            quotes: QuoteStore::new(),
        }
    }
}

impl FromRef<AppState> for CatalogService {
    fn from_ref(state: &AppState) -> Self {
        state.catalog.clone()
    }
}

impl FromRef<AppState> for QuoteStore {
    fn from_ref(state: &AppState) -> Self {
        state.quotes.clone()
    }
}
