use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Finalised quote as submitted by the quote page.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QuoteDraft {
    #[serde(default)]
    pub bill_id: Option<String>,
    /// kW
    #[serde(default)]
    pub system_size: Option<f64>,
    #[serde(default)]
    pub total_cost: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    pub id: Uuid,
    pub bill_id: String,
    pub system_size: f64,
    pub total_cost: f64,
    pub created_at: DateTime<Utc>,
}
