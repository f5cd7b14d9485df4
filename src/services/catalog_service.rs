//! Remote equipment catalog client.
//!
//! Talks to a PostgREST-style database: one RPC function per record type
//! under `{base_url}/rest/v1/rpc/`, plus a direct `panels` table read when
//! the panel RPC is unavailable. Every category that cannot be fetched, or
//! comes back empty, is replaced by the built-in records, so callers always
//! get a usable catalog.

use std::time::Duration;

use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::CatalogConfig;
use crate::models::catalog::{
    BracketCost, Catalog, CatalogSource, Inverter, Panel, StructureType, VariableCost,
};

const RETRY_BACKOFF: Duration = Duration::from_millis(250);

/// The size lookup RPC may return one row or a set of rows.
#[derive(Deserialize)]
#[serde(untagged)]
enum BracketRows {
    One(BracketCost),
    Many(Vec<BracketCost>),
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("catalog request failed: {0}")]
    Http(#[from] reqwest::Error),
}

#[derive(Debug, Clone)]
pub struct CatalogService {
    client: Client,
    base_url: Option<String>,
    api_key: Option<String>,
    max_retries: u32,
}

impl CatalogService {
    pub fn new(cfg: &CatalogConfig) -> Result<Self, CatalogError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_s.max(1)))
            .build()?;
        Ok(Self {
            client,
            base_url: cfg.base_url.as_ref().map(|u| u.trim_end_matches('/').to_string()),
            api_key: cfg.api_key.clone(),
            max_retries: cfg.max_retries,
        })
    }

    /// Built-in catalog only, no network.
    pub fn offline() -> Self {
        Self { client: Client::new(), base_url: None, api_key: None, max_retries: 0 }
    }

    fn request(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => builder.header("apikey", key).bearer_auth(key),
            None => builder,
        }
    }

    async fn call<T: DeserializeOwned>(&self, base: &str, function: &str, args: Value) -> Result<T, CatalogError> {
        let url = format!("{base}/rest/v1/rpc/{function}");
        let resp = self
            .request(self.client.post(&url).json(&args))
            .send()
            .await?
            .error_for_status()?;
        Ok(resp.json::<T>().await?)
    }

    async fn rpc<T: DeserializeOwned>(&self, base: &str, function: &str) -> Result<Vec<T>, CatalogError> {
        self.call::<Vec<T>>(base, function, json!({})).await
    }

    /// Direct read of available panels, ascending power.
    async fn panels_table(&self, base: &str) -> Result<Vec<Panel>, CatalogError> {
        let url = format!("{base}/rest/v1/panels");
        let resp = self
            .request(self.client.get(&url).query(&[
                ("select", "*"),
                ("availability", "eq.true"),
                ("order", "power.asc"),
            ]))
            .send()
            .await?
            .error_for_status()?;
        Ok(resp.json::<Vec<Panel>>().await?)
    }

    async fn category<T: DeserializeOwned>(&self, base: &str, function: &str, have: bool) -> Option<Vec<T>> {
        if have {
            return None;
        }
        match self.rpc::<T>(base, function).await {
            Ok(rows) if !rows.is_empty() => {
                debug!(function, rows = rows.len(), "catalog category fetched");
                Some(rows)
            }
            Ok(_) => {
                warn!(function, "catalog category empty");
                None
            }
            Err(e) => {
                warn!(function, error = %e, "catalog category fetch failed");
                None
            }
        }
    }

    async fn panels(&self, base: &str, have: bool) -> Option<Vec<Panel>> {
        if have {
            return None;
        }
        if let Some(rows) = self.category::<Panel>(base, "fetch_panels", false).await {
            return Some(rows);
        }
        match self.panels_table(base).await {
            Ok(rows) if !rows.is_empty() => Some(rows),
            Ok(_) => None,
            Err(e) => {
                warn!(error = %e, "panel table fallback failed");
                None
            }
        }
    }

    /// Bracket band for one system size via the `get_bracket_costs_for_size`
    /// RPC. An empty answer means no band covers the size; only a failed
    /// request falls back to the built-in bands.
    pub async fn bracket_for_size(&self, size_kw: f64) -> Option<BracketCost> {
        let builtin = || Catalog::builtin().bracket_for_size(size_kw).cloned();
        let Some(base) = self.base_url.as_deref() else {
            return builtin();
        };

        match self
            .call::<Option<BracketRows>>(base, "get_bracket_costs_for_size", json!({ "p_size": size_kw }))
            .await
        {
            Ok(Some(BracketRows::One(b))) => Some(b),
            Ok(Some(BracketRows::Many(rows))) => rows.into_iter().next(),
            Ok(None) => None,
            Err(e) => {
                warn!(size_kw, error = %e, "bracket lookup failed, using built-in bands");
                builtin()
            }
        }
    }

    /// Fetches every category concurrently, retrying the missing ones up to
    /// `max_retries` times, then fills the gaps from the built-in catalog.
    pub async fn fetch_all(&self) -> Catalog {
        let Some(base) = self.base_url.as_deref() else {
            return Catalog::builtin();
        };

        let mut panels: Option<Vec<Panel>> = None;
        let mut inverters: Option<Vec<Inverter>> = None;
        let mut structure_types: Option<Vec<StructureType>> = None;
        let mut bracket_costs: Option<Vec<BracketCost>> = None;
        let mut variable_costs: Option<Vec<VariableCost>> = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                info!(attempt = attempt + 1, "retrying catalog fetch");
                tokio::time::sleep(RETRY_BACKOFF * attempt).await;
            }
            let (p, i, s, b, v) = futures_util::join!(
                self.panels(base, panels.is_some()),
                self.category::<Inverter>(base, "fetch_inverters", inverters.is_some()),
                self.category::<StructureType>(base, "fetch_structure_types", structure_types.is_some()),
                self.category::<BracketCost>(base, "fetch_bracket_costs", bracket_costs.is_some()),
                self.category::<VariableCost>(base, "fetch_variable_costs", variable_costs.is_some())
            );
            panels = panels.or(p);
            inverters = inverters.or(i);
            structure_types = structure_types.or(s);
            bracket_costs = bracket_costs.or(b);
            variable_costs = variable_costs.or(v);

            if panels.is_some()
                && inverters.is_some()
                && structure_types.is_some()
                && bracket_costs.is_some()
                && variable_costs.is_some()
            {
                break;
            }
        }

        let builtin = Catalog::builtin();
        let fetched = [
            panels.is_some(),
            inverters.is_some(),
            structure_types.is_some(),
            bracket_costs.is_some(),
            variable_costs.is_some(),
        ];
        let source = if fetched.iter().all(|f| *f) {
            CatalogSource::Remote
        } else if fetched.iter().any(|f| *f) {
            CatalogSource::Partial
        } else {
            CatalogSource::Builtin
        };
        if source != CatalogSource::Remote {
            warn!(?source, "using built-in equipment for unavailable catalog categories");
        }

        Catalog {
            panels: panels.unwrap_or(builtin.panels),
            inverters: inverters.unwrap_or(builtin.inverters),
            structure_types: structure_types.unwrap_or(builtin.structure_types),
            bracket_costs: bracket_costs.unwrap_or(builtin.bracket_costs),
            variable_costs: variable_costs.unwrap_or(builtin.variable_costs),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn service(server: &MockServer, max_retries: u32) -> CatalogService {
        CatalogService::new(&CatalogConfig {
            base_url: Some(format!("{}/", server.uri())),
            api_key: Some("anon-key".into()),
            timeout_s: 2,
            max_retries,
        })
        .unwrap()
    }

    async fn mount_rpc(server: &MockServer, function: &str, body: serde_json::Value) {
        Mock::given(method("POST"))
            .and(path(format!("/rest/v1/rpc/{function}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(server)
            .await;
    }

    async fn mount_all(server: &MockServer) {
        mount_rpc(server, "fetch_panels", json!([
            { "id": "p9", "brand": "Trina", "power": 600, "price": 61000, "default_choice": true }
        ]))
        .await;
        mount_rpc(server, "fetch_inverters", json!([
            { "id": "i9", "brand": "Growatt", "power": 8, "price": 150000 }
        ]))
        .await;
        mount_rpc(server, "fetch_structure_types", json!([
            { "id": "s9", "l2": false, "custom_cost": 9000, "abs_cost": 6000 }
        ]))
        .await;
        mount_rpc(server, "fetch_bracket_costs", json!([
            { "id": "b9", "min_size": 1, "max_size": 20, "dc_cable": 320, "ac_cable": 410, "accessories": 9000 }
        ]))
        .await;
        mount_rpc(server, "fetch_variable_costs", json!([
            { "id": "v9", "cost_name": "installation", "cost": 30000 }
        ]))
        .await;
    }

    #[tokio::test]
    async fn test_no_base_url_serves_builtin() {
        let catalog = CatalogService::offline().fetch_all().await;
        assert_eq!(catalog, Catalog::builtin());
    }

    #[tokio::test]
    async fn test_all_categories_remote() {
        let server = MockServer::start().await;
        mount_all(&server).await;
        let catalog = service(&server, 0).fetch_all().await;
        assert_eq!(catalog.source, CatalogSource::Remote);
        assert_eq!(catalog.panels[0].brand, "Trina");
        assert_eq!(catalog.inverters[0].power, 8.0);
        assert_eq!(catalog.bracket_for_size(12.0).map(|b| b.id.as_str()), Some("b9"));
    }

    #[tokio::test]
    async fn test_api_key_is_sent() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/rest/v1/rpc/fetch_inverters"))
            .and(header("apikey", "anon-key"))
            .and(header("authorization", "Bearer anon-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "id": "i1", "brand": "Huawei", "power": 10, "price": 175000 }
            ])))
            .mount(&server)
            .await;
        let catalog = service(&server, 0).fetch_all().await;
        assert_eq!(catalog.inverters[0].price, 175_000);
    }

    #[tokio::test]
    async fn test_missing_categories_fall_back() {
        let server = MockServer::start().await;
        mount_rpc(&server, "fetch_inverters", json!([
            { "id": "i1", "brand": "Huawei", "power": 10, "price": 175000 }
        ]))
        .await;
        mount_rpc(&server, "fetch_variable_costs", json!([])).await;

        let catalog = service(&server, 0).fetch_all().await;
        let builtin = Catalog::builtin();
        assert_eq!(catalog.source, CatalogSource::Partial);
        assert_eq!(catalog.inverters.len(), 1);
        assert_eq!(catalog.panels, builtin.panels);
        assert_eq!(catalog.variable_costs, builtin.variable_costs);
    }

    #[tokio::test]
    async fn test_unreachable_catalog_is_builtin() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        let catalog = service(&server, 0).fetch_all().await;
        assert_eq!(catalog.source, CatalogSource::Builtin);
        assert_eq!(catalog.panels, Catalog::builtin().panels);
    }

    #[tokio::test]
    async fn test_panel_table_fallback() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/panels"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "id": "t1", "brand": "Canadian Solar", "power": 550, "price": 59000 }
            ])))
            .mount(&server)
            .await;
        let catalog = service(&server, 0).fetch_all().await;
        assert_eq!(catalog.panels[0].brand, "Canadian Solar");
        assert!(!catalog.panels[0].default_choice);
    }

    #[tokio::test]
    async fn test_failed_category_is_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/rest/v1/rpc/fetch_inverters"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        mount_all(&server).await;

        let catalog = service(&server, 1).fetch_all().await;
        assert_eq!(catalog.source, CatalogSource::Remote);
        assert_eq!(catalog.inverters[0].brand, "Growatt");
    }

    #[tokio::test]
    async fn test_bracket_lookup_is_a_single_rpc() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/rest/v1/rpc/get_bracket_costs_for_size"))
            .and(body_json(json!({ "p_size": 12.5 })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!(
                { "id": "b7", "min_size": 10, "max_size": 15, "dc_cable": 330, "ac_cable": 420, "accessories": 12000 }
            )))
            .expect(1)
            .mount(&server)
            .await;

        let bracket = service(&server, 2).bracket_for_size(12.5).await;
        assert_eq!(bracket.map(|b| b.id), Some("b7".to_string()));
    }

    #[tokio::test]
    async fn test_bracket_lookup_accepts_row_set() {
        let server = MockServer::start().await;
        mount_rpc(&server, "get_bracket_costs_for_size", json!([
            { "id": "b8", "min_size": 5.5, "max_size": 10, "dc_cable": 310, "ac_cable": 405, "accessories": 10000 }
        ]))
        .await;
        let bracket = service(&server, 0).bracket_for_size(7.0).await;
        assert_eq!(bracket.map(|b| b.accessories), Some(10_000));
    }

    #[tokio::test]
    async fn test_bracket_lookup_empty_answer_is_none() {
        let server = MockServer::start().await;
        mount_rpc(&server, "get_bracket_costs_for_size", json!(null)).await;
        assert!(service(&server, 0).bracket_for_size(3.0).await.is_none());
    }

    #[tokio::test]
    async fn test_bracket_lookup_falls_back_when_unreachable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        let bracket = service(&server, 0).bracket_for_size(3.0).await;
        assert_eq!(bracket, Catalog::builtin().bracket_for_size(3.0).cloned());
        assert!(CatalogService::offline().bracket_for_size(9.0).await.is_none());
    }
}
