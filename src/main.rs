mod routes;
mod controllers;
mod services;
mod models;
mod api_docs;
mod shared_state;
mod config;
mod errors;
mod telemetry;

use std::any::Any;
use std::time::Duration;

use axum::{
    http::{header, HeaderName, HeaderValue, Method, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::get,
    Json, Router,
};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use utoipa::OpenApi;
use utoipa_scalar::Scalar;

use crate::api_docs::ApiDoc;
use crate::config::{Config, CorsConfig};
use crate::errors::{ErrorBody, CALCULATION_FAILED_MESSAGE};
use crate::routes::api_routes::api_routes;
use crate::services::catalog_service::CatalogService;
use crate::shared_state::AppState;

#[tokio::main]
async fn main() {
    // 1. Load configuration
    let (config, config_path) = match Config::load_or_default() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    // 2. Logging
    telemetry::init_tracing(&config.log);
    match &config_path {
        Some(path) => info!(%path, "configuration loaded"),
        None => warn!("no configuration file found, using defaults"),
    }

    // 3. Shared state
    let catalog = match CatalogService::new(&config.catalog) {
        Ok(c) => c,
        Err(e) => {
            error!(error = %e, "catalog client unavailable, serving built-in catalog");
            CatalogService::offline()
        }
    };
    if config.catalog.base_url.is_none() {
        info!("no catalog base_url configured, serving built-in catalog");
    }
    let state = AppState::new(catalog);

    // 4. HTTP server
    let app = build_app(state, &config.cors);
    let addr = config.server.socket_addr();
    info!(%addr, "sizing API listening");
    info!("Scalar UI: http://{}/scalar", addr);

    let handle = axum_server::Handle::new();
    let shutdown_handle = handle.clone();
    tokio::spawn(async move {
        telemetry::shutdown_signal().await;
        shutdown_handle.graceful_shutdown(Some(Duration::from_secs(10)));
    });

    if let Err(e) = axum_server::bind(addr)
        .handle(handle)
        .serve(app.into_make_service())
        .await
    {
        error!(error = %e, "server error");
        std::process::exit(1);
    }
    info!("shutdown complete");
}

fn build_app(state: AppState, cors: &CorsConfig) -> Router {
    Router::new()
        .nest("/api", api_routes(state))
        .route("/scalar", get(|| async {
            Html(Scalar::new(ApiDoc::openapi()).to_html())
        }))
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(cors_layer(cors))
        .layer(TraceLayer::new_for_http())
}

/// Mirrors the caller's Origin unless an allow-list is configured.
fn cors_layer(cfg: &CorsConfig) -> CorsLayer {
    let origin = if cfg.allowed_origins.is_empty() {
        AllowOrigin::mirror_request()
    } else {
        let origins: Vec<HeaderValue> = cfg
            .allowed_origins
            .iter()
            .filter_map(|o| match HeaderValue::from_str(o) {
                Ok(v) => Some(v),
                Err(_) => {
                    warn!(origin = %o, "ignoring invalid CORS origin");
                    None
                }
            })
            .collect();
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            HeaderName::from_static("apikey"),
            HeaderName::from_static("x-client-info"),
        ])
}

fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    error!(panic = %detail, "handler panicked");
    let body = ErrorBody { error: CALCULATION_FAILED_MESSAGE.to_string() };
    (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
}
