//! # atelier: workshop data service
//!
//! `atelier` stores the business data of tailoring workshops ("ateliers"): clients, catalog
//! models, appointments, orders, stations, supplies, notifications, expenses and tutorials.
//! Each of these lives in its own collection, anchored to one owning atelier record that
//! also carries the subscription block and a handful of profile fields.
//!
//! Clients do not sync record by record. They pull the whole atelier as one composite
//! aggregate and push a complete data set back, which replaces everything stored.
//!
//! ## Architecture
//!
//! ```text
//! HTTP (api::handlers)
//!   │
//!   ├─ snapshot::AtelierSnapshots   fan-in read / fan-out replace, legacy reconciliation
//!   │     │
//!   │     ├─ AtelierStore           owning records
//!   │     └─ DocumentStore          nine child collections
//!   │
//!   └─ AtelierStore                 registration and lookup
//! ```
//!
//! Both store traits are implemented by [`db::store::PostgresStore`] (one JSONB table per
//! collection) and [`db::store::MemoryStore`]. Neither offers cross-collection transactions;
//! see [`snapshot`] for how a half-finished replace is reported.
//!
//! ## Quick Start
//!
//! ```no_run
//! use clap::Parser;
//! use atelier::{Application, Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let args = atelier::config::Args::parse();
//!     let config = Config::load(&args)?;
//!
//!     atelier::telemetry::init_telemetry(config.enable_otel_export)?;
//!
//!     let app = Application::new(config).await?;
//!     app.serve(async {
//!         tokio::signal::ctrl_c().await.expect("Failed to listen for Ctrl+C");
//!     }).await?;
//!
//!     Ok(())
//! }
//! ```
pub mod api;
pub mod config;
pub mod db;
pub mod errors;
mod openapi;
pub mod snapshot;
pub mod telemetry;
pub mod types;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

use std::sync::Arc;
use std::time::Duration;

use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderValue, Method, header};
use axum::{
    Json, Router,
    routing::{get, post},
};
use axum_prometheus::PrometheusMetricLayer;
use bon::Builder;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{Level, debug, info, instrument};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

pub use config::Config;
use config::{CorsOrigin, DatabaseConfig, PoolSettings};
use db::store::{AtelierStore, DocumentStore, MemoryStore, PostgresStore};
use openapi::ApiDoc;
use snapshot::AtelierSnapshots;

/// Application state shared across all request handlers.
#[derive(Clone, Builder)]
pub struct AppState {
    pub config: Config,
    pub ateliers: Arc<dyn AtelierStore>,
    pub snapshots: AtelierSnapshots,
}

/// Get the atelier database migrator
pub fn migrator() -> sqlx::migrate::Migrator {
    sqlx::migrate!("./migrations")
}

/// Stores selected by configuration, plus the pool behind them when there is one.
struct Storage {
    ateliers: Arc<dyn AtelierStore>,
    documents: Arc<dyn DocumentStore>,
    pool: Option<PgPool>,
}

async fn connect_pool(url: &str, settings: &PoolSettings) -> anyhow::Result<PgPool> {
    let mut options = PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .min_connections(settings.min_connections)
        .acquire_timeout(Duration::from_secs(settings.acquire_timeout_secs));

    if settings.idle_timeout_secs > 0 {
        options = options.idle_timeout(Duration::from_secs(settings.idle_timeout_secs));
    }
    if settings.max_lifetime_secs > 0 {
        options = options.max_lifetime(Duration::from_secs(settings.max_lifetime_secs));
    }

    Ok(options.connect(url).await?)
}

async fn setup_storage(config: &Config) -> anyhow::Result<Storage> {
    match &config.database {
        DatabaseConfig::Memory => {
            info!("Using in-memory storage: data will be lost on shutdown");
            let store = Arc::new(MemoryStore::new());
            Ok(Storage {
                ateliers: store.clone(),
                documents: store,
                pool: None,
            })
        }
        DatabaseConfig::External { url, pool } => {
            info!("Using external database");
            let pool = connect_pool(url, pool).await?;
            migrator().run(&pool).await?;

            let store = Arc::new(PostgresStore::new(pool.clone()));
            Ok(Storage {
                ateliers: store.clone(),
                documents: store,
                pool: Some(pool),
            })
        }
    }
}

/// Create CORS layer from configuration
fn create_cors_layer(config: &Config) -> anyhow::Result<CorsLayer> {
    let cors_config = &config.cors;

    // A literal "*" header value is rejected by tower-http, so a wildcard anywhere means any origin
    let allow_origin = if cors_config.allowed_origins.iter().any(|o| matches!(o, CorsOrigin::Wildcard)) {
        AllowOrigin::any()
    } else {
        let mut origins = Vec::new();
        for origin in &cors_config.allowed_origins {
            if let CorsOrigin::Url(url) = origin {
                origins.push(url.origin().ascii_serialization().parse::<HeaderValue>()?);
            }
        }
        AllowOrigin::list(origins)
    };

    let mut cors = CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::PUT])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(cors_config.allow_credentials);

    if let Some(max_age) = cors_config.max_age {
        cors = cors.max_age(Duration::from_secs(max_age));
    }

    Ok(cors)
}

/// Build the main application router with all endpoints and middleware.
///
/// - `/api/v1`: atelier registration and whole-aggregate read/replace
/// - `/healthz`, `/api/openapi.json`, `/api/docs`
/// - `/internal/metrics` when `enable_metrics` is set
#[instrument(skip_all)]
pub fn build_router(state: AppState) -> anyhow::Result<Router> {
    let config = state.config.clone();

    let api_routes = Router::new()
        .route("/ateliers", post(api::handlers::ateliers::create_atelier))
        .route("/ateliers/{atelier_id}", get(api::handlers::ateliers::get_atelier))
        .route(
            "/ateliers/{atelier_id}/data",
            get(api::handlers::snapshots::get_atelier_data).put(api::handlers::snapshots::replace_atelier_data),
        )
        .layer(DefaultBodyLimit::max(config.limits.max_payload_bytes))
        .with_state(state);

    let router = Router::new()
        .route("/healthz", get(|| async { "OK" }))
        .route("/api/openapi.json", get(|| async { Json(ApiDoc::openapi()) }))
        .nest("/api/v1", api_routes)
        .merge(Scalar::with_url("/api/docs", ApiDoc::openapi()));

    let mut router = router.layer(create_cors_layer(&config)?);

    // The Prometheus recorder is process-global, so this can only happen once per process
    if config.enable_metrics {
        let (prometheus_layer, metric_handle) = PrometheusMetricLayer::pair();
        router = router
            .route("/internal/metrics", get(|| async move { metric_handle.render() }))
            .layer(prometheus_layer);
    }

    let router = router.layer(
        TraceLayer::new_for_http()
            .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
            .on_request(DefaultOnRequest::new().level(Level::INFO))
            .on_response(DefaultOnResponse::new().level(Level::INFO)),
    );

    Ok(router)
}

/// The HTTP service together with the resources it owns.
///
/// 1. **Create**: [`Application::new`] connects storage and runs migrations
/// 2. **Serve**: [`Application::serve`] binds to a TCP port and handles requests until the
///    shutdown future resolves, then closes the pool and flushes telemetry
pub struct Application {
    router: Router,
    config: Config,
    pool: Option<PgPool>,
}

impl Application {
    /// Create a new application instance with storage chosen by `config.database`
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        debug!("Starting atelier service with configuration: {:#?}", config);

        let storage = setup_storage(&config).await?;
        let mut app = Self::new_with_stores(config, storage.ateliers, storage.documents).await?;
        app.pool = storage.pool;
        Ok(app)
    }

    /// Create an application over already-constructed stores.
    pub async fn new_with_stores(
        config: Config,
        ateliers: Arc<dyn AtelierStore>,
        documents: Arc<dyn DocumentStore>,
    ) -> anyhow::Result<Self> {
        let snapshots = AtelierSnapshots::new(ateliers.clone(), documents);

        let app_state = AppState::builder()
            .config(config.clone())
            .ateliers(ateliers)
            .snapshots(snapshots)
            .build();

        let router = build_router(app_state)?;

        Ok(Self {
            router,
            config,
            pool: None,
        })
    }

    /// Convert application into a test server (for tests)
    #[cfg(any(test, feature = "test-utils"))]
    pub fn into_test_server(self) -> axum_test::TestServer {
        axum_test::TestServer::new(self.router.into_make_service()).expect("Failed to create test server")
    }

    /// Start serving the application
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr).await?;
        info!(
            "Atelier service listening on http://{}, available at http://localhost:{}",
            bind_addr, self.config.port
        );

        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(shutdown)
            .await?;

        if let Some(pool) = self.pool {
            info!("Closing database connections...");
            pool.close().await;
        }

        info!("Shutting down telemetry...");
        telemetry::shutdown_telemetry();

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use crate::config::CorsOrigin;
    use crate::test_utils::*;
    use serde_json::Value;
    use url::Url;

    #[test_log::test(tokio::test)]
    async fn test_healthz() {
        let (app, _store) = create_test_app().await;

        let response = app.get("/healthz").await;
        response.assert_status_ok();
        response.assert_text("OK");
    }

    #[test_log::test(tokio::test)]
    async fn test_openapi_lists_snapshot_routes() {
        let (app, _store) = create_test_app().await;

        let response = app.get("/api/openapi.json").await;
        response.assert_status_ok();
        let spec: Value = response.json();

        assert!(spec["paths"]["/ateliers/{atelier_id}/data"]["get"].is_object());
        assert!(spec["paths"]["/ateliers/{atelier_id}/data"]["put"].is_object());
        assert!(spec["paths"]["/ateliers"]["post"].is_object());
    }

    #[test_log::test(tokio::test)]
    async fn test_docs_page_served() {
        let (app, _store) = create_test_app().await;

        app.get("/api/docs").await.assert_status_ok();
    }

    #[test]
    fn test_cors_layer_from_explicit_origins() {
        let mut config = create_test_config();
        config.cors.allowed_origins = vec![
            CorsOrigin::Url(Url::parse("https://atelier.example.com/").unwrap()),
            CorsOrigin::Url(Url::parse("http://localhost:5173").unwrap()),
        ];
        config.cors.allow_credentials = true;

        assert!(config.validate().is_ok());
        assert!(super::create_cors_layer(&config).is_ok());
    }

    #[test_log::test(tokio::test)]
    async fn test_cors_preflight_echoes_configured_origin() {
        let mut config = create_test_config();
        config.cors.allowed_origins = vec![CorsOrigin::Url(Url::parse("https://atelier.example.com").unwrap())];
        let store = std::sync::Arc::new(crate::db::store::MemoryStore::new());
        let app = create_test_app_with_config(config, store.clone(), store).await;

        let response = app
            .method(axum::http::Method::OPTIONS, "/api/v1/ateliers")
            .add_header("origin", "https://atelier.example.com")
            .add_header("access-control-request-method", "POST")
            .await;

        assert_eq!(
            response.headers().get("access-control-allow-origin").and_then(|v| v.to_str().ok()),
            Some("https://atelier.example.com")
        );
    }

    #[test_log::test(tokio::test)]
    async fn test_cors_preflight_allows_any_origin_by_default() {
        let (app, _store) = create_test_app().await;

        let response = app
            .method(axum::http::Method::OPTIONS, "/api/v1/ateliers")
            .add_header("origin", "https://somewhere.example")
            .add_header("access-control-request-method", "PUT")
            .await;

        assert_eq!(
            response.headers().get("access-control-allow-origin").and_then(|v| v.to_str().ok()),
            Some("*")
        );
    }
}
