//! shopcart manages customer accounts of a small e-commerce backend.

#![forbid(unsafe_code)]
#![deny(unused_mut)]

pub mod config;
mod crypto;
pub mod customer;
mod database;
pub mod error;
mod middleware;
mod router;
pub mod telemetry;
mod token;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{Method, StatusCode, header};
use axum::routing::{get, post};
use axum::{Router, middleware as AxumMiddleware};
use metrics_exporter_prometheus::PrometheusHandle;
use tower::ServiceBuilder;
use tower_http::LatencyUnit;
use tower_http::cors::{Any, CorsLayer};
use tower_http::sensitive_headers::SetSensitiveHeadersLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{
    DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer,
};

use crate::config::Configuration;
use crate::customer::CustomerService;
use crate::customer::memory::MemoryCustomerRepository;
use crate::customer::postgres::PgCustomerRepository;
use crate::token::TokenManager;

/// MUST NEVER be used in production.
#[cfg(test)]
pub async fn make_request(
    token: Option<&str>,
    app: Router,
    method: Method,
    path: &str,
    body: String,
) -> axum::http::Response<axum::body::Body> {
    use axum::extract::Request;
    use tower::util::ServiceExt;

    let mut request = Request::builder()
        .method(method)
        .uri(path)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }

    app.oneshot(request.body(axum::body::Body::from(body)).unwrap())
        .await
        .unwrap()
}

/// State sharing between routes.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Configuration>,
    pub customers: CustomerService,
    pub token: TokenManager,
    pub metrics: Option<PrometheusHandle>,
}

/// Create router.
pub fn app(state: AppState) -> Router {
    let middleware = ServiceBuilder::new()
        // Add high level tracing/logging to all requests.
        .layer(
            TraceLayer::new_for_http()
                .on_body_chunk(|chunk: &Bytes, latency: Duration, _span: &tracing::Span| {
                    tracing::trace!(size_bytes = chunk.len(), latency = ?latency, "sending body chunk")
                })
                .make_span_with(DefaultMakeSpan::new().include_headers(true).level(tracing::Level::INFO))
                .on_request(DefaultOnRequest::new())
                .on_response(DefaultOnResponse::new().include_headers(true).latency_unit(LatencyUnit::Micros)),
        )
        // Set a timeout.
        .layer(TimeoutLayer::with_status_code(StatusCode::REQUEST_TIMEOUT, Duration::from_secs(10)))
        // Remove sensitive headers from trace.
        .layer(SetSensitiveHeadersLayer::new([header::AUTHORIZATION, header::COOKIE]))
        // Add CORS preflight support.
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE, Method::OPTIONS])
                .allow_headers(Any)
                .vary([header::AUTHORIZATION]),
        );

    let mut routes = Router::new()
        // `GET /status.json` goes to `status`.
        .route("/status.json", get(router::status::status))
        // `POST /api/auth/login` goes to `login`.
        .route("/api/auth/login", post(router::login::handler))
        .nest("/api/customers", router::customers::router(state.clone()));

    if state.metrics.is_some() {
        // `GET /metrics` renders Prometheus metrics.
        routes = routes.route("/metrics", get(render_metrics));
    }

    routes
        .with_state(state)
        .route_layer(AxumMiddleware::from_fn(telemetry::track))
        .layer(middleware)
}

async fn render_metrics(State(state): State<AppState>) -> String {
    state
        .metrics
        .as_ref()
        .map(PrometheusHandle::render)
        .unwrap_or_default()
}

/// Initialize the application state.
pub async fn initialize_state(
    config: Arc<Configuration>,
    metrics: Option<PrometheusHandle>,
) -> Result<AppState, Box<dyn std::error::Error + Send + Sync>> {
    let repo: Arc<dyn customer::CustomerRepository> = match &config.postgres {
        Some(postgres) => {
            let db = database::Database::from_config(postgres).await?;
            // execute migrations scripts on start.
            db.migrate().await?;

            Arc::new(PgCustomerRepository::new(db.postgres))
        },
        None => {
            tracing::warn!(
                "missing `postgres` entry on `config.yaml` file, customers are kept in memory"
            );

            Arc::new(MemoryCustomerRepository::new())
        },
    };

    let encoder = Arc::new(crypto::Argon2Encoder::new(config.argon2.clone())?);

    // handle jwt.
    let mut token = TokenManager::new(&config.url, &config.token.secret)?;
    if let Some(audience) = &config.token.audience {
        token.audience(audience);
    }
    if let Some(expires_in) = config.token.expires_in {
        token.expires_in(expires_in);
    }

    Ok(AppState {
        customers: CustomerService::new(repo, encoder),
        config,
        token,
        metrics,
    })
}

/// Read configuration from `CONFIG_PATH`, or `config.yaml` by default.
pub fn read_config() -> Result<Arc<Configuration>, url::ParseError> {
    let config = Configuration::default();
    let config = match std::env::var("CONFIG_PATH") {
        Ok(path) => config.path(PathBuf::from(path)),
        Err(_) => config,
    };

    config.read()
}
