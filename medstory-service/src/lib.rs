pub mod config;
pub mod db;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod store;
pub mod utils;

use axum::{
    http::{header, HeaderValue, Method},
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
    Router,
};
use service_core::middleware::{
    rate_limit::ip_rate_limit_middleware, security_headers::security_headers_middleware,
    tracing::request_id_middleware,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

use crate::config::AppConfig;
use crate::models::AuditLog;
use crate::services::{AuthService, JwtService, LinkService, TimelineService};
use crate::store::{Database, Store};
use service_core::error::AppError;

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub db: Database,
    pub store: Arc<dyn Store>,
    pub jwt: JwtService,
    pub auth: AuthService,
    pub links: LinkService,
    pub timeline: TimelineService,
    pub login_rate_limiter: service_core::middleware::rate_limit::IpRateLimiter,
    pub register_rate_limiter: service_core::middleware::rate_limit::IpRateLimiter,
    pub password_reset_rate_limiter: service_core::middleware::rate_limit::IpRateLimiter,
    pub ip_rate_limiter: service_core::middleware::rate_limit::IpRateLimiter,
}

impl AppState {
    /// Record an audit entry without holding up the request.
    pub fn audit(&self, entry: AuditLog) {
        let store = self.store.clone();
        tokio::spawn(async move {
            if let Err(e) = store.record_audit(&entry).await {
                tracing::error!(error = %e, "Failed to record audit entry");
            }
        });
    }
}

pub fn build_router(state: AppState) -> Router {
    // Sensitive auth routes each get their own per-IP budget.
    let login_limiter = state.login_rate_limiter.clone();
    let login_route = Router::new()
        .route("/api/auth/login", post(handlers::auth::login))
        .layer(from_fn_with_state(login_limiter, ip_rate_limit_middleware));

    let register_limiter = state.register_rate_limiter.clone();
    let register_route = Router::new()
        .route("/api/auth/register", post(handlers::auth::register))
        .layer(from_fn_with_state(
            register_limiter,
            ip_rate_limit_middleware,
        ));

    let reset_limiter = state.password_reset_rate_limiter.clone();
    let reset_request_route = Router::new()
        .route(
            "/api/auth/forgot-password",
            post(handlers::auth::forgot_password),
        )
        .layer(from_fn_with_state(reset_limiter, ip_rate_limit_middleware));

    // Routes behind bearer-token authentication.
    let protected_routes = Router::new()
        .route(
            "/api/links",
            post(handlers::sharing::create_link).get(handlers::sharing::list_links),
        )
        .route(
            "/api/links/:link_id",
            axum::routing::delete(handlers::sharing::revoke_link),
        )
        .route(
            "/api/timeline",
            get(handlers::timeline::get_timeline).post(handlers::timeline::post_timeline),
        )
        .layer(from_fn_with_state(
            state.clone(),
            middleware::auth_middleware,
        ));

    let ip_limiter = state.ip_rate_limiter.clone();

    Router::new()
        .route("/health", get(health_check))
        .route("/api/auth/verify-email", post(handlers::auth::verify_email))
        .route("/api/auth/refresh", post(handlers::auth::refresh))
        .route("/api/auth/logout", post(handlers::auth::logout))
        .route(
            "/api/auth/reset-password",
            post(handlers::auth::reset_password),
        )
        // Public redemption endpoint: the token is the capability.
        .route(
            "/api/links/access/:token",
            get(handlers::sharing::access_link),
        )
        .merge(login_route)
        .merge(register_route)
        .merge(reset_request_route)
        .merge(protected_routes)
        .nest_service(
            "/media",
            ServeDir::new(&state.config.storage.media_dir),
        )
        .with_state(state.clone())
        // Global IP rate limiting
        .layer(from_fn_with_state(ip_limiter, ip_rate_limit_middleware))
        // Tracing layer with request-scoped span
        .layer(TraceLayer::new_for_http().make_span_with(
            |request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                    version = ?request.version(),
                )
            },
        ))
        .layer(from_fn(request_id_middleware))
        .layer(from_fn(security_headers_middleware))
        .layer(
            CorsLayer::new()
                .allow_origin(
                    state
                        .config
                        .security
                        .allowed_origins
                        .iter()
                        .filter_map(|o| match o.parse::<HeaderValue>() {
                            Ok(v) => Some(v),
                            Err(e) => {
                                tracing::error!("Invalid CORS origin '{}': {}", o, e);
                                None
                            }
                        })
                        .collect::<Vec<HeaderValue>>(),
                )
                .allow_methods([
                    Method::GET,
                    Method::POST,
                    Method::PATCH,
                    Method::DELETE,
                    Method::OPTIONS,
                ])
                .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]),
        )
}

/// Service health check.
pub async fn health_check(
    axum::extract::State(state): axum::extract::State<AppState>,
) -> Result<axum::Json<serde_json::Value>, AppError> {
    state.db.health_check().await.map_err(|e| {
        tracing::error!(error = %e, "Database health check failed");
        AppError::ServiceUnavailable
    })?;

    Ok(axum::Json(serde_json::json!({
        "status": "healthy",
        "service": state.config.service_name,
        "version": state.config.service_version,
    })))
}
