use medstory_service::{
    build_router,
    config::AppConfig,
    db,
    services::{AuthService, EmailService, JwtService, LinkService, LocalStorage, OtpService, TimelineService},
    store::Database,
    AppState,
};
use service_core::middleware::rate_limit::create_ip_rate_limiter;
use service_core::observability::logging::init_tracing;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;

#[tokio::main]
async fn main() -> Result<(), service_core::error::AppError> {
    // Load configuration - fail fast if invalid
    let config = AppConfig::from_env()?;

    init_tracing(&config.service_name, &config.log_level);

    tracing::info!(
        service = %config.service_name,
        version = %config.service_version,
        environment = ?config.environment,
        "Starting medstory service"
    );

    // Database
    let pool = db::create_pool(&config.database).await?;
    db::run_migrations(&pool).await?;
    let database = Database::new(pool);
    let store = Arc::new(database.clone());
    tracing::info!("Database initialized");

    // Email
    let email = Arc::new(EmailService::new(&config.smtp)?);

    // Media storage
    let storage = Arc::new(
        LocalStorage::new(
            config.storage.media_dir.clone(),
            config.storage.public_base.clone(),
        )
        .await?,
    );

    // Core services
    let jwt = JwtService::new(&config.jwt);
    let otp = OtpService::new(store.clone(), email);
    let auth = AuthService::new(store.clone(), jwt.clone(), otp);
    let links = LinkService::new(store.clone());
    let timeline = TimelineService::new(store.clone(), storage);

    // Rate limiters
    let login_rate_limiter = create_ip_rate_limiter(
        config.rate_limit.login_attempts,
        config.rate_limit.login_window_seconds,
    );
    let register_rate_limiter = create_ip_rate_limiter(
        config.rate_limit.register_attempts,
        config.rate_limit.register_window_seconds,
    );
    let password_reset_rate_limiter = create_ip_rate_limiter(
        config.rate_limit.password_reset_attempts,
        config.rate_limit.password_reset_window_seconds,
    );
    let ip_rate_limiter = create_ip_rate_limiter(
        config.rate_limit.global_ip_limit,
        config.rate_limit.global_ip_window_seconds,
    );

    let state = AppState {
        config: config.clone(),
        db: database,
        store,
        jwt,
        auth,
        links,
        timeline,
        login_rate_limiter,
        register_rate_limiter,
        password_reset_rate_limiter,
        ip_rate_limiter,
    };

    let app = build_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.common.port));
    tracing::info!(address = %addr, "Listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("Service shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received SIGINT, starting graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        },
    }
}
