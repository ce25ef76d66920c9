use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use backoffice_api::background::{
    access_log_cleanup, cart_cleanup, session_cleanup, subscription_sweep,
};
use backoffice_api::bootstrap;
use backoffice_api::config::ServerConfig;
use backoffice_api::notifications::NotificationDispatcher;
use backoffice_api::router::build_app_router;
use backoffice_api::services::SubscriptionService;
use backoffice_api::state::AppState;
use backoffice_events::{EventBus, MessageSender, TelegramClient};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "backoffice_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(
        host = %config.host,
        port = %config.port,
        telegram_enabled = config.telegram.bot_token.is_some(),
        "Loaded server configuration"
    );

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = backoffice_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Database connection pool created");

    backoffice_db::health_check(&pool)
        .await
        .expect("Database health check failed");

    backoffice_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    bootstrap::ensure_admin(&pool, &config.admin_bootstrap)
        .await
        .expect("Failed to bootstrap admin account");

    // --- Outbound Telegram ---
    let telegram: Arc<dyn MessageSender> = Arc::new(TelegramClient::new(config.telegram.clone()));

    // --- Event bus ---
    let event_bus = Arc::new(EventBus::default());

    let dispatcher = NotificationDispatcher::new(pool.clone(), Arc::clone(&telegram));
    let dispatcher_handle = tokio::spawn(dispatcher.run(event_bus.subscribe()));

    // --- Background jobs ---
    let jobs_cancel = CancellationToken::new();

    let cleanup_handle = tokio::spawn(session_cleanup::run(pool.clone(), jobs_cancel.clone()));

    let sweep_handle = tokio::spawn(subscription_sweep::run(
        SubscriptionService::new(pool.clone(), Arc::clone(&event_bus)),
        config.sweep_interval_secs,
        config.expiry_warning_days,
        jobs_cancel.clone(),
    ));

    let cart_handle = tokio::spawn(cart_cleanup::run(pool.clone(), jobs_cancel.clone()));

    let access_log_handle = tokio::spawn(access_log_cleanup::run(
        pool.clone(),
        config.access_log_retention_days,
        jobs_cancel.clone(),
    ));

    tracing::info!(
        "Background services started (notifications, session/cart/access log cleanup, subscription sweep)"
    );

    // --- App state ---
    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        event_bus: Arc::clone(&event_bus),
        telegram,
    };

    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    let grace = Duration::from_secs(config.shutdown_timeout_secs);

    jobs_cancel.cancel();
    let _ = tokio::time::timeout(grace, cleanup_handle).await;
    let _ = tokio::time::timeout(grace, sweep_handle).await;
    let _ = tokio::time::timeout(grace, cart_handle).await;
    let _ = tokio::time::timeout(grace, access_log_handle).await;
    tracing::info!("Background jobs stopped");

    // Last sender: dropping it closes the channel and ends the dispatcher.
    drop(event_bus);
    let _ = tokio::time::timeout(grace, dispatcher_handle).await;

    tracing::info!("Graceful shutdown complete");
}

/// Resolve on SIGINT, or SIGTERM on Unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl-C, starting graceful shutdown"),
        _ = terminate => tracing::info!("Received SIGTERM, starting graceful shutdown"),
    }
}
