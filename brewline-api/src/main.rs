use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use brewline_api::{app, AppState, AuthConfig, Repositories};
use brewline_order::{PaymentOrderBroker, RazorpayGateway};
use brewline_store::{app_config::Config, BroadcastEventBus, DbClient};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "brewline_api=debug,tower_http=debug,axum::rejection=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().expect("Failed to load config");
    tracing::info!("Starting Brewline API on port {}", config.server.port);

    // No fallback credential: refuse to start without one.
    let gateway = RazorpayGateway::new(
        config.gateway.key_id.clone(),
        config.gateway.key_secret.clone(),
        config.gateway.base_url.clone(),
        Duration::from_secs(config.gateway.timeout_seconds),
    )
    .expect("Payment gateway credentials are not configured");
    let gateway_secret = gateway.key_secret().clone();
    let publishable_key = gateway.key_id().to_string();
    let broker = PaymentOrderBroker::new(Arc::new(gateway), publishable_key, config.gateway.currency.clone());

    let repos = match &config.database.url {
        Some(url) => {
            let db = DbClient::new(url, config.database.max_connections)
                .await
                .expect("Failed to connect to Postgres");
            db.migrate().await.expect("Failed to run migrations");
            Repositories::postgres(&db)
        }
        None => {
            tracing::warn!("No database configured; orders and notifications are kept in memory");
            Repositories::in_memory(config.delivery.seed.clone())
        }
    };

    let app_state = AppState::new(
        broker,
        gateway_secret,
        repos,
        BroadcastEventBus::new(100),
        AuthConfig {
            secret: config.auth.jwt_secret.clone(),
            issuer: config.auth.issuer.clone(),
        },
    );

    let app = app(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.expect("Failed to bind");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
