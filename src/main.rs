//! Service entry point.
//!
//! Wires configuration, PostgreSQL, Redis, the event fan-out, the
//! webhook ingestion pipeline, and the HTTP/WebSocket routers, then
//! serves until shutdown.

use std::sync::Arc;
use std::time::Duration;

use axum::routing::get;
use axum::Router;
use secrecy::ExposeSecret;
use sqlx::postgres::PgPoolOptions;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use enroll_gate::adapters::events::{FanoutPublisher, InMemoryEventBus, RedisEventPublisher};
use enroll_gate::adapters::http::{
    payment_router, subscriptions_router, PaymentAppState, SubscriptionsAppState,
};
use enroll_gate::adapters::locks::InProcessLockMap;
use enroll_gate::adapters::postgres::{
    PostgresCourseCatalog, PostgresInvoiceRepository, PostgresSubscriptionRepository,
    PostgresWebhookEventStore,
};
use enroll_gate::adapters::websocket::{
    websocket_router, RoomManager, WebSocketEventBridge, WebSocketState,
};
use enroll_gate::application::{
    ActivateOrderHandler, IngestWebhookHandler, ReconcileStaleHandler, ReplayStormHandler,
};
use enroll_gate::config::AppConfig;
use enroll_gate::domain::billing::GatewayWebhookVerifier;
use enroll_gate::ports::EventPublisher;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&config.server.log_level)?)
        .init();

    config.validate()?;
    info!(
        environment = ?config.server.environment,
        "Starting enrollment gateway"
    );

    // === Infrastructure ===

    let pool = PgPoolOptions::new()
        .min_connections(config.database.min_connections)
        .max_connections(config.database.max_connections)
        .acquire_timeout(config.database.acquire_timeout())
        .idle_timeout(config.database.idle_timeout())
        .max_lifetime(config.database.max_lifetime())
        .connect(&config.database.url)
        .await?;

    if config.database.run_migrations {
        info!("Running database migrations");
        sqlx::migrate!("./migrations").run(&pool).await?;
    }

    let redis_client = redis::Client::open(config.redis.url.as_str())?;
    let redis_conn = tokio::time::timeout(
        config.redis.connect_timeout(),
        redis_client.get_multiplexed_async_connection(),
    )
    .await??;

    // === Event fan-out ===

    let bus = Arc::new(InMemoryEventBus::new());
    let redis_publisher = Arc::new(RedisEventPublisher::new(redis_conn));
    let event_publisher: Arc<dyn EventPublisher> =
        Arc::new(FanoutPublisher::new(vec![bus.clone(), redis_publisher]));

    let room_manager = Arc::new(RoomManager::with_default_capacity());
    let event_bridge = WebSocketEventBridge::new_shared(room_manager.clone());
    event_bridge.register(&*bus);

    // === Repositories and pipeline ===

    let event_store = Arc::new(PostgresWebhookEventStore::new(pool.clone()));
    let invoices = Arc::new(PostgresInvoiceRepository::new(pool.clone()));
    let subscriptions = Arc::new(PostgresSubscriptionRepository::new(pool.clone()));
    let catalog = Arc::new(PostgresCourseCatalog::new(pool.clone()));
    let locks = Arc::new(InProcessLockMap::new(Duration::from_millis(
        config.processing.lock_wait_ms,
    )));

    let verifier = GatewayWebhookVerifier::with_tolerances(
        config.payment.gateway_webhook_secret.expose_secret().clone(),
        config.payment.signature_max_age_secs,
        config.payment.signature_max_skew_secs,
    );

    let activation = Arc::new(ActivateOrderHandler::new(
        subscriptions.clone(),
        catalog.clone(),
        invoices.clone(),
        locks,
        event_publisher.clone(),
    ));
    let ingest = Arc::new(IngestWebhookHandler::new(
        verifier,
        event_store.clone(),
        invoices.clone(),
        activation,
        event_publisher.clone(),
        config.payment.amount_tolerance_minor,
        config.processing.stale_grace_secs,
    ));
    let replay_storm = Arc::new(ReplayStormHandler::new(
        event_store.clone(),
        subscriptions.clone(),
        ingest.clone(),
        config.features.replay_storm_enabled,
        config.features.test_order_prefix.clone(),
    ));

    if config.features.replay_storm_enabled {
        warn!("Replay-storm harness is ENABLED");
    }

    // === Stale-claim reconciler ===

    if config.features.reconciler_enabled {
        let reconciler = ReconcileStaleHandler::new(
            event_store.clone(),
            ingest.clone(),
            config.processing.stale_grace_secs,
            config.processing.reconcile_batch_limit,
        );
        let sweep_interval = Duration::from_secs(config.processing.reconcile_interval_secs);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(sweep_interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                match reconciler.handle().await {
                    Ok(report) if report.found > 0 => {
                        info!(
                            found = report.found,
                            reattempted = report.reattempted,
                            failed_again = report.failed_again,
                            "Reconciler sweep finished"
                        );
                    }
                    Ok(_) => {}
                    Err(e) => error!(error = %e, "Reconciler sweep failed"),
                }
            }
        });
    }

    // === HTTP surface ===

    let payment_state = PaymentAppState {
        ingest,
        replay_storm,
        invoices,
        subscriptions: subscriptions.clone(),
        event_store,
        event_publisher: event_publisher.clone(),
    };
    let subscriptions_state = SubscriptionsAppState {
        subscriptions,
        catalog,
        event_publisher,
    };
    let ws_state = WebSocketState::new(room_manager);

    let cors = cors_layer(&config);
    let app = Router::new()
        .route("/health", get(health_check))
        .merge(payment_router().with_state(payment_state))
        .merge(subscriptions_router().with_state(subscriptions_state))
        .merge(websocket_router().with_state(ws_state))
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(cors)
        .layer(CompressionLayer::new())
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.server.request_timeout_secs,
        )));

    let addr = config.server.socket_addr();
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shut down cleanly");
    Ok(())
}

async fn health_check() -> &'static str {
    "OK"
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    let origins = config.server.cors_origins_list();
    if origins.is_empty() {
        return CorsLayer::permissive();
    }
    let parsed: Vec<_> = origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(parsed))
        .allow_methods(tower_http::cors::Any)
        .allow_headers(tower_http::cors::Any)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
    }
}
