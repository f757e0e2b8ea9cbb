use std::sync::Arc;

use axum::routing::{delete, get, post};
use axum::Router;
use socketioxide::SocketIo;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

mod config;
mod events;
mod models;
mod routes;
mod schema;
mod socket;
mod store;

use config::AppConfig;

use amora_engine::detector::{MatchDetector, PairLocks};
use amora_engine::dispatcher::NotificationDispatcher;
use amora_engine::ports::{
    CandidateStore, Clock, Conversations, Entitlements, InterestLedger, Scheduler, SystemClock,
    TokioScheduler,
};
use amora_engine::ranking::RankingPipeline;
use amora_engine::simulator::ReciprocitySimulator;
use amora_shared::clients::db::{create_pool, DbPool};
use amora_shared::clients::rabbitmq::RabbitMQClient;
use amora_shared::clients::redis::RedisClient;

/// Infrastructure handles shared by the socket namespace and the REST
/// surface.
pub struct AppState {
    pub db: DbPool,
    pub config: AppConfig,
    pub rabbitmq: RabbitMQClient,
    pub redis: RedisClient,
    pub metrics_handle: metrics_exporter_prometheus::PrometheusHandle,
}

/// Router state: infrastructure plus the wired discovery core.
pub struct ApiState {
    pub app: Arc<AppState>,
    pub store: Arc<dyn CandidateStore>,
    pub ranking: Arc<RankingPipeline>,
    pub detector: Arc<MatchDetector>,
    pub conversations: Arc<dyn Conversations>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    amora_shared::middleware::init_tracing("amora-discovery");

    let config = AppConfig::load()?;
    let port = config.port;

    let db = create_pool(&config.database_url)?;
    let rabbitmq = RabbitMQClient::connect(&config.rabbitmq_url).await?;
    let redis = RedisClient::connect(&config.redis_url).await?;
    let metrics_handle = amora_shared::middleware::init_metrics();

    let state = Arc::new(AppState {
        db: db.clone(),
        config: config.clone(),
        rabbitmq,
        redis: redis.clone(),
        metrics_handle,
    });

    // Socket.IO: per-profile rooms, joined on connect.
    let (sio_layer, io) = SocketIo::builder()
        .with_state(state.clone())
        .build_layer();
    io.ns("/", socket::handlers::on_connect);

    // Wire the discovery core. Every seam is an injected port: the channel
    // registry wraps the socket handle, the scheduler is the runtime, and
    // the stores sit on Postgres/Redis.
    let store: Arc<dyn CandidateStore> =
        Arc::new(store::PgCandidateStore::new(db.clone(), redis.clone()));
    let ledger: Arc<dyn InterestLedger> = Arc::new(store::PgInterestLedger::new(db.clone()));
    let entitlements: Arc<dyn Entitlements> =
        Arc::new(store::HttpEntitlements::new(&config.billing_service_url));
    let conversations: Arc<dyn Conversations> =
        Arc::new(store::HttpConversations::new(&config.messaging_service_url));
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let scheduler: Arc<dyn Scheduler> = Arc::new(TokioScheduler);
    let locks = Arc::new(PairLocks::default());

    let dispatcher = Arc::new(NotificationDispatcher::new(Arc::new(
        socket::registry::SocketRegistry::new(io),
    )));
    let simulator = Arc::new(ReciprocitySimulator::new(
        store.clone(),
        ledger.clone(),
        dispatcher.clone(),
        scheduler,
        locks.clone(),
        clock.clone(),
    ));
    let detector = Arc::new(MatchDetector::new(
        store.clone(),
        ledger.clone(),
        dispatcher,
        simulator,
        locks,
        clock.clone(),
    ));
    let ranking = Arc::new(RankingPipeline::new(
        store.clone(),
        ledger,
        entitlements,
        clock,
    ));

    let api = Arc::new(ApiState {
        app: state,
        store,
        ranking,
        detector,
        conversations,
    });

    let app = Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/metrics", get(routes::health::metrics))
        .route("/discover", get(routes::discover::discover))
        .route("/interests", post(routes::interests::signal_interest))
        .route("/interests/:target_id", delete(routes::interests::withdraw_interest))
        .route("/interests/check/:target_id", get(routes::interests::check_interest))
        .route("/interests/received/count", get(routes::interests::received_count))
        .route("/matches", get(routes::matches::list_matches))
        // Internal service-to-service endpoints (no auth)
        .route("/internal/presence", post(routes::internal::update_presence))
        .layer(axum::middleware::from_fn(
            amora_shared::middleware::metrics_middleware,
        ))
        .layer(sio_layer)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(api);

    let addr = format!("0.0.0.0:{port}");
    tracing::info!(addr = %addr, "amora-discovery starting");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
