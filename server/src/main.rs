use std::net::SocketAddr;
use std::sync::Arc;

use dotenvy::dotenv;
use redis::aio::ConnectionManager;
use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use tm_order::clients::{
    DurableHttpScheduler, MidtransClient, RedisSessionStore, RedisStreamPublisher, RedisTaskStore,
};
use tm_order::config::Config;
use tm_order::routes::create_routes;
use tm_order::services::{EventService, OrderService, OrderSettings};
use tm_order::state::AppState;
use tm_order::store::PgDatabase;

#[tokio::main]
async fn main() {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("tm_order=info,tower_http=info")),
        )
        .init();

    if let Err(e) = run().await {
        tracing::error!(error = %e, "tm-order stopped");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env()?;

    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(&config.database_url)
        .await?;
    tracing::info!("Successfully connected to database");

    sqlx::migrate!().run(&pool).await?;
    tracing::info!("Migrations run successfully");

    let redis = ConnectionManager::new(redis::Client::open(config.redis_url.as_str())?).await?;
    tracing::info!("Successfully connected to redis");

    let scheduler = DurableHttpScheduler::new(Arc::new(RedisTaskStore::new(redis.clone())));
    let scheduler_worker = scheduler.clone().spawn_worker(config.scheduler_poll_interval);

    let db = Arc::new(PgDatabase::new(pool));
    let orders = OrderService::new(
        db.clone(),
        Arc::new(MidtransClient::new(
            config.midtrans_base_url.clone(),
            config.midtrans_server_key.clone(),
        )),
        Arc::new(scheduler),
        Arc::new(RedisStreamPublisher::new(redis.clone())),
        OrderSettings {
            timeout: config.app_timeout,
            base_url: config.app_base_url.clone(),
            order_expire: config.order_expire,
            service_charge_percentage: config.service_charge_percentage,
            tax_percentage: config.tax_percentage,
            utc_offset: config.utc_offset,
        },
    );
    let events = EventService::new(db, config.app_timeout, config.utc_offset);

    let state = AppState {
        orders: Arc::new(orders),
        events: Arc::new(events),
        sessions: Arc::new(RedisSessionStore::new(redis)),
    };
    let app = create_routes(state, &config);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.app_port));
    tracing::info!("Server running at http://{}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Pending tasks stay in Redis for the next start.
    scheduler_worker.abort();
    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutdown signal received");
}
