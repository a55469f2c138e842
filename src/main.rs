use computer_club_booking::adapter::driven::{
    InMemoryStore, MySqlClubRepository, MySqlClubTransactionManager, MySqlReservationRepository,
    MySqlSeatRepository, MySqlSeatTransactionManager, SystemClock,
};
use computer_club_booking::adapter::driver::{create_router, AppState};
use computer_club_booking::adapter::{AppConfig, DatabaseConfig, DatabaseMigration, StorageBackend};

use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // .envファイルから環境変数を読み込む
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env()?;
    let clock = Arc::new(SystemClock);

    let app_state = match config.storage_backend {
        StorageBackend::Memory => {
            tracing::warn!("using in-memory storage; data is lost on shutdown");
            let store = Arc::new(InMemoryStore::new());
            AppState::new(
                store.clone(),
                store.clone(),
                store.clone(),
                store.clone(),
                store.clone(),
                store,
                clock,
                config.store_timeout,
            )
        }
        StorageBackend::MySql => {
            let db_config = DatabaseConfig::from_env()?;
            tracing::info!(
                host = %db_config.host,
                port = db_config.port,
                database = %db_config.database,
                "database configuration loaded"
            );

            // 接続プールを作成
            let pool = db_config
                .pool_options(config.store_timeout)
                .connect(&db_config.connection_string())
                .await?;
            tracing::info!(max_connections = db_config.max_connections, "connection pool ready");

            DatabaseMigration::new(pool.clone()).run().await?;

            let clubs = Arc::new(MySqlClubRepository::new(pool.clone()));
            AppState::new(
                clubs.clone(),
                clubs,
                Arc::new(MySqlSeatRepository::new(pool.clone())),
                Arc::new(MySqlReservationRepository::new(pool.clone())),
                Arc::new(MySqlSeatTransactionManager::new(pool.clone())),
                Arc::new(MySqlClubTransactionManager::new(pool)),
                clock,
                config.store_timeout,
            )
        }
    };

    let app = create_router().with_state(app_state).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive()),
    );

    let listener = tokio::net::TcpListener::bind(config.bind_address()).await?;
    tracing::info!(
        address = %config.bind_address(),
        backend = ?config.storage_backend,
        store_timeout_ms = config.store_timeout.as_millis() as u64,
        "REST API server started"
    );

    axum::serve(listener, app).await?;

    Ok(())
}
