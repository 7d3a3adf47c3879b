use std::sync::Arc;

use sqlx::PgPool;
use tokio::net::TcpListener;
use tracing::{info, warn};

use fleet_dms::blob::Blobs;
use fleet_dms::config::AppConfig;
use fleet_dms::routes;
use fleet_dms::state::AppState;
use fleet_dms::store::{FleetStore, MemoryStore, PgStore};
use fleet_dms::telemetry;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;

    let blobs = Blobs::new(config.storage.operator()?);

    let store: Arc<dyn FleetStore> = match config.database_url.as_deref() {
        Some(database_url) => {
            let pool = PgPool::connect(database_url).await?;
            let store = PgStore::new(pool);
            if config.run_migrations {
                store.run_migrations().await?;
            }
            Arc::new(store)
        }
        None => {
            warn!("DATABASE_URL not set, records are kept in memory only");
            Arc::new(MemoryStore::new())
        }
    };

    let app = routes::router(AppState::new(store, blobs));

    let addr = config.bind_addr()?;
    let listener = TcpListener::bind(addr).await?;
    info!("Server running on http://{addr}");
    info!("Swagger UI available at http://{addr}/swagger-ui");
    axum::serve(listener, app).await?;
    Ok(())
}
