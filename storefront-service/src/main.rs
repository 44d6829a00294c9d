use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tracing::{info, warn};

use storefront_service::api::{self, AppState};
use storefront_service::auth::JwtKeys;
use storefront_service::demo;
use storefront_service::store::{MemoryStore, PgStore, Store};
use storefront_service::sweeper::ReservationSweeper;

#[derive(Parser)]
#[command(name = "storefront-service")]
struct Args {
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    #[arg(long, env = "PORT", default_value = "3000")]
    port: u16,

    #[arg(long, env = "JWT_SECRET", default_value = "storefront-dev-secret")]
    jwt_secret: String,

    #[arg(long, env = "RESERVATION_SWEEP_SECS", default_value = "30")]
    reservation_sweep_secs: u64,

    #[arg(long, env = "SEED_DEMO_DATA", default_value_t = false)]
    seed_demo_data: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    let store: Arc<dyn Store> = match &args.database_url {
        Some(database_url) => {
            info!("Running database migrations...");
            PgStore::run_migrations(database_url).await?;
            info!("Migrations completed successfully");
            Arc::new(PgStore::connect(database_url).await?)
        }
        None => {
            warn!("DATABASE_URL not set, using the in-memory store");
            Arc::new(MemoryStore::new())
        }
    };

    if args.seed_demo_data {
        let inserted = demo::seed_demo_catalog(store.as_ref()).await?;
        info!("Seeded {} demo product(s)", inserted);
    }

    let sweeper = ReservationSweeper::new(
        store.clone(),
        Duration::from_secs(args.reservation_sweep_secs),
    );
    tokio::spawn(async move {
        sweeper.run().await;
    });

    let state = AppState {
        store,
        jwt: Arc::new(JwtKeys::from_secret(&args.jwt_secret)),
    };
    let app = api::create_router(state);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", args.port)).await?;

    info!("Storefront service listening on port {}", args.port);

    axum::serve(listener, app).await?;

    Ok(())
}
