use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::time;
use tracing::{error, info};

use crate::store::Store;

/// Expired reservations are already invisible to every read; this loop just
/// keeps the table from accumulating dead rows.
pub struct ReservationSweeper {
    store: Arc<dyn Store>,
    period: Duration,
}

impl ReservationSweeper {
    pub fn new(store: Arc<dyn Store>, period: Duration) -> Self {
        Self { store, period }
    }

    pub async fn run(&self) {
        let mut interval = time::interval(self.period);

        loop {
            interval.tick().await;

            match self.store.delete_expired_reservations(Utc::now()).await {
                Ok(0) => {}
                Ok(removed) => info!("Released {} expired reservation(s)", removed),
                Err(e) => error!("Error sweeping expired reservations: {}", e),
            }
        }
    }
}
