use std::sync::Arc;

use shared_config::AppConfig;
use shared_models::clock::{Clock, SystemClock};
use shared_models::notify::Notifier;
use sqlx::PgPool;

/// Shared application state handed to every cell router.
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub db: PgPool,
    pub clock: Arc<dyn Clock>,
    pub notifier: Arc<dyn Notifier>,
}

impl AppState {
    pub fn new(config: AppConfig, db: PgPool, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            config,
            db,
            clock: Arc::new(SystemClock),
            notifier,
        }
    }

    /// Replaces the clock, used by tests to pin the current instant.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }
}
