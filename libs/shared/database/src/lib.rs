pub mod postgres;
pub mod state;

pub use postgres::{connect_pool, run_migrations};
pub use state::AppState;
