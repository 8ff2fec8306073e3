pub mod diff;
pub mod errors;
pub mod export;
pub mod feed;
pub mod models;
pub mod store;
pub mod wiki;

pub use errors::{AppError, AppResult};
pub use wiki::Wiki;

pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
}
