pub mod backfill;
pub mod service;
pub mod store;
pub mod stream;

// Re-export the service for convenient access (e.g. `use crate::market_data::MarketDataService`).
pub use service::MarketDataService;
pub use store::CandleStore;
