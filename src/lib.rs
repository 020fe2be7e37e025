pub mod analytics;
pub mod api;
pub mod batch;
pub mod config;
pub mod error;
pub mod monitor;
pub mod series;
pub mod server;

pub use error::StockWatchError;
