use async_trait::async_trait;
use std::collections::{HashMap, HashSet};

use crate::error::LookupError;

/// Current-price lookup for a ticker. Calls may be slow and may fail; the
/// monitor treats every failure as local to that ticker.
#[async_trait]
pub trait PriceSource: Send + Sync {
    async fn fetch_price(&self, ticker: &str) -> Result<f64, LookupError>;
}

/// Placeholder source that quotes the same price for every ticker. Stands in
/// for a market-data provider client.
#[derive(Debug, Clone, Copy)]
pub struct FixedPriceSource {
    price: f64,
}

impl FixedPriceSource {
    pub fn new(price: f64) -> Self {
        Self { price }
    }
}

#[async_trait]
impl PriceSource for FixedPriceSource {
    async fn fetch_price(&self, _ticker: &str) -> Result<f64, LookupError> {
        Ok(self.price)
    }
}

/// Deterministic map-backed source. Unknown tickers fail with
/// [`LookupError::UnknownTicker`]; tickers marked with
/// [`StaticPriceSource::failing`] fail with a provider error.
#[derive(Debug, Clone, Default)]
pub struct StaticPriceSource {
    prices: HashMap<String, f64>,
    failing: HashSet<String>,
}

impl StaticPriceSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_price(mut self, ticker: impl Into<String>, price: f64) -> Self {
        self.prices.insert(ticker.into(), price);
        self
    }

    pub fn failing(mut self, ticker: impl Into<String>) -> Self {
        self.failing.insert(ticker.into());
        self
    }
}

#[async_trait]
impl PriceSource for StaticPriceSource {
    async fn fetch_price(&self, ticker: &str) -> Result<f64, LookupError> {
        if self.failing.contains(ticker) {
            return Err(LookupError::Provider {
                ticker: ticker.to_string(),
                message: "simulated provider failure".to_string(),
            });
        }
        self.prices
            .get(ticker)
            .copied()
            .ok_or_else(|| LookupError::UnknownTicker(ticker.to_string()))
    }
}
