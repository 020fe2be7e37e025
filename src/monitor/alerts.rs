use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub ticker: String,
    pub price: f64,
    pub timestamp: DateTime<Utc>,
}

impl Alert {
    pub fn new(ticker: impl Into<String>, price: f64) -> Self {
        Self {
            ticker: ticker.into(),
            price,
            timestamp: Utc::now(),
        }
    }
}

impl fmt::Display for Alert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "High price alert for {}: {:.2}", self.ticker, self.price)
    }
}

/// Decides whether an observed price raises an alert.
pub trait ThresholdPolicy: Send + Sync {
    fn should_alert(&self, ticker: &str, price: f64) -> bool;
}

/// Alerts when the price is strictly above a single threshold.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceAbove {
    pub threshold: f64,
}

impl PriceAbove {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }
}

impl ThresholdPolicy for PriceAbove {
    fn should_alert(&self, _ticker: &str, price: f64) -> bool {
        price > self.threshold
    }
}

/// Per-ticker thresholds with an optional fallback for tickers that have
/// none. Without a fallback, unlisted tickers never alert.
#[derive(Debug, Clone, Default)]
pub struct PerTickerThreshold {
    thresholds: HashMap<String, f64>,
    fallback: Option<f64>,
}

impl PerTickerThreshold {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_threshold(mut self, ticker: impl Into<String>, threshold: f64) -> Self {
        self.thresholds.insert(ticker.into(), threshold);
        self
    }

    pub fn with_fallback(mut self, threshold: f64) -> Self {
        self.fallback = Some(threshold);
        self
    }
}

impl ThresholdPolicy for PerTickerThreshold {
    fn should_alert(&self, ticker: &str, price: f64) -> bool {
        self.thresholds
            .get(ticker)
            .copied()
            .or(self.fallback)
            .map_or(false, |threshold| price > threshold)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn price_above_is_strict() {
        let policy = PriceAbove::new(1000.0);
        assert!(policy.should_alert("AAPL", 1000.01));
        assert!(!policy.should_alert("AAPL", 1000.0));
        assert!(!policy.should_alert("AAPL", 999.99));
    }

    #[test]
    fn per_ticker_thresholds() {
        let policy = PerTickerThreshold::new()
            .with_threshold("BTC", 90_000.0)
            .with_threshold("AAPL", 200.0);

        assert!(policy.should_alert("AAPL", 200.5));
        assert!(!policy.should_alert("BTC", 200.5));
        assert!(!policy.should_alert("MSFT", 1_000_000.0));

        let policy = policy.with_fallback(1000.0);
        assert!(policy.should_alert("MSFT", 1000.5));
        assert!(!policy.should_alert("MSFT", 1000.0));
    }

    #[test]
    fn alert_message() {
        let alert = Alert::new("TSLA", 1234.567);
        assert_eq!(alert.to_string(), "High price alert for TSLA: 1234.57");
    }

    #[test]
    fn alert_serializes_to_json() {
        let alert = Alert::new("TSLA", 1500.0);
        let json = serde_json::to_value(&alert).unwrap();
        assert_eq!(json["ticker"], "TSLA");
        assert_eq!(json["price"], 1500.0);
        assert!(json["timestamp"].is_string());
    }
}
