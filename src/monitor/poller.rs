use log::{debug, error, info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::alerts::{Alert, ThresholdPolicy};
use crate::api::PriceSource;
use crate::config::MonitorConfig;
use crate::error::LookupError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleStatus {
    Completed,
    Cancelled,
    /// The consumer is gone; nothing more can be delivered.
    QueueClosed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleStats {
    pub observed: usize,
    pub failed: usize,
    pub alerts: usize,
    pub status: CycleStatus,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollerStats {
    pub cycles: u64,
    pub alerts_enqueued: u64,
}

/// Producer side of the alert pipeline. Owns the only sender of the queue;
/// dropping the poller closes the queue.
pub struct Poller {
    tickers: Vec<String>,
    interval: Duration,
    fetch_timeout: Duration,
    source: Arc<dyn PriceSource>,
    policy: Arc<dyn ThresholdPolicy>,
    queue: mpsc::Sender<Alert>,
    cancel: CancellationToken,
}

impl Poller {
    pub fn new(
        config: &MonitorConfig,
        source: Arc<dyn PriceSource>,
        policy: Arc<dyn ThresholdPolicy>,
        queue: mpsc::Sender<Alert>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            tickers: config.tickers.clone(),
            interval: config.poll_interval,
            fetch_timeout: config.fetch_timeout,
            source,
            policy,
            queue,
            cancel,
        }
    }

    /// Polls every ticker once, in configured order.
    ///
    /// A failed or timed-out lookup is logged and skipped; it never stops the
    /// remaining tickers. Alerts are enqueued in ticker order and the call
    /// waits while the queue is full.
    pub async fn run_cycle(&self) -> CycleStats {
        let mut stats = CycleStats {
            observed: 0,
            failed: 0,
            alerts: 0,
            status: CycleStatus::Completed,
        };

        if self.tickers.is_empty() {
            debug!("No tickers configured, nothing to poll");
            return stats;
        }

        for ticker in &self.tickers {
            if self.cancel.is_cancelled() {
                stats.status = CycleStatus::Cancelled;
                return stats;
            }

            let lookup = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    stats.status = CycleStatus::Cancelled;
                    return stats;
                }
                result = self.fetch(ticker) => result,
            };

            let price = match lookup {
                Ok(price) => price,
                Err(e) => {
                    warn!("Error fetching price for {}: {}", ticker, e);
                    stats.failed += 1;
                    continue;
                }
            };

            stats.observed += 1;
            info!("Current price of {} is {:.2}", ticker, price);

            if !self.policy.should_alert(ticker, price) {
                continue;
            }

            // not raced against cancellation: an alert that was raised is delivered
            if let Err(e) = self.queue.send(Alert::new(ticker.as_str(), price)).await {
                error!("Alert queue closed, dropping alert for {}: {}", e.0.ticker, e.0);
                stats.status = CycleStatus::QueueClosed;
                return stats;
            }
            stats.alerts += 1;
            debug!("Queued alert for {} at {:.2}", ticker, price);
        }

        stats
    }

    /// Runs cycles separated by the polling interval until cancelled or the
    /// queue closes.
    pub async fn run(self) -> PollerStats {
        let mut totals = PollerStats::default();
        info!(
            "Monitoring {} ticker(s) every {}s",
            self.tickers.len(),
            self.interval.as_secs()
        );

        loop {
            let cycle = self.run_cycle().await;
            totals.alerts_enqueued += cycle.alerts as u64;

            match cycle.status {
                CycleStatus::Completed => totals.cycles += 1,
                CycleStatus::Cancelled | CycleStatus::QueueClosed => break,
            }
            debug!(
                "Cycle {} done: {} observed, {} failed, {} alerts",
                totals.cycles, cycle.observed, cycle.failed, cycle.alerts
            );

            tokio::select! {
                _ = self.cancel.cancelled() => break,
                _ = tokio::time::sleep(self.interval) => {}
            }
        }

        info!(
            "Poller stopped after {} cycle(s), {} alert(s) queued",
            totals.cycles, totals.alerts_enqueued
        );
        totals
    }

    async fn fetch(&self, ticker: &str) -> Result<f64, LookupError> {
        let price = tokio::time::timeout(self.fetch_timeout, self.source.fetch_price(ticker))
            .await
            .map_err(|_| LookupError::Timeout {
                ticker: ticker.to_string(),
                secs: self.fetch_timeout.as_secs(),
            })??;

        if !price.is_finite() || price <= 0.0 {
            return Err(LookupError::Provider {
                ticker: ticker.to_string(),
                message: format!("invalid price {}", price),
            });
        }
        Ok(price)
    }
}
