use async_trait::async_trait;
use log::{debug, info, warn};
use std::sync::Arc;
use tokio::sync::mpsc;

use super::alerts::Alert;

/// Where dequeued alerts end up.
#[async_trait]
pub trait AlertSink: Send + Sync {
    async fn deliver(&self, alert: &Alert);
}

/// Writes each alert as a log record on the `stockwatch::alert` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogAlertSink;

#[async_trait]
impl AlertSink for LogAlertSink {
    async fn deliver(&self, alert: &Alert) {
        warn!(target: "stockwatch::alert", "ALERT: {}", alert);
    }
}

/// Forwards alerts to an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelAlertSink {
    tx: mpsc::UnboundedSender<Alert>,
}

impl ChannelAlertSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Alert>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

#[async_trait]
impl AlertSink for ChannelAlertSink {
    async fn deliver(&self, alert: &Alert) {
        if self.tx.send(alert.clone()).is_err() {
            warn!("Alert receiver dropped, discarding alert for {}", alert.ticker);
        }
    }
}

/// Consumes the queue in FIFO order until every sender is gone, then returns
/// the number of alerts delivered. Alerts still queued when the producer
/// stops are delivered before this returns.
pub async fn run_sink(mut queue: mpsc::Receiver<Alert>, sink: Arc<dyn AlertSink>) -> u64 {
    let mut delivered = 0u64;
    while let Some(alert) = queue.recv().await {
        debug!("Dequeued alert for {}", alert.ticker);
        sink.deliver(&alert).await;
        delivered += 1;
    }
    info!("Alert queue closed, {} alert(s) delivered", delivered);
    delivered
}
