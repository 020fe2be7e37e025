use log::info;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::alerts::ThresholdPolicy;
use super::poller::{Poller, PollerStats};
use super::sink::{run_sink, AlertSink};
use crate::api::PriceSource;
use crate::config::MonitorConfig;
use crate::error::StockWatchError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineStats {
    pub cycles: u64,
    pub alerts_enqueued: u64,
    pub alerts_delivered: u64,
}

/// Poller and alert sink running as two tasks joined by a bounded queue.
///
/// The poller holds the only sender. On shutdown it is cancelled, the sender
/// drops, and the sink finishes once it has delivered everything still
/// queued.
pub struct AlertPipeline {
    cancel: CancellationToken,
    // cancelled as soon as either task returns or panics
    exited: CancellationToken,
    poller: JoinHandle<PollerStats>,
    sink: JoinHandle<u64>,
}

impl AlertPipeline {
    pub fn spawn(
        config: &MonitorConfig,
        source: Arc<dyn PriceSource>,
        policy: Arc<dyn ThresholdPolicy>,
        sink: Arc<dyn AlertSink>,
        cancel: CancellationToken,
    ) -> Self {
        let (tx, rx) = mpsc::channel(config.queue_capacity.max(1));

        let exited = CancellationToken::new();

        let sink_exit = exited.clone().drop_guard();
        let sink = tokio::spawn(async move {
            let _exit = sink_exit;
            run_sink(rx, sink).await
        });

        let poller = Poller::new(config, source, policy, tx, cancel.clone());
        let poller_exit = exited.clone().drop_guard();
        let poller = tokio::spawn(async move {
            let _exit = poller_exit;
            poller.run().await
        });

        info!(
            "Alert pipeline started (queue capacity {})",
            config.queue_capacity.max(1)
        );
        Self {
            cancel,
            exited,
            poller,
            sink,
        }
    }

    /// Resolves when the poller or the sink stops, whether it returned or
    /// panicked. Neither stops on its own before [`shutdown`](Self::shutdown)
    /// unless something went wrong.
    pub async fn wait_for_exit(&self) {
        self.exited.cancelled().await
    }

    /// Stops polling, waits for the sink to drain the queue and reports what
    /// both tasks did.
    ///
    /// Both tasks are joined before any failure is reported, so alerts queued
    /// ahead of a poller panic are still delivered.
    pub async fn shutdown(self) -> Result<PipelineStats, StockWatchError> {
        self.cancel.cancel();

        let poller = self.poller.await;
        let sink = self.sink.await;

        let poller = poller.map_err(|source| StockWatchError::TaskFailed {
            task: "poller",
            source,
        })?;
        let delivered = sink.map_err(|source| StockWatchError::TaskFailed {
            task: "alert sink",
            source,
        })?;

        let stats = PipelineStats {
            cycles: poller.cycles,
            alerts_enqueued: poller.alerts_enqueued,
            alerts_delivered: delivered,
        };
        info!(
            "Alert pipeline stopped: {} cycle(s), {} alert(s) delivered",
            stats.cycles, stats.alerts_delivered
        );
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::StaticPriceSource;
    use crate::error::LookupError;
    use crate::monitor::alerts::{Alert, PriceAbove};
    use crate::monitor::sink::ChannelAlertSink;
    use async_trait::async_trait;
    use std::time::Duration;

    struct SlowSink {
        inner: ChannelAlertSink,
    }

    #[async_trait]
    impl AlertSink for SlowSink {
        async fn deliver(&self, alert: &Alert) {
            tokio::time::sleep(Duration::from_secs(5)).await;
            self.inner.deliver(alert).await;
        }
    }

    struct BrokenSink;

    #[async_trait]
    impl AlertSink for BrokenSink {
        async fn deliver(&self, _alert: &Alert) {
            panic!("sink blew up");
        }
    }

    /// Quotes 1500 for every ticker except `broken`, where it panics.
    struct PanicsOn {
        broken: &'static str,
    }

    #[async_trait]
    impl PriceSource for PanicsOn {
        async fn fetch_price(&self, ticker: &str) -> Result<f64, LookupError> {
            if ticker == self.broken {
                panic!("provider crashed on {}", ticker);
            }
            Ok(1500.0)
        }
    }

    fn config(tickers: &[&str]) -> MonitorConfig {
        MonitorConfig {
            tickers: tickers.iter().map(|t| t.to_string()).collect(),
            queue_capacity: 4,
            ..MonitorConfig::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_drains_queued_alerts() {
        let source = StaticPriceSource::new()
            .with_price("A", 1500.0)
            .with_price("B", 1600.0)
            .with_price("C", 1700.0);
        let (inner, mut out) = ChannelAlertSink::new();

        let pipeline = AlertPipeline::spawn(
            &config(&["A", "B", "C"]),
            Arc::new(source),
            Arc::new(PriceAbove::new(1000.0)),
            Arc::new(SlowSink { inner }),
            CancellationToken::new(),
        );

        // first alert out means the first cycle has queued the rest
        assert_eq!(out.recv().await.unwrap().ticker, "A");
        let stats = pipeline.shutdown().await.unwrap();

        assert_eq!(stats.alerts_delivered, stats.alerts_enqueued);
        let mut rest = Vec::new();
        while let Ok(alert) = out.try_recv() {
            rest.push(alert.ticker);
        }
        assert_eq!(stats.alerts_delivered, 3);
        assert_eq!(rest, vec!["B", "C"]);
    }

    #[tokio::test]
    async fn external_token_stops_the_pipeline() {
        let cancel = CancellationToken::new();
        let (sink, _out) = ChannelAlertSink::new();
        let pipeline = AlertPipeline::spawn(
            &config(&[]),
            Arc::new(StaticPriceSource::new()),
            Arc::new(PriceAbove::new(1000.0)),
            Arc::new(sink),
            cancel.clone(),
        );

        cancel.cancel();
        let stats = pipeline.shutdown().await.unwrap();
        assert_eq!(stats.alerts_delivered, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn panicking_sink_ends_the_pipeline() {
        let pipeline = AlertPipeline::spawn(
            &config(&["A"]),
            Arc::new(StaticPriceSource::new().with_price("A", 5000.0)),
            Arc::new(PriceAbove::new(1000.0)),
            Arc::new(BrokenSink),
            CancellationToken::new(),
        );

        tokio::time::timeout(Duration::from_secs(180), pipeline.wait_for_exit())
            .await
            .expect("pipeline should report the dead sink");

        match pipeline.shutdown().await {
            Err(StockWatchError::TaskFailed { task, source }) => {
                assert_eq!(task, "alert sink");
                assert!(source.is_panic());
            }
            other => panic!("expected a sink failure, got {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn poller_panic_still_drains_the_queue() {
        let (inner, mut out) = ChannelAlertSink::new();
        let pipeline = AlertPipeline::spawn(
            &config(&["A", "B", "C"]),
            Arc::new(PanicsOn { broken: "C" }),
            Arc::new(PriceAbove::new(1000.0)),
            Arc::new(SlowSink { inner }),
            CancellationToken::new(),
        );

        pipeline.wait_for_exit().await;
        let result = pipeline.shutdown().await;
        assert!(matches!(
            result,
            Err(StockWatchError::TaskFailed { task: "poller", .. })
        ));

        let mut delivered = Vec::new();
        while let Ok(alert) = out.try_recv() {
            delivered.push(alert.ticker);
        }
        assert_eq!(delivered, vec!["A", "B"]);
    }

    #[tokio::test]
    async fn wait_for_exit_stays_pending_while_running() {
        let (sink, _out) = ChannelAlertSink::new();
        let pipeline = AlertPipeline::spawn(
            &config(&["A"]),
            Arc::new(StaticPriceSource::new().with_price("A", 10.0)),
            Arc::new(PriceAbove::new(1000.0)),
            Arc::new(sink),
            CancellationToken::new(),
        );

        let waited =
            tokio::time::timeout(Duration::from_millis(50), pipeline.wait_for_exit()).await;
        assert!(waited.is_err());
        assert_eq!(pipeline.shutdown().await.unwrap().alerts_delivered, 0);
    }
}
