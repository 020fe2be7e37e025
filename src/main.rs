use env_logger::Builder;
use log::{error, info, LevelFilter};
use std::io::Write;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use stockwatch::api::FixedPriceSource;
use stockwatch::batch;
use stockwatch::config::Config;
use stockwatch::monitor::{AlertPipeline, LogAlertSink, PriceAbove};
use stockwatch::server::{StatusServer, StockStore};
use stockwatch::StockWatchError;

#[tokio::main]
async fn main() -> Result<(), StockWatchError> {
    // a missing .env is fine; the environment may be set directly
    let dotenv = dotenvy::dotenv();

    // Configure logger
    Builder::new()
        .filter_level(LevelFilter::Info)
        .filter_module("stockwatch", LevelFilter::Debug)
        .parse_default_env()
        .format(|buf, record| {
            let ts = chrono::Local::now().format("%H:%M:%S%.3f");
            writeln!(
                buf,
                "[{} {:<5} {}] {}",
                ts,
                record.level(),
                record.target(),
                record.args()
            )
        })
        .target(env_logger::Target::Stderr)
        .init();

    info!("Starting stockwatch...");
    if let Ok(path) = dotenv {
        info!("Loaded environment from {}", path.display());
    }

    let config = Config::from_env()?;
    info!(
        "Configuration loaded: {} ticker(s), threshold {:.2}, interval {}s, port {}",
        config.monitor.tickers.len(),
        config.monitor.alert_threshold,
        config.monitor.poll_interval.as_secs(),
        config.server_port
    );

    if let Some(path) = &config.data_file {
        info!("Running batch analysis on {}", path.display());
        match batch::analyze_file(path, config.ma_period, config.trend_long_period) {
            Ok(report) => batch::log_report(&report),
            Err(e) => error!("Batch analysis failed: {}", e),
        }
    }

    let cancel = CancellationToken::new();

    let pipeline = AlertPipeline::spawn(
        &config.monitor,
        Arc::new(FixedPriceSource::new(config.fixed_price)),
        Arc::new(PriceAbove::new(config.monitor.alert_threshold)),
        Arc::new(LogAlertSink),
        cancel.clone(),
    );

    let mut server_handle = tokio::spawn(
        StatusServer::new(config.server_port, StockStore::new(), cancel.clone()).run(),
    );

    // Run until a signal arrives, the server exits or the pipeline dies
    let (server_exit, pipeline_died) = tokio::select! {
        _ = shutdown_signal() => (None, false),
        result = &mut server_handle => (Some(result), false),
        _ = pipeline.wait_for_exit() => {
            error!("Alert pipeline stopped unexpectedly, shutting down");
            (None, true)
        }
    };

    cancel.cancel();
    let stats = pipeline.shutdown().await?;
    info!(
        "Delivered {} of {} alert(s) over {} cycle(s)",
        stats.alerts_delivered, stats.alerts_enqueued, stats.cycles
    );
    if pipeline_died {
        return Err(StockWatchError::PipelineStopped);
    }

    let server_result = match server_exit {
        Some(result) => result,
        None => server_handle.await,
    };
    server_result.map_err(|source| StockWatchError::TaskFailed {
        task: "status server",
        source,
    })??;

    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}
