use log::{error, info, warn};
use std::path::Path;

use crate::analytics::{self, MovingAverageSeries, Signal, TrendReport, VolatilitySeries};
use crate::error::{AnalyticsError, LoadError, ParseError};
use crate::series::{self, Series};

/// Results of one analysis run. Each analytic fails on its own; a bad period
/// for the moving average does not hide the volatility.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchReport {
    pub symbol: String,
    pub series: Series,
    pub rejected: Vec<ParseError>,
    pub moving_average: Result<MovingAverageSeries, AnalyticsError>,
    pub volatility: Result<VolatilitySeries, AnalyticsError>,
    pub trend: Result<TrendReport, AnalyticsError>,
    pub signals: Result<Vec<Signal>, AnalyticsError>,
}

pub fn analyze(
    symbol: impl Into<String>,
    series: Series,
    rejected: Vec<ParseError>,
    ma_period: usize,
    long_period: usize,
) -> BatchReport {
    BatchReport {
        symbol: symbol.into(),
        moving_average: analytics::moving_average(&series, ma_period),
        volatility: analytics::volatility(&series),
        trend: analytics::trend_report(&series, ma_period, long_period),
        signals: analytics::crossover_signals(&series, ma_period, long_period),
        series,
        rejected,
    }
}

pub fn analyze_file(
    path: impl AsRef<Path>,
    ma_period: usize,
    long_period: usize,
) -> Result<BatchReport, LoadError> {
    let path = path.as_ref();
    // the file name stands in for the ticker, e.g. AAPL.csv
    let symbol = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();

    let loaded = series::load_file(path)?;
    Ok(analyze(symbol, loaded.series, loaded.errors, ma_period, long_period))
}

/// Writes a report to the log.
pub fn log_report(report: &BatchReport) {
    info!("Stock Analysis Report for {}", report.symbol);
    info!(
        "Loaded {} price records ({} rejected)",
        report.series.len(),
        report.rejected.len()
    );
    for e in &report.rejected {
        warn!("Skipped row: {}", e);
    }

    match &report.moving_average {
        Ok(ma) => info!("Moving average: {:?}", ma),
        Err(e) => error!("Moving average failed: {}", e),
    }
    match &report.volatility {
        Ok(vol) => info!("Volatility (%): {:?}", vol),
        Err(e) => error!("Volatility failed: {}", e),
    }
    match &report.trend {
        Ok(trend) => {
            for line in trend.to_string().lines() {
                info!("{}", line);
            }
        }
        Err(e) => error!("Trend report failed: {}", e),
    }
    match &report.signals {
        Ok(signals) => {
            for signal in signals {
                info!(
                    "{} signal on {} at {:.2}",
                    signal.kind, signal.date, signal.price
                );
            }
        }
        Err(e) => error!("Crossover signals failed: {}", e),
    }
}
