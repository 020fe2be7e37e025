use chrono::NaiveDate;
use std::fmt;

use ta::{indicators::SimpleMovingAverage, Next};

use crate::error::AnalyticsError;
use crate::series::Series;

pub type MovingAverageSeries = Vec<f64>;
pub type VolatilitySeries = Vec<f64>;

/// Simple moving average of `close` over a window of `period` records.
///
/// Element `k` is the mean of closes `[k, k + period)`, so the result has
/// `len - period + 1` elements.
pub fn moving_average(series: &Series, period: usize) -> Result<MovingAverageSeries, AnalyticsError> {
    let len = series.len();
    if period == 0 || period > len {
        return Err(AnalyticsError::InvalidPeriod { period, len });
    }

    let mut sma =
        SimpleMovingAverage::new(period).map_err(|_| AnalyticsError::InvalidPeriod { period, len })?;

    // the first period - 1 outputs average a partial window
    Ok(series
        .iter()
        .map(|record| sma.next(record.close))
        .skip(period - 1)
        .collect())
}

/// Intraday range as a percentage of the previous close:
/// `(high[i] - low[i]) / close[i - 1] * 100` for every `i >= 1`.
pub fn volatility(series: &Series) -> Result<VolatilitySeries, AnalyticsError> {
    let records = series.records();
    if records.len() <= 1 {
        return Err(AnalyticsError::InsufficientData { len: records.len() });
    }

    records
        .windows(2)
        .enumerate()
        .map(|(i, pair)| {
            let (prev, curr) = (&pair[0], &pair[1]);
            if prev.close == 0.0 {
                return Err(AnalyticsError::DivisionByZero { index: i + 1 });
            }
            Ok((curr.high - curr.low) / prev.close * 100.0)
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trend {
    Upward,
    Downward,
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trend::Upward => write!(f, "upward"),
            Trend::Downward => write!(f, "downward"),
        }
    }
}

/// Latest short/long moving averages and the direction they imply.
#[derive(Debug, Clone, PartialEq)]
pub struct TrendReport {
    pub latest_close: f64,
    pub short_period: usize,
    pub short_average: f64,
    pub long_period: usize,
    pub long_average: f64,
    pub trend: Trend,
}

pub fn trend_report(series: &Series, short: usize, long: usize) -> Result<TrendReport, AnalyticsError> {
    let short_ma = moving_average(series, short)?;
    let long_ma = moving_average(series, long)?;

    let len = series.len();
    let latest_close = series
        .last()
        .map(|r| r.close)
        .ok_or(AnalyticsError::InsufficientData { len })?;
    let short_average = *short_ma
        .last()
        .ok_or(AnalyticsError::InvalidPeriod { period: short, len })?;
    let long_average = *long_ma
        .last()
        .ok_or(AnalyticsError::InvalidPeriod { period: long, len })?;

    let trend = if short_average > long_average {
        Trend::Upward
    } else {
        Trend::Downward
    };

    Ok(TrendReport {
        latest_close,
        short_period: short,
        short_average,
        long_period: long,
        long_average,
        trend,
    })
}

impl fmt::Display for TrendReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Latest Close Price: {:.2}", self.latest_close)?;
        writeln!(f, "Latest SMA {}: {:.2}", self.short_period, self.short_average)?;
        writeln!(f, "Latest SMA {}: {:.2}", self.long_period, self.long_average)?;
        let recommendation = match self.trend {
            Trend::Upward => SignalKind::Buy,
            Trend::Downward => SignalKind::Sell,
        };
        writeln!(f, "Recommendation: Potential {} Signal Detected", recommendation)?;
        write!(f, "Overall Trending: {}", self.trend)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalKind {
    Buy,
    Sell,
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignalKind::Buy => write!(f, "Buy"),
            SignalKind::Sell => write!(f, "Sell"),
        }
    }
}

/// A moving-average crossover: the close on the day the short average moved
/// to the other side of the long one.
#[derive(Debug, Clone, PartialEq)]
pub struct Signal {
    pub date: NaiveDate,
    pub kind: SignalKind,
    pub price: f64,
}

/// Buy when the short average rises above the long one, sell when it falls
/// below. Only the first day of each run emits a signal, and days where the
/// averages are equal emit nothing.
pub fn crossover_signals(
    series: &Series,
    short: usize,
    long: usize,
) -> Result<Vec<Signal>, AnalyticsError> {
    let short_ma = moving_average(series, short)?;
    let long_ma = moving_average(series, long)?;
    let records = series.records();

    let mut signals = Vec::new();
    let mut previous: Option<SignalKind> = None;

    // both averages exist from index max(short, long) - 1 on
    for i in short.max(long) - 1..records.len() {
        let short_average = short_ma[i + 1 - short];
        let long_average = long_ma[i + 1 - long];

        let kind = if short_average > long_average {
            SignalKind::Buy
        } else if short_average < long_average {
            SignalKind::Sell
        } else {
            continue;
        };
        if previous == Some(kind) {
            continue;
        }

        previous = Some(kind);
        signals.push(Signal {
            date: records[i].date,
            kind,
            price: records[i].close,
        });
    }

    Ok(signals)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::series::PriceRecord;

    const EPS: f64 = 1e-9;

    fn bar(day: i64, high: f64, low: f64, close: f64) -> PriceRecord {
        let date = NaiveDate::from_ymd_opt(2021, 1, 1).unwrap() + chrono::Duration::days(day);
        PriceRecord {
            date,
            open: close,
            high,
            low,
            close,
            volume: 100,
            adj_close: close,
        }
    }

    fn closes(values: &[f64]) -> Series {
        let records = values
            .iter()
            .enumerate()
            .map(|(i, &c)| bar(i as i64, c, c, c))
            .collect();
        Series::from_sorted(records).unwrap()
    }

    fn assert_close(actual: &[f64], expected: &[f64]) {
        assert_eq!(actual.len(), expected.len(), "{:?} vs {:?}", actual, expected);
        for (a, e) in actual.iter().zip(expected) {
            assert!((a - e).abs() < EPS, "{:?} vs {:?}", actual, expected);
        }
    }

    #[test]
    fn moving_average_of_three_closes() {
        let series = closes(&[100.0, 200.0, 150.0]);
        assert_close(&moving_average(&series, 2).unwrap(), &[150.0, 175.0]);
    }

    #[test]
    fn moving_average_length_and_first_element() {
        let values = [12.5, 13.0, 11.75, 14.2, 15.1, 14.9, 16.3, 15.8];
        let series = closes(&values);

        for period in 1..=values.len() {
            let ma = moving_average(&series, period).unwrap();
            assert_eq!(ma.len(), values.len() - period + 1);

            let first = values[..period].iter().sum::<f64>() / period as f64;
            assert!((ma[0] - first).abs() < EPS);

            let last = values[values.len() - period..].iter().sum::<f64>() / period as f64;
            assert!((ma[ma.len() - 1] - last).abs() < EPS);
        }
    }

    #[test]
    fn moving_average_full_window_is_single_mean() {
        let series = closes(&[1.0, 2.0, 3.0, 4.0]);
        assert_close(&moving_average(&series, 4).unwrap(), &[2.5]);
    }

    #[test]
    fn moving_average_rejects_bad_periods() {
        let series = closes(&[1.0, 2.0, 3.0]);
        assert_eq!(
            moving_average(&series, 0),
            Err(AnalyticsError::InvalidPeriod { period: 0, len: 3 })
        );
        assert_eq!(
            moving_average(&series, 4),
            Err(AnalyticsError::InvalidPeriod { period: 4, len: 3 })
        );
        assert!(matches!(
            moving_average(&Series::default(), 1),
            Err(AnalyticsError::InvalidPeriod { .. })
        ));
    }

    #[test]
    fn volatility_uses_previous_close() {
        let series = Series::from_sorted(vec![bar(0, 10.0, 5.0, 20.0), bar(1, 12.0, 8.0, 25.0)]).unwrap();
        assert_close(&volatility(&series).unwrap(), &[20.0]);
    }

    #[test]
    fn volatility_length_is_one_less() {
        let series = Series::from_sorted(vec![
            bar(0, 11.0, 9.0, 10.0),
            bar(1, 12.0, 10.0, 11.0),
            bar(2, 13.0, 10.0, 12.0),
            bar(3, 12.5, 11.0, 12.0),
        ])
        .unwrap();

        let vol = volatility(&series).unwrap();
        assert_eq!(vol.len(), 3);
        assert_close(&vol, &[20.0, 300.0 / 11.0, 12.5]);
    }

    #[test]
    fn volatility_needs_two_records() {
        assert_eq!(
            volatility(&Series::default()),
            Err(AnalyticsError::InsufficientData { len: 0 })
        );
        assert_eq!(
            volatility(&closes(&[10.0])),
            Err(AnalyticsError::InsufficientData { len: 1 })
        );
    }

    #[test]
    fn volatility_zero_previous_close_is_an_error() {
        let series = Series::from_sorted(vec![
            bar(0, 2.0, 1.0, 1.5),
            bar(1, 1.0, 0.0, 0.0),
            bar(2, 3.0, 1.0, 2.0),
        ])
        .unwrap();
        assert_eq!(
            volatility(&series),
            Err(AnalyticsError::DivisionByZero { index: 2 })
        );
    }

    #[test]
    fn trend_report_compares_latest_averages() {
        let rising = closes(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let report = trend_report(&rising, 2, 4).unwrap();
        assert_eq!(report.latest_close, 6.0);
        assert!((report.short_average - 5.5).abs() < EPS);
        assert!((report.long_average - 4.5).abs() < EPS);
        assert_eq!(report.trend, Trend::Upward);
        assert!(report.to_string().contains("Overall Trending: upward"));
        assert!(report
            .to_string()
            .contains("Recommendation: Potential Buy Signal Detected"));

        let falling = closes(&[6.0, 5.0, 4.0, 3.0, 2.0, 1.0]);
        assert_eq!(trend_report(&falling, 2, 4).unwrap().trend, Trend::Downward);
    }

    #[test]
    fn trend_report_propagates_period_errors() {
        let series = closes(&[1.0, 2.0, 3.0]);
        assert_eq!(
            trend_report(&series, 2, 50),
            Err(AnalyticsError::InvalidPeriod { period: 50, len: 3 })
        );
    }

    #[test]
    fn crossovers_emit_one_signal_per_run() {
        let series = closes(&[1.0, 2.0, 3.0, 2.0, 1.0, 2.0, 3.0]);
        let signals = crossover_signals(&series, 1, 2).unwrap();

        let summary: Vec<(i64, SignalKind, f64)> = signals
            .iter()
            .map(|s| {
                let day = (s.date - NaiveDate::from_ymd_opt(2021, 1, 1).unwrap()).num_days();
                (day, s.kind, s.price)
            })
            .collect();
        assert_eq!(
            summary,
            vec![
                (1, SignalKind::Buy, 2.0),
                (3, SignalKind::Sell, 2.0),
                (5, SignalKind::Buy, 2.0),
            ]
        );
    }

    #[test]
    fn flat_averages_emit_no_signal() {
        let series = closes(&[2.0, 2.0, 2.0, 2.0]);
        assert!(crossover_signals(&series, 1, 3).unwrap().is_empty());
    }

    #[test]
    fn crossover_signals_start_at_the_longer_window() {
        let series = closes(&[5.0, 4.0, 3.0, 4.0, 5.0]);
        let signals = crossover_signals(&series, 3, 2).unwrap();
        // short=3 is the longer window here; first comparison on day 2
        let kinds: Vec<(SignalKind, f64)> = signals.iter().map(|s| (s.kind, s.price)).collect();
        assert_eq!(kinds, vec![(SignalKind::Buy, 3.0), (SignalKind::Sell, 5.0)]);
        assert!(matches!(
            crossover_signals(&series, 2, 9),
            Err(AnalyticsError::InvalidPeriod { period: 9, len: 5 })
        ));
    }

    #[test]
    fn shared_series_is_usable_from_many_threads() {
        let series = std::sync::Arc::new(closes(&[1.0, 2.0, 3.0, 4.0]));
        let handles: Vec<_> = (1..=4)
            .map(|p| {
                let series = series.clone();
                std::thread::spawn(move || moving_average(&series, p).unwrap().len())
            })
            .collect();
        let lens: Vec<usize> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(lens, vec![4, 3, 2, 1]);
    }
}
