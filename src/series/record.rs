use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::ParseErrorKind;

/// One daily observation of a security.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceRecord {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
    pub adj_close: f64,
}

impl PriceRecord {
    /// Checks the OHLC envelope: `low <= min(open, close)`,
    /// `high >= max(open, close)` and no negative amounts.
    pub fn validate(&self) -> Result<(), (&'static str, ParseErrorKind)> {
        for (field, value) in [
            ("open", self.open),
            ("high", self.high),
            ("low", self.low),
            ("close", self.close),
            ("adj_close", self.adj_close),
        ] {
            if value < 0.0 {
                return Err((field, ParseErrorKind::NegativeValue));
            }
        }

        if self.high < self.low {
            return Err(("high", ParseErrorKind::InconsistentOhlc));
        }
        if self.high < self.open.max(self.close) {
            return Err(("high", ParseErrorKind::InconsistentOhlc));
        }
        if self.low > self.open.min(self.close) {
            return Err(("low", ParseErrorKind::InconsistentOhlc));
        }
        Ok(())
    }
}

/// Price records in strictly ascending date order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Series {
    records: Vec<PriceRecord>,
}

impl Series {
    /// Wraps records that are already strictly ascending by date. Returns the
    /// index of the first record that breaks the ordering otherwise.
    pub fn from_sorted(records: Vec<PriceRecord>) -> Result<Self, usize> {
        if let Some(pos) = records.windows(2).position(|w| w[0].date >= w[1].date) {
            return Err(pos + 1);
        }
        Ok(Self { records })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[PriceRecord] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PriceRecord> {
        self.records.iter()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.records.iter().map(|r| r.close).collect()
    }

    pub fn last(&self) -> Option<&PriceRecord> {
        self.records.last()
    }
}

impl<'a> IntoIterator for &'a Series {
    type Item = &'a PriceRecord;
    type IntoIter = std::slice::Iter<'a, PriceRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}
