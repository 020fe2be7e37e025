use chrono::NaiveDate;
use log::debug;
use std::fs::File;
use std::path::Path;

use super::record::{PriceRecord, Series};
use crate::error::{LoadError, ParseError, ParseErrorKind};

const DATE_FORMAT: &str = "%Y-%m-%d";

const DATE: usize = 0;
const OPEN: usize = 1;
const HIGH: usize = 2;
const LOW: usize = 3;
const CLOSE: usize = 4;
const VOLUME: usize = 5;
const ADJ_CLOSE: usize = 6;

/// Outcome of a load: the rows that survived validation plus one error per
/// rejected row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadReport {
    pub series: Series,
    pub errors: Vec<ParseError>,
}

impl LoadReport {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Parses `Date,Open,High,Low,Close,Volume[,Adj Close]` rows into a
/// [`Series`].
///
/// A malformed row is skipped and reported; it never discards the rest of
/// the batch. `row_index` in the reported errors is the 0-based position of
/// the row in `rows`, header included. Rows may arrive in any date order and
/// are sorted ascending; a later row repeating an accepted date is rejected.
pub fn load<R, S>(rows: impl IntoIterator<Item = R>) -> LoadReport
where
    R: AsRef<[S]>,
    S: AsRef<str>,
{
    let mut accepted: Vec<(usize, PriceRecord)> = Vec::new();
    let mut errors = Vec::new();

    for (row_index, row) in rows.into_iter().enumerate() {
        let fields: Vec<&str> = row.as_ref().iter().map(|f| f.as_ref().trim()).collect();

        if fields.iter().all(|f| f.is_empty()) {
            continue;
        }
        if row_index == 0 && is_header(&fields) {
            debug!("Skipping header row: {:?}", fields);
            continue;
        }

        match parse_row(row_index, &fields) {
            Ok(record) => accepted.push((row_index, record)),
            Err(e) => {
                debug!("Rejected price row: {}", e);
                errors.push(e);
            }
        }
    }

    // stable: equal dates keep input order, so the later row is the duplicate
    accepted.sort_by_key(|(_, record)| record.date);

    let mut records: Vec<PriceRecord> = Vec::with_capacity(accepted.len());
    for (row_index, record) in accepted {
        if records.last().map(|prev| prev.date) == Some(record.date) {
            let e = ParseError {
                row_index,
                field: "date",
                reason: ParseErrorKind::DuplicateDate,
            };
            debug!("Rejected price row: {}", e);
            errors.push(e);
            continue;
        }
        records.push(record);
    }
    errors.sort_by_key(|e| e.row_index);

    let series = Series::from_sorted(records).unwrap_or_default();
    debug!("Loaded {} records, {} rejected", series.len(), errors.len());

    LoadReport { series, errors }
}

/// Reads a comma-separated price file and hands its records to [`load`].
/// Quoted fields are unquoted; blank lines are skipped.
pub fn load_file(path: impl AsRef<Path>) -> Result<LoadReport, LoadError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| LoadError::Io {
        path: path.display().to_string(),
        source,
    })?;

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(file);

    let mut rows: Vec<Vec<String>> = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|source| LoadError::Csv {
            path: path.display().to_string(),
            source,
        })?;
        rows.push(record.iter().map(str::to_string).collect());
    }

    Ok(load(rows))
}

/// Only the first row can be a header: one whose date column reads `date`,
/// or one without a single numeric field. Anything else is parsed as data.
fn is_header(fields: &[&str]) -> bool {
    if fields[DATE].eq_ignore_ascii_case("date") {
        return true;
    }
    NaiveDate::parse_from_str(fields[DATE], DATE_FORMAT).is_err()
        && fields.iter().all(|f| f.parse::<f64>().is_err())
}

fn parse_row(row_index: usize, fields: &[&str]) -> Result<PriceRecord, ParseError> {
    let fail = |field: &'static str, reason: ParseErrorKind| ParseError {
        row_index,
        field,
        reason,
    };

    let field = |index: usize, name: &'static str| {
        fields
            .get(index)
            .copied()
            .filter(|f| !f.is_empty())
            .ok_or_else(|| fail(name, ParseErrorKind::MissingField))
    };

    let amount = |index: usize, name: &'static str| -> Result<f64, ParseError> {
        let raw = field(index, name)?;
        match raw.parse::<f64>() {
            Ok(v) if v.is_finite() => Ok(v),
            _ => Err(fail(name, ParseErrorKind::InvalidNumber(raw.to_string()))),
        }
    };

    let raw_date = field(DATE, "date")?;
    let date = NaiveDate::parse_from_str(raw_date, DATE_FORMAT)
        .map_err(|_| fail("date", ParseErrorKind::InvalidDate(raw_date.to_string())))?;

    let open = amount(OPEN, "open")?;
    let high = amount(HIGH, "high")?;
    let low = amount(LOW, "low")?;
    let close = amount(CLOSE, "close")?;

    let raw_volume = field(VOLUME, "volume")?;
    let volume = raw_volume.parse::<u64>().map_err(|_| {
        if raw_volume.starts_with('-') && raw_volume[1..].parse::<u64>().is_ok() {
            fail("volume", ParseErrorKind::NegativeValue)
        } else {
            fail("volume", ParseErrorKind::InvalidNumber(raw_volume.to_string()))
        }
    })?;

    let adj_close = match fields.get(ADJ_CLOSE).filter(|f| !f.is_empty()) {
        Some(_) => amount(ADJ_CLOSE, "adj_close")?,
        None => close,
    };

    let record = PriceRecord {
        date,
        open,
        high,
        low,
        close,
        volume,
        adj_close,
    };
    record
        .validate()
        .map_err(|(field, reason)| fail(field, reason))?;

    Ok(record)
}
